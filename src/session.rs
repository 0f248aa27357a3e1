use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::time::{sleep, Duration};

use crate::message::accumulator::MessageAccumulator;
use crate::message::report::parse_report;
use crate::message::MIN_FRAME_LEN;
use crate::washer_state::WasherState;

/// Raw notification frames delivered by the transport, in arrival order.
pub type FrameStream<'a> = BoxStream<'a, Result<Vec<u8>>>;

/// The transport under a [`WasherSession`].
///
/// [`crate::BleLink`] implements this over a live GATT connection; tests
/// substitute a scripted link. The stream returned by [`frames`] ending or
/// yielding an error both mean the link was lost.
///
/// [`frames`]: WasherLink::frames
#[async_trait]
pub trait WasherLink: Send + Sync {
    /// Make one attempt to establish the link.
    async fn connect(&self) -> Result<()>;

    /// Subscribe to the notification channel.
    async fn frames<'a>(&'a self) -> Result<FrameStream<'a>>;

    /// Write the vendor activation command, fire-and-forget. Without it the
    /// washer never starts emitting status notifications.
    async fn send_activation(&self) -> Result<()>;

    /// Release the link. Must be safe to call in any state.
    async fn disconnect(&self) -> Result<()>;
}

/// Keeps one washer's link alive and turns its notifications into
/// [`WasherState`] values.
///
/// The session owns the reassembly buffer for its link; neither is ever
/// shared between washers. Connecting retries indefinitely at a fixed
/// one-second interval, and an unsolicited disconnect re-runs the whole
/// connect / subscribe / activate sequence, discarding any half-received
/// report.
pub struct WasherSession<L> {
    link: L,
    accumulator: MessageAccumulator,
}

impl<L: WasherLink> WasherSession<L> {
    const CONNECT_RETRY_INTERVAL_S: u64 = 1;

    pub fn new(link: L) -> Self {
        Self {
            link,
            accumulator: MessageAccumulator::new(),
        }
    }

    /// Run the session until cancelled, handing each decoded state to `publish`.
    ///
    /// This future never resolves on its own; drop or abort it to stop
    /// monitoring, then call [`stop`](Self::stop) to release the link.
    /// `publish` is called inline on the notification path and must not block.
    pub async fn run<F>(&mut self, mut publish: F) -> Result<()>
    where
        F: FnMut(WasherState) + Send,
    {
        loop {
            self.connect_with_retry().await;
            self.accumulator.reset();

            let mut frames = match self.link.frames().await {
                Ok(frames) => frames,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to subscribe to notifications");
                    let _ = self.link.disconnect().await;
                    sleep(Duration::from_secs(Self::CONNECT_RETRY_INTERVAL_S)).await;
                    continue;
                }
            };

            if let Err(err) = self.link.send_activation().await {
                tracing::warn!(error = %err, "failed to send activation command");
                drop(frames);
                let _ = self.link.disconnect().await;
                sleep(Duration::from_secs(Self::CONNECT_RETRY_INTERVAL_S)).await;
                continue;
            }

            tracing::info!("listening for status notifications");

            while let Some(item) = frames.next().await {
                let frame = match item {
                    Ok(frame) => frame,
                    Err(err) => {
                        tracing::warn!(error = %err, "notification error");
                        break;
                    }
                };

                tracing::debug!(frame = %hex::encode(&frame), "RX notification");

                if frame.len() < MIN_FRAME_LEN {
                    continue;
                }

                if let Some(message) = self.accumulator.accumulate(&frame) {
                    match parse_report(&message) {
                        Ok(state) => {
                            tracing::debug!(?state, "decoded state");
                            publish(state);
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "discarding undecodable report");
                        }
                    }
                }
            }

            tracing::info!("link lost, reconnecting");
            drop(frames);
            let _ = self.link.disconnect().await;
        }
    }

    /// Tear down the session, releasing the transport.
    pub async fn stop(self) -> Result<()> {
        self.link.disconnect().await
    }

    async fn connect_with_retry(&self) {
        loop {
            match self.link.connect().await {
                Ok(()) => {
                    tracing::debug!("connected");
                    return;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to connect, retrying");
                    sleep(Duration::from_secs(Self::CONNECT_RETRY_INTERVAL_S)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::report::report_fixture;
    use crate::washer_state::DeviceState;
    use anyhow::anyhow;
    use futures_util::stream;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::{timeout, Instant};

    /// What the scripted notification stream does after its frames run out.
    enum MockFrames {
        /// The stream ends, which the session must treat as link loss.
        ThenClosed(Vec<Result<Vec<u8>>>),
        /// The stream stays open without yielding, like a healthy idle link.
        ThenOpen(Vec<Result<Vec<u8>>>),
    }

    #[derive(Default)]
    struct MockState {
        connect_results: VecDeque<Result<()>>,
        frame_batches: VecDeque<MockFrames>,
        connect_attempts: Vec<Instant>,
        activations: usize,
        disconnects: usize,
    }

    #[derive(Clone, Default)]
    struct MockLink(Arc<Mutex<MockState>>);

    #[async_trait]
    impl WasherLink for MockLink {
        async fn connect(&self) -> Result<()> {
            let mut state = self.0.lock().unwrap();
            state.connect_attempts.push(Instant::now());
            state
                .connect_results
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("out of scripted connects")))
        }

        async fn frames<'a>(&'a self) -> Result<FrameStream<'a>> {
            let batch = self.0.lock().unwrap().frame_batches.pop_front();
            Ok(match batch {
                Some(MockFrames::ThenClosed(frames)) => stream::iter(frames).boxed(),
                Some(MockFrames::ThenOpen(frames)) => {
                    stream::iter(frames).chain(stream::pending()).boxed()
                }
                None => stream::pending().boxed(),
            })
        }

        async fn send_activation(&self) -> Result<()> {
            self.0.lock().unwrap().activations += 1;
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            self.0.lock().unwrap().disconnects += 1;
            Ok(())
        }
    }

    /// Wrap a report chunk in a notification frame with the given index byte.
    fn frame(index: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0, 0, 0, 0, index, 0, 0];
        frame.extend_from_slice(payload);
        frame
    }

    /// A valid status report split into its start and continuation frames.
    fn report_frames() -> (Vec<u8>, Vec<u8>) {
        let report = report_fixture();
        let (head, tail) = report.split_at(30);
        (frame(0, head), frame(1, tail))
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retries_every_second_then_activates_once() {
        let link = MockLink::default();
        {
            let mut state = link.0.lock().unwrap();
            for _ in 0..3 {
                state.connect_results.push_back(Err(anyhow!("no adapter")));
            }
            state.connect_results.push_back(Ok(()));
            state.frame_batches.push_back(MockFrames::ThenOpen(vec![]));
        }

        let mut session = WasherSession::new(link.clone());
        // Parks on the idle notification stream once connected.
        let _ = timeout(Duration::from_secs(60), session.run(|_| {})).await;

        let state = link.0.lock().unwrap();
        assert_eq!(state.connect_attempts.len(), 4);
        for pair in state.connect_attempts.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(1));
        }
        assert_eq!(state.activations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_decodes_and_publishes() {
        let link = MockLink::default();
        let (start, continuation) = report_frames();
        {
            let mut state = link.0.lock().unwrap();
            state.connect_results.push_back(Ok(()));
            state
                .frame_batches
                .push_back(MockFrames::ThenOpen(vec![Ok(start), Ok(continuation)]));
        }

        let mut session = WasherSession::new(link.clone());
        let mut states = Vec::new();
        let _ = timeout(Duration::from_secs(5), session.run(|s| states.push(s))).await;

        assert_eq!(states.len(), 1);
        assert_eq!(states[0].device_state, DeviceState::Running);
        assert_eq!(states[0].remaining_minutes, 45);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_fault_does_not_stop_the_session() {
        let link = MockLink::default();
        let (start, continuation) = report_frames();
        // A pair whose payloads are too short to decode, then a valid pair.
        let runt_start = frame(0, &[0u8; 10]);
        let runt_continuation = frame(1, &[0u8; 10]);
        {
            let mut state = link.0.lock().unwrap();
            state.connect_results.push_back(Ok(()));
            state.frame_batches.push_back(MockFrames::ThenOpen(vec![
                Ok(runt_start),
                Ok(runt_continuation),
                Ok(start),
                Ok(continuation),
            ]));
        }

        let mut session = WasherSession::new(link.clone());
        let mut states = Vec::new();
        let _ = timeout(Duration::from_secs(5), session.run(|s| states.push(s))).await;

        assert_eq!(states.len(), 1);
        assert_eq!(states[0].device_state, DeviceState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_loss_discards_partial_report_and_reconnects() {
        let link = MockLink::default();
        let (start, continuation) = report_frames();
        {
            let mut state = link.0.lock().unwrap();
            state.connect_results.push_back(Ok(()));
            state.connect_results.push_back(Ok(()));
            // Link drops after the start frame; the continuation arrives on
            // the next connection and must not complete the stale report.
            state
                .frame_batches
                .push_back(MockFrames::ThenClosed(vec![Ok(start.clone())]));
            state.frame_batches.push_back(MockFrames::ThenOpen(vec![
                Ok(continuation.clone()),
                Ok(start),
                Ok(continuation),
            ]));
        }

        let mut session = WasherSession::new(link.clone());
        let mut states = Vec::new();
        let _ = timeout(Duration::from_secs(5), session.run(|s| states.push(s))).await;

        assert_eq!(states.len(), 1);

        let state = link.0.lock().unwrap();
        // One activation per connection, and a disconnect for the lost link.
        assert_eq!(state.activations, 2);
        assert!(state.disconnects >= 1);
    }
}
