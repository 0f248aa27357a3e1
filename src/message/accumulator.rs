use super::{FRAME_INDEX_OFFSET, FRAME_PAYLOAD_OFFSET, MIN_FRAME_LEN};

/// Reassembles the two-frame notification sequence into one logical message.
///
/// The washer splits every status report over two notifications. A frame
/// whose index byte is 0 starts a new report; the next frame, whatever its
/// own index byte says, completes it. One accumulator belongs to exactly
/// one connection session and is reset whenever the link is re-established.
#[derive(Debug, Default)]
pub struct MessageAccumulator {
    expecting_continuation: bool,
    pending: Vec<u8>,
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard any partially accumulated report.
    ///
    /// Called on reconnect: a report spanning a disconnect is lost, not resumed.
    pub fn reset(&mut self) {
        self.expecting_continuation = false;
        self.pending.clear();
    }

    /// Feed one raw notification frame, returning the complete message if
    /// this frame finished a start/continuation pair.
    ///
    /// A start frame (index byte 0) unconditionally replaces any pending
    /// payload, so a retransmitted report wins over a half-received one.
    /// An out-of-sequence frame, or a frame shorter than [`MIN_FRAME_LEN`],
    /// is dropped without touching the accumulator state.
    pub fn accumulate(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        if frame.len() < MIN_FRAME_LEN {
            return None;
        }

        if frame[FRAME_INDEX_OFFSET] == 0 {
            self.pending = frame[FRAME_PAYLOAD_OFFSET..].to_vec();
            self.expecting_continuation = true;
            return None;
        }

        if self.expecting_continuation {
            self.pending.extend_from_slice(&frame[FRAME_PAYLOAD_OFFSET..]);
            self.expecting_continuation = false;
            return Some(std::mem::take(&mut self.pending));
        }

        None
    }
}

#[cfg(test)]
fn frame(index: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0xaa, 0xbb, 0xcc, 0xdd, index, 0xee, 0xff];
    frame.extend_from_slice(payload);
    frame
}

#[test]
fn test_accumulate_start_then_continuation() {
    let mut accumulator = MessageAccumulator::new();
    assert_eq!(accumulator.accumulate(&frame(0, b"first half ")), None);
    assert_eq!(
        accumulator.accumulate(&frame(1, b"second half")),
        Some(b"first half second half".to_vec())
    );
}

#[test]
fn test_accumulate_emits_at_most_once_per_pair() {
    let mut accumulator = MessageAccumulator::new();
    accumulator.accumulate(&frame(0, b"one"));
    assert!(accumulator.accumulate(&frame(1, b"two")).is_some());
    // The pair is consumed; a stray third frame produces nothing.
    assert_eq!(accumulator.accumulate(&frame(1, b"three")), None);
}

#[test]
fn test_second_start_discards_first_payload() {
    let mut accumulator = MessageAccumulator::new();
    accumulator.accumulate(&frame(0, b"lost"));
    accumulator.accumulate(&frame(0, b"kept"));
    assert_eq!(
        accumulator.accumulate(&frame(1, b" tail")),
        Some(b"kept tail".to_vec())
    );
}

#[test]
fn test_continuation_completes_regardless_of_its_index_byte() {
    // The protocol is strictly two-frame: once a start frame is seen the
    // next frame completes the report even with an unexpected index byte.
    let mut accumulator = MessageAccumulator::new();
    accumulator.accumulate(&frame(0, b"head"));
    assert_eq!(
        accumulator.accumulate(&frame(7, b"-tail")),
        Some(b"head-tail".to_vec())
    );
}

#[test]
fn test_out_of_sequence_frame_is_dropped() {
    let mut accumulator = MessageAccumulator::new();
    assert_eq!(accumulator.accumulate(&frame(1, b"orphan")), None);
    // State is untouched: a following start/continuation pair still works.
    accumulator.accumulate(&frame(0, b"a"));
    assert_eq!(accumulator.accumulate(&frame(1, b"b")), Some(b"ab".to_vec()));
}

#[test]
fn test_short_frame_is_ignored() {
    let mut accumulator = MessageAccumulator::new();
    accumulator.accumulate(&frame(0, b"head"));
    // 9 bytes, below MIN_FRAME_LEN: ignored entirely, not even as a continuation.
    assert_eq!(accumulator.accumulate(&[0, 0, 0, 0, 1, 0, 0, 0, 0]), None);
    assert_eq!(
        accumulator.accumulate(&frame(1, b"-tail")),
        Some(b"head-tail".to_vec())
    );
}

#[test]
fn test_reset_discards_pending_report() {
    let mut accumulator = MessageAccumulator::new();
    accumulator.accumulate(&frame(0, b"stale"));
    accumulator.reset();
    assert_eq!(accumulator.accumulate(&frame(1, b"tail")), None);
}
