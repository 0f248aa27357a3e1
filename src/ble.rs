use anyhow::anyhow;
use async_trait::async_trait;
use bluest::Adapter;
use bluest::AdvertisingDevice;
use bluest::Characteristic;
use bluest::Device;
use bluest::Uuid;
use futures_util::StreamExt;
use tokio::time::timeout;
use tokio::time::Duration;

use crate::session::{FrameStream, WasherLink, WasherSession};
use crate::washer_state::WasherState;

/// A washer reachable over a live GATT connection.
///
/// HomeWhiz appliances expose a write characteristic for commands and a
/// notify characteristic carrying the fragmented status reports. The
/// original firmware documentation is not public; UUIDs and the activation
/// command come from observed traffic.
pub struct BleLink {
    adapter: Adapter,
    device: Device,
    write: Characteristic,
    notify: Characteristic,
}

impl BleLink {
    const WRITE_CHARACTERISTIC_ID: &'static str = "0000ac01-0000-1000-8000-00805f9b34fb";
    const NOTIFY_CHARACTERISTIC_ID: &'static str = "0000ac02-0000-1000-8000-00805f9b34fb";
    // A verbatim command which makes the washer start emitting status notifications.
    // Must be reproduced bit-exact.
    const ACTIVATION_COMMAND: [u8; 8] = [0x02, 0x04, 0x00, 0x04, 0x00, 0x1a, 0x01, 0x03];
    // How long to scan before concluding no washer is in range
    const DISCOVERY_TIMEOUT_S: u64 = 30;

    /// Discover a washer whose advertised name starts with `name_prefix`
    /// and connect to it.
    pub async fn discover(name_prefix: &str) -> anyhow::Result<Self> {
        let adapter = Adapter::default()
            .await
            .ok_or(anyhow!("Default adapter not found"))?;
        adapter.wait_available().await?;

        let device = timeout(
            Duration::from_secs(Self::DISCOVERY_TIMEOUT_S),
            Self::discover_device(name_prefix, &adapter),
        )
        .await
        .map_err(|_| anyhow!("Washer not found"))??;

        adapter.connect_device(&device.device).await?;

        let (write, notify) = Self::find_characteristics(&device.device).await?;

        Ok(Self {
            adapter: adapter.clone(),
            device: device.device,
            write,
            notify,
        })
    }

    async fn discover_device(
        name_prefix: &str,
        adapter: &Adapter,
    ) -> anyhow::Result<AdvertisingDevice> {
        let mut adapter_events = adapter.scan(&[]).await?;
        while let Some(device) = adapter_events.next().await {
            let device_name = device.device.name_async().await.unwrap_or_default();
            if device_name.starts_with(name_prefix) {
                tracing::info!(name = %device_name, "found washer");
                return Ok(device);
            }
        }

        Err(anyhow!("Washer not found"))
    }

    /// The HomeWhiz GATT service UUID is not known, so search every service
    /// for the two characteristics instead.
    async fn find_characteristics(
        device: &Device,
    ) -> anyhow::Result<(Characteristic, Characteristic)> {
        let mut write = None;
        let mut notify = None;
        for service in device.discover_services().await? {
            if write.is_none() {
                write = service
                    .discover_characteristics_with_uuid(Self::write_characteristic_id())
                    .await?
                    .first()
                    .cloned();
            }
            if notify.is_none() {
                notify = service
                    .discover_characteristics_with_uuid(Self::notify_characteristic_id())
                    .await?
                    .first()
                    .cloned();
            }
        }

        match (write, notify) {
            (Some(write), Some(notify)) => Ok((write, notify)),
            _ => Err(anyhow!(
                "The specified device does not expose the HomeWhiz status characteristics."
            )),
        }
    }

    fn write_characteristic_id() -> Uuid {
        Uuid::parse_str(Self::WRITE_CHARACTERISTIC_ID).unwrap()
    }

    fn notify_characteristic_id() -> Uuid {
        Uuid::parse_str(Self::NOTIFY_CHARACTERISTIC_ID).unwrap()
    }
}

#[async_trait]
impl WasherLink for BleLink {
    async fn connect(&self) -> anyhow::Result<()> {
        if !self.device.is_connected().await {
            self.adapter.connect_device(&self.device).await?;
        }
        Ok(())
    }

    async fn frames<'a>(&'a self) -> anyhow::Result<FrameStream<'a>> {
        let frames = self.notify.notify().await?;
        Ok(frames.map(|result| result.map_err(Into::into)).boxed())
    }

    async fn send_activation(&self) -> anyhow::Result<()> {
        tracing::debug!(command = %hex::encode(Self::ACTIVATION_COMMAND), "TX activation");
        self.write
            .write_without_response(&Self::ACTIVATION_COMMAND)
            .await?;
        Ok(())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.adapter.disconnect_device(&self.device).await?;
        Ok(())
    }
}

/// Discovers a washer and monitors it. The all-in-one entry point.
pub struct WasherClient {
    session: WasherSession<BleLink>,
}

impl WasherClient {
    /// HomeWhiz appliances advertise under names starting with this prefix.
    pub const DEFAULT_NAME_PREFIX: &'static str = "HwZ";

    /// Create a new `WasherClient` for any HomeWhiz appliance in range.
    pub async fn new_default_prefix() -> anyhow::Result<Self> {
        Self::new(Self::DEFAULT_NAME_PREFIX).await
    }

    /// Create a new `WasherClient`, which includes attempting to discover
    /// the device.
    pub async fn new(name_prefix: &str) -> anyhow::Result<Self> {
        let link = BleLink::discover(name_prefix).await?;
        Ok(Self {
            session: WasherSession::new(link),
        })
    }

    /// Monitor the washer until cancelled, handing each decoded state to
    /// `publish`. Reconnects by itself if the washer drops the link.
    pub async fn watch<F>(&mut self, publish: F) -> anyhow::Result<()>
    where
        F: FnMut(WasherState) + Send,
    {
        self.session.run(publish).await
    }

    /// Disconnect from the washer
    pub async fn stop(self) -> anyhow::Result<()> {
        self.session.stop().await
    }
}
