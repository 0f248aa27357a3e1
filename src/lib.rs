//! Monitor the state of HomeWhiz-enabled washing machines over Bluetooth Low Energy
//!
//! Tested with a Beko washer sold around the year 2022.
//!
//! The washer has a BLE interface carrying a proprietary notification protocol.
//! Every status report is split over two notification frames; this crate
//! reassembles the pair, decodes the fixed-offset report into a [`WasherState`]
//! and keeps the connection alive, retrying once per second whenever the washer
//! drops the link.
//!
//! Currently the following data can be accessed:
//!
//! - Machine mode (on, off, running, paused, delayed start)
//! - Cycle phase (washing, rinsing, spin, ...)
//! - Temperature (degrees C)
//! - Spin speed (RPM) and rinse-hold
//! - Program duration, remaining time and start delay (minutes)
//!
//! # Example
//!
//! ```no_run
//! # #[tokio::main]
//! # pub async fn main() {
//!     let mut client = washread::WasherClient::new_default_prefix().await.unwrap();
//!     client.watch(|state| println!("{state:?}")).await.unwrap();
//! # }
//! ```

mod ble;
pub mod error;
pub mod message;
mod session;
mod washer_state;

pub use ble::{BleLink, WasherClient};
pub use error::DecodeError;
pub use message::accumulator::MessageAccumulator;
pub use message::report::parse_report;
pub use session::{FrameStream, WasherLink, WasherSession};
pub use washer_state::{DeviceState, DeviceSubState, WasherState};
