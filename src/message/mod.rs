//! The HomeWhiz notification protocol.
//!
//! One logical status report is split over two notification frames. Each
//! frame carries a frame index at byte 4 and its payload from byte 7
//! onward; a frame with index 0 starts a new report and the following
//! frame completes it. [`accumulator`] reassembles the pair and
//! [`report`] decodes the result.

pub mod accumulator;
pub mod report;

/// Frames shorter than this carry no useful payload and are dropped
/// before reassembly.
pub const MIN_FRAME_LEN: usize = 10;

/// Offset of the frame index byte within a notification frame.
pub(crate) const FRAME_INDEX_OFFSET: usize = 4;

/// Offset at which the frame payload begins.
pub(crate) const FRAME_PAYLOAD_OFFSET: usize = 7;
