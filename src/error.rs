use thiserror::Error;

/// Error decoding a reassembled status report.
///
/// A decode fault discards the offending report; it never tears down the
/// connection session that produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The reassembled message is too short to cover the decoded offsets.
    #[error("status report too short: got {len} bytes, need at least {needed}")]
    Truncated {
        /// The actual length of the reassembled message.
        len: usize,
        /// The minimum length the decoder requires.
        needed: usize,
    },
}
