//! Codec error types.

use thiserror::Error;

/// Framing errors.
///
/// `CrcMismatch` is recoverable (the decoder resynchronises);
/// `PayloadTooLarge` means the peer violated the protocol and the connection
/// must be reset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Header CRC mismatch: computed {computed:#06x}, received {received:#06x}")]
    CrcMismatch { computed: u16, received: u16 },

    #[error("Frame payload too large: {announced} bytes announced, limit {limit}")]
    PayloadTooLarge { announced: usize, limit: usize },
}
