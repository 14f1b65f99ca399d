//! Transport error types.

use dfl_01_wire_codec::CodecError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Framing error: {0}")]
    Codec(#[from] CodecError),

    /// The peer sent something the one-shot protocol does not allow.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid peer address: {0}")]
    InvalidPeerAddress(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

impl From<bincode::Error> for TransportError {
    fn from(e: bincode::Error) -> Self {
        TransportError::Serialization(e.to_string())
    }
}
