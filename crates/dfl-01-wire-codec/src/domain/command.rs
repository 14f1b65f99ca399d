//! Message command codes carried in the frame header.

use std::fmt;

/// Command code of a frame.
///
/// Codes 6..=8 belong to the peer introducer service; they are decoded so
/// the frames can be logged and answered, but nothing in the ledger core
/// acts on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CommandType {
    Unknown = 0,
    Ack = 1,
    /// Negative acknowledgement; the payload carries the reason text.
    AckRejected = 2,
    Transaction = 3,
    Block = 4,
    BlockConfirmation = 5,
    RegisterAsPeer = 6,
    RequestPeerInfo = 7,
    ReplyPeerInfo = 8,
}

impl CommandType {
    /// Map a wire code; unrecognised codes become `Unknown`.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Ack,
            2 => Self::AckRejected,
            3 => Self::Transaction,
            4 => Self::Block,
            5 => Self::BlockConfirmation,
            6 => Self::RegisterAsPeer,
            7 => Self::RequestPeerInfo,
            8 => Self::ReplyPeerInfo,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "UNKNOWN",
            Self::Ack => "ACK",
            Self::AckRejected => "ACK_REJECTED",
            Self::Transaction => "TRANSACTION",
            Self::Block => "BLOCK",
            Self::BlockConfirmation => "BLOCK_CONFIRMATION",
            Self::RegisterAsPeer => "REGISTER_AS_PEER",
            Self::RequestPeerInfo => "REQUEST_PEER_INFO",
            Self::ReplyPeerInfo => "REPLY_PEER_INFO",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_back() {
        for code in 0u16..=8 {
            assert_eq!(CommandType::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_unassigned_code_is_unknown() {
        assert_eq!(CommandType::from_code(42), CommandType::Unknown);
    }
}
