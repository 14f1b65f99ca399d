//! Results of one-shot requests.

use super::peers::PeerEndpoint;
use dfl_01_wire_codec::CommandType;

/// Result of a single one-shot request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcOutcome {
    /// The peer answered with one frame.
    Success {
        command: CommandType,
        payload: Vec<u8>,
    },
    /// Connected, but no valid reply arrived before the timeout.
    NoReply,
    /// Could not connect or send the request.
    ConnectionFailed,
}

impl RpcOutcome {
    /// True when the peer answered with `ACK`.
    pub fn is_ack(&self) -> bool {
        matches!(
            self,
            RpcOutcome::Success {
                command: CommandType::Ack,
                ..
            }
        )
    }

    /// True when the request reached the peer, whatever it answered.
    pub fn delivered(&self) -> bool {
        matches!(self, RpcOutcome::Success { .. })
    }

    /// Reason text of an `ACK_REJECTED` reply.
    pub fn rejection_reason(&self) -> Option<String> {
        match self {
            RpcOutcome::Success {
                command: CommandType::AckRejected,
                payload,
            } => Some(String::from_utf8_lossy(payload).into_owned()),
            _ => None,
        }
    }
}

/// Per-peer broadcast result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerResult {
    pub peer: PeerEndpoint,
    pub outcome: RpcOutcome,
}
