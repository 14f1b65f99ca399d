//! # Inbound Ports (Driving Ports / API)

use dfl_01_wire_codec::CommandType;

/// Answers one decoded request frame with exactly one reply frame.
///
/// Called from a blocking-capable thread; implementations may verify
/// signatures but must hand slow work to a worker pool.
pub trait FrameHandler: Send + Sync {
    fn handle(&self, command: CommandType, payload: &[u8]) -> (CommandType, Vec<u8>);
}
