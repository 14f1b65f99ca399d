//! Open-block slot.

use shared_types::{Block, Timestamp};

/// Externally visible slot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockManagerState {
    NoBlock,
    Building,
    Finalizing,
}

#[derive(Debug)]
pub(crate) enum BlockSlot {
    NoBlock,
    Building { block: Block, opened_at: Timestamp },
    Finalizing,
}

impl BlockSlot {
    pub(crate) fn state(&self) -> BlockManagerState {
        match self {
            BlockSlot::NoBlock => BlockManagerState::NoBlock,
            BlockSlot::Building { .. } => BlockManagerState::Building,
            BlockSlot::Finalizing => BlockManagerState::Finalizing,
        }
    }
}
