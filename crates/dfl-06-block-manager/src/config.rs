//! Configuration types for the block manager

use serde::Deserialize;

/// Which identity is recorded as a new block's creator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatorPolicy {
    /// Creator of the first transaction handed to `generate_block`.
    /// Matches blocks already written by existing nodes.
    FirstTransactionCreator,
    /// The node that built the block.
    LocalNode,
}

/// Runtime configuration for the block manager
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BlockManagerConfig {
    /// Seconds an open block accepts confirmations before it should be finalized
    pub confirmation_window_secs: u64,

    /// Poll interval while shutdown waits for an open block to close
    pub shutdown_poll_ms: u64,

    pub creator_policy: CreatorPolicy,
}

impl Default for BlockManagerConfig {
    fn default() -> Self {
        Self {
            confirmation_window_secs: 60,
            shutdown_poll_ms: 5_000,
            creator_policy: CreatorPolicy::FirstTransactionCreator,
        }
    }
}
