//! Block manager error types.

use shared_types::KVStoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockManagerError {
    #[error("A block is already being built")]
    AlreadyBuilding,

    #[error("Genesis block has not been set")]
    GenesisNotSet,

    #[error("Cannot build a block without transactions")]
    NoTransactions,

    #[error("No block is open")]
    NoOpenBlock,

    /// The persisted genesis differs from the configured one. Fatal.
    #[error("Genesis mismatch: stored {stored}, configured {computed}")]
    GenesisMismatch { stored: String, computed: String },

    /// A block the chain state depends on is absent from the store. Fatal.
    #[error("Block at height {height} missing from store")]
    MissingBlock { height: u64 },

    #[error("Block store error: {0}")]
    Store(#[from] KVStoreError),

    #[error("Block serialization error: {0}")]
    Serialization(String),
}

impl BlockManagerError {
    /// Errors after which the node must not continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BlockManagerError::GenesisMismatch { .. }
                | BlockManagerError::MissingBlock { .. }
                | BlockManagerError::Store(_)
                | BlockManagerError::Serialization(_)
        )
    }
}

impl From<bincode::Error> for BlockManagerError {
    fn from(e: bincode::Error) -> Self {
        BlockManagerError::Serialization(e.to_string())
    }
}

/// Why a confirmation was not attached to the open block.
///
/// Checks run in declaration order; the first failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfirmationRejection {
    #[error("block confirmation window expired")]
    NoOpenBlock,
    #[error("block hash mismatch")]
    BlockHashMismatch,
    #[error("transaction not found")]
    TransactionNotFound,
    #[error("transaction receipt not found")]
    ReceiptNotFound,
    #[error("confirmation and receipt creator mismatch")]
    CreatorMismatch,
    #[error("hash verification fail")]
    HashMismatch,
    #[error("signature verification fail")]
    SignatureInvalid,
}
