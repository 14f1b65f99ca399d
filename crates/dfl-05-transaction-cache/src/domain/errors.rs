//! Cache error types.

use shared_types::KVStoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Cache store error: {0}")]
    Store(#[from] KVStoreError),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for CacheError {
    fn from(e: bincode::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}
