//! # Error Types
//!
//! Errors shared across the ledger crates.

use thiserror::Error;

/// Key-value store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },

    /// Key not found.
    #[error("Key not found in KV store")]
    NotFound,
}

/// Worker pool submission failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerPoolError {
    /// Every worker is busy and the queue is at capacity.
    #[error("Worker queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// The pool has been shut down.
    #[error("Worker pool is shut down")]
    ShutDown,
}
