//! # Storage Adapters
//!
//! `NodeStore` is the backend every ledger store uses in this build:
//! RocksDB with the `rocksdb` feature, otherwise the in-memory store.
//!
//! ```toml
//! node-runtime = { path = "...", features = ["rocksdb"] }
//! ```

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

pub use shared_types::InMemoryKVStore;

use shared_types::KVStoreError;
use std::path::Path;

#[cfg(feature = "rocksdb")]
pub type NodeStore = RocksDbStore;

#[cfg(not(feature = "rocksdb"))]
pub type NodeStore = InMemoryKVStore;

/// Open the store rooted at `path`.
#[cfg(feature = "rocksdb")]
pub fn open_store(path: &Path) -> Result<NodeStore, KVStoreError> {
    std::fs::create_dir_all(path).map_err(|e| KVStoreError::IOError {
        message: format!("cannot create {}: {}", path.display(), e),
    })?;
    RocksDbStore::open_default(path)
}

/// Open the store rooted at `path`. Without the `rocksdb` feature nothing
/// is persisted.
#[cfg(not(feature = "rocksdb"))]
pub fn open_store(path: &Path) -> Result<NodeStore, KVStoreError> {
    tracing::warn!(
        "[node] built without rocksdb; {} will not be persisted",
        path.display()
    );
    Ok(InMemoryKVStore::new())
}
