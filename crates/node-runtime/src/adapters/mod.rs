//! # Adapters
//!
//! - `storage` - key-value store backends
//! - `aggregator` - consumer of model-update batches

pub mod aggregator;
pub mod storage;

pub use aggregator::{BatchSummary, LoggingAggregator, ModelAggregator};
pub use storage::{open_store, NodeStore};
