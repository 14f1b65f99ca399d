//! Model-update aggregation hook.
//!
//! Each batch drained by the accumulator is handed to a `ModelAggregator`.
//! Training and averaging live outside the ledger; the node ships with an
//! aggregator that only records what it received.

use parking_lot::Mutex;
use shared_types::{short_hex, Transaction};
use std::sync::Arc;
use tracing::info;

/// Consumer of model-update batches.
pub trait ModelAggregator: Send + Sync {
    fn aggregate(&self, batch: Arc<Vec<Transaction>>);
}

/// Summary of one received batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub transactions: usize,
    pub payload_bytes: usize,
}

/// Logs each batch and keeps a summary of it.
#[derive(Default)]
pub struct LoggingAggregator {
    received: Mutex<Vec<BatchSummary>>,
}

impl LoggingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<BatchSummary> {
        self.received.lock().clone()
    }
}

impl ModelAggregator for LoggingAggregator {
    fn aggregate(&self, batch: Arc<Vec<Transaction>>) {
        let summary = BatchSummary {
            transactions: batch.len(),
            payload_bytes: batch.iter().map(|tx| tx.content.payload.len()).sum(),
        };
        info!(
            first = %batch.first().map(|tx| short_hex(&tx.hash)).unwrap_or_default(),
            "[node] model-update batch: {} transactions, {} payload bytes",
            summary.transactions,
            summary.payload_bytes
        );
        self.received.lock().push(summary);
    }
}
