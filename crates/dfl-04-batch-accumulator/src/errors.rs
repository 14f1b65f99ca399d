//! Accumulator error types.

use shared_types::WorkerPoolError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccumulatorError {
    /// The batch was drained but could not be handed to the worker pool.
    #[error("Batch of {batch_len} items dropped: {source}")]
    DispatchFailed {
        batch_len: usize,
        source: WorkerPoolError,
    },
}
