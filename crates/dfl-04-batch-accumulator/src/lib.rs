//! # Transaction Batch Accumulator (DFL-04)
//!
//! Buffers accepted transactions and hands them off in fixed-size batches to
//! the model-update stage.
//!
//! When the buffer reaches the trigger count it is swapped for an empty one
//! under the lock, and every registered callback receives the drained batch
//! on the worker pool. A callback never observes a batch that is still
//! growing, and `add` never waits for callbacks.

pub mod accumulator;
pub mod errors;

pub use accumulator::{AddOutcome, BatchAccumulator, BatchCallback, TransactionBatchAccumulator};
pub use errors::AccumulatorError;
