//! Count-triggered batch buffer.

use crate::errors::AccumulatorError;
use parking_lot::{Mutex, RwLock};
use shared_types::{Transaction, WorkerPool};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Callback receiving each drained batch.
pub type BatchCallback<T> = Arc<dyn Fn(Arc<Vec<T>>) + Send + Sync>;

/// What `add` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Item buffered; `len` items now waiting.
    Buffered { len: usize },
    /// Trigger reached; a batch of `batch_len` items was dispatched.
    Triggered { batch_len: usize },
}

struct Buffer<T> {
    items: Vec<T>,
    trigger: usize,
}

/// Thread-safe buffer that dispatches a batch every `trigger` items.
pub struct BatchAccumulator<T: Send + Sync + 'static> {
    buffer: Mutex<Buffer<T>>,
    callbacks: RwLock<Vec<BatchCallback<T>>>,
    pool: Arc<WorkerPool>,
}

/// The accumulator feeding model updates.
pub type TransactionBatchAccumulator = BatchAccumulator<Transaction>;

impl<T: Send + Sync + 'static> BatchAccumulator<T> {
    pub fn new(trigger: usize, pool: Arc<WorkerPool>) -> Self {
        Self {
            buffer: Mutex::new(Buffer {
                items: Vec::new(),
                trigger: trigger.max(1),
            }),
            callbacks: RwLock::new(Vec::new()),
            pool,
        }
    }

    pub fn add_callback<F>(&self, callback: F)
    where
        F: Fn(Arc<Vec<T>>) + Send + Sync + 'static,
    {
        self.callbacks.write().push(Arc::new(callback));
    }

    /// Buffer one item, dispatching a batch if the trigger is reached.
    pub fn add(&self, item: T) -> Result<AddOutcome, AccumulatorError> {
        let drained = {
            let mut buffer = self.buffer.lock();
            buffer.items.push(item);
            if buffer.items.len() < buffer.trigger {
                return Ok(AddOutcome::Buffered {
                    len: buffer.items.len(),
                });
            }
            std::mem::take(&mut buffer.items)
        };

        let batch_len = drained.len();
        self.dispatch(drained)?;
        Ok(AddOutcome::Triggered { batch_len })
    }

    /// Change the trigger count; a buffer already at the new count is
    /// dispatched immediately.
    pub fn set_trigger(&self, trigger: usize) -> Result<(), AccumulatorError> {
        let drained = {
            let mut buffer = self.buffer.lock();
            buffer.trigger = trigger.max(1);
            if buffer.items.len() < buffer.trigger {
                return Ok(());
            }
            std::mem::take(&mut buffer.items)
        };
        self.dispatch(drained)
    }

    pub fn trigger(&self) -> usize {
        self.buffer.lock().trigger
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the buffer without invoking callbacks.
    pub fn take_all(&self) -> Vec<T> {
        std::mem::take(&mut self.buffer.lock().items)
    }

    fn dispatch(&self, batch: Vec<T>) -> Result<(), AccumulatorError> {
        let batch_len = batch.len();
        let batch = Arc::new(batch);
        let callbacks: Vec<BatchCallback<T>> = self.callbacks.read().clone();
        if callbacks.is_empty() {
            debug!("[dfl-04] batch of {} drained with no callbacks registered", batch_len);
            return Ok(());
        }

        info!("[dfl-04] dispatching batch of {} to {} callbacks", batch_len, callbacks.len());
        self.pool
            .submit(move || {
                for callback in &callbacks {
                    callback(Arc::clone(&batch));
                }
            })
            .map_err(|source| {
                error!("[dfl-04] batch of {} dropped: {}", batch_len, source);
                AccumulatorError::DispatchFailed { batch_len, source }
            })
    }
}
