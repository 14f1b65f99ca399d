//! # Bounded Worker Pool
//!
//! A fixed number of named worker threads draining a bounded job queue.
//! Inbound gossip processing and batch callbacks run here so the accept loop
//! never blocks on downstream work and a message flood cannot spawn
//! unbounded threads.
//!
//! A full queue rejects the job with `WorkerPoolError::QueueFull`; callers
//! log and drop.

use crate::errors::WorkerPoolError;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// A unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    name: String,
    capacity: usize,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `threads` workers sharing a queue of `capacity` pending jobs.
    pub fn new(name: &str, threads: usize, capacity: usize) -> std::io::Result<Self> {
        let threads = threads.max(1);
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel::<Job>(capacity);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let rx = Arc::clone(&rx);
            let thread_name = format!("{name}-{index}");
            let handle = std::thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_loop(&thread_name, &rx))?;
            workers.push(handle);
        }
        debug!(pool = name, threads, capacity, "worker pool started");

        Ok(Self {
            name: name.to_string(),
            capacity,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        })
    }

    /// Queue a job without blocking.
    pub fn submit<F>(&self, job: F) -> Result<(), WorkerPoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .lock()
            .as_ref()
            .cloned()
            .ok_or(WorkerPoolError::ShutDown)?;

        sender.try_send(Box::new(job)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!(pool = %self.name, capacity = self.capacity, "worker queue full, job dropped");
                WorkerPoolError::QueueFull {
                    capacity: self.capacity,
                }
            }
            mpsc::error::TrySendError::Closed(_) => WorkerPoolError::ShutDown,
        })
    }

    /// Stop accepting jobs, let queued jobs finish, and join the workers.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        let current = std::thread::current().id();
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!(pool = %self.name, "worker thread terminated abnormally");
            }
        }
        debug!(pool = %self.name, "worker pool stopped");
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Workers exit once the queue drains; they are not joined here.
        self.sender.lock().take();
    }
}

fn worker_loop(thread_name: &str, rx: &Mutex<mpsc::Receiver<Job>>) {
    loop {
        let job = rx.lock().blocking_recv();
        let Some(job) = job else { break };
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(worker = thread_name, "job panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc as std_mpsc;

    #[test]
    fn test_shutdown_drains_queued_jobs() {
        let pool = WorkerPool::new("test", 2, 16).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown();

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_full_queue_rejects_job() {
        let pool = WorkerPool::new("test", 1, 1).unwrap();
        let (started_tx, started_rx) = std_mpsc::channel();
        let (release_tx, release_rx) = std_mpsc::channel::<()>();

        pool.submit(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
        })
        .unwrap();
        started_rx.recv().unwrap();

        pool.submit(|| {}).unwrap();
        let overflow = pool.submit(|| {});
        assert_eq!(overflow, Err(WorkerPoolError::QueueFull { capacity: 1 }));

        release_tx.send(()).unwrap();
        pool.shutdown();
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new("test", 1, 4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit(|| panic!("boom")).unwrap();
        let c = Arc::clone(&counter);
        pool.submit(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        pool.shutdown();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let pool = WorkerPool::new("test", 1, 4).unwrap();
        pool.shutdown();
        assert_eq!(pool.submit(|| {}), Err(WorkerPoolError::ShutDown));
    }
}
