/*!
 * Bounded Pool
 * Fixed set of long-lived OS threads sharing one unbounded queue
 */

use super::{Job, PoolStats};
use crate::core::limits::BOUNDED_WORKER_PREFIX;
use crate::core::{ExecutionModelKind, HarnessError, HarnessResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Pool of `capacity` worker threads created up front and never resized
///
/// Submission never blocks: jobs queue when every worker is busy.
pub struct BoundedPool {
    capacity: usize,
    sender: Option<flume::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    submitted: AtomicUsize,
    completed: Arc<AtomicUsize>,
}

impl BoundedPool {
    pub fn new(capacity: usize) -> HarnessResult<Self> {
        if capacity == 0 {
            return Err(HarnessError::provisioning(
                ExecutionModelKind::BoundedPool,
                "worker capacity must be at least 1",
            ));
        }

        let (sender, receiver) = flume::unbounded::<Job>();
        let completed = Arc::new(AtomicUsize::new(0));
        let mut workers = Vec::with_capacity(capacity);

        for index in 0..capacity {
            let receiver = receiver.clone();
            let completed = completed.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", BOUNDED_WORKER_PREFIX, index))
                .spawn(move || worker_loop(receiver, completed));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(index, capacity, error = %e, "Failed to spawn pool worker");
                    // Retire the workers that did start before reporting
                    drop(sender);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(HarnessError::provisioning(
                        ExecutionModelKind::BoundedPool,
                        format!("worker {} of {}: {}", index, capacity, e),
                    ));
                }
            }
        }

        debug!(capacity, "Bounded pool provisioned");

        Ok(Self {
            capacity,
            sender: Some(sender),
            workers,
            submitted: AtomicUsize::new(0),
            completed,
        })
    }

    #[inline]
    pub fn submit(&self, job: Job) -> HarnessResult<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(HarnessError::PoolReleased(ExecutionModelKind::BoundedPool))?;

        sender
            .send(job)
            .map_err(|_| HarnessError::PoolReleased(ExecutionModelKind::BoundedPool))?;
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Close the queue, let workers drain it, and join them
    pub fn release(&mut self) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        drop(sender);

        let queued = self
            .submitted
            .load(Ordering::Relaxed)
            .saturating_sub(self.completed.load(Ordering::Acquire));
        debug!(capacity = self.capacity, queued, "Draining bounded pool");

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Pool worker exited abnormally");
            }
        }
    }

    pub fn is_released(&self) -> bool {
        self.sender.is_none()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            kind: ExecutionModelKind::BoundedPool,
            worker_capacity: self.capacity,
            provisioned_workers: self.capacity,
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Acquire),
        }
    }
}

impl Drop for BoundedPool {
    fn drop(&mut self) {
        self.release();
    }
}

/// Runs queued jobs until the queue is closed and empty
fn worker_loop(receiver: flume::Receiver<Job>, completed: Arc<AtomicUsize>) {
    while let Ok(job) = receiver.recv() {
        // A panicking job must not take the worker down with it
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!("Job panicked on pool worker");
        }
        completed.fetch_add(1, Ordering::Release);
    }
}
