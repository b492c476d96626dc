/*!
 * Execution Models
 *
 * Worker resources scoped to one trial:
 * - `BoundedPool`: fixed set of OS threads draining a shared queue
 * - `PerTaskPool`: one lightweight runtime task per submission; a task
 *   that suspends gives its carrier thread to the others
 *
 * Both are RAII: `release` drains in-flight work, and dropping an
 * unreleased pool releases it.
 */

mod bounded;
mod per_task;

pub use bounded::BoundedPool;
pub use per_task::PerTaskPool;

use crate::core::{ExecutionModelKind, HarnessResult};
use serde::Serialize;
use tracing::debug;

/// Unit of work accepted by a pool
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Point-in-time counters for a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub kind: ExecutionModelKind,
    pub worker_capacity: usize,
    /// Workers created so far (threads or tasks)
    pub provisioned_workers: usize,
    pub submitted: usize,
    pub completed: usize,
}

/// Worker resource owned by a trial
pub enum WorkerPool {
    Bounded(BoundedPool),
    PerTask(PerTaskPool),
}

impl WorkerPool {
    /// Provision workers for `kind`
    ///
    /// Fails with `PoolProvisioningFailure` before any work is accepted.
    pub fn acquire(kind: ExecutionModelKind, worker_capacity: usize) -> HarnessResult<Self> {
        debug!(model = %kind, worker_capacity, "Acquiring worker pool");
        match kind {
            ExecutionModelKind::BoundedPool => BoundedPool::new(worker_capacity).map(Self::Bounded),
            ExecutionModelKind::PerTaskUnbounded => {
                PerTaskPool::new(worker_capacity).map(Self::PerTask)
            }
        }
    }

    /// Hand a job to the pool without waiting for it
    #[inline]
    pub fn submit(&self, job: Job) -> HarnessResult<()> {
        match self {
            Self::Bounded(pool) => pool.submit(job),
            Self::PerTask(pool) => pool.submit(job),
        }
    }

    /// Stop accepting work and drain everything in flight
    ///
    /// Idempotent.
    pub fn release(&mut self) {
        match self {
            Self::Bounded(pool) => pool.release(),
            Self::PerTask(pool) => pool.release(),
        }
    }

    pub fn kind(&self) -> ExecutionModelKind {
        match self {
            Self::Bounded(_) => ExecutionModelKind::BoundedPool,
            Self::PerTask(_) => ExecutionModelKind::PerTaskUnbounded,
        }
    }

    pub fn is_released(&self) -> bool {
        match self {
            Self::Bounded(pool) => pool.is_released(),
            Self::PerTask(pool) => pool.is_released(),
        }
    }

    pub fn stats(&self) -> PoolStats {
        match self {
            Self::Bounded(pool) => pool.stats(),
            Self::PerTask(pool) => pool.stats(),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("stats", &self.stats())
            .field("released", &self.is_released())
            .finish()
    }
}
