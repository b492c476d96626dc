/*!
 * Per-Task Pool
 *
 * Every submission becomes its own lightweight task on a work-stealing
 * runtime. Nothing is pre-allocated per task and tasks retire on
 * completion. The carrier thread count mirrors the worker capacity so both
 * models are compared at the same parallelism; it never caps how many
 * tasks are in flight.
 *
 * Futures submitted through `spawn` release their carrier whenever they
 * suspend, so the number of tasks making progress is not bounded by the
 * carrier count. Blocking closures submitted through `submit` occupy their
 * carrier until they return.
 */

use super::{Job, PoolStats};
use crate::core::limits::{CARRIER_THREAD_NAME, RUNTIME_SHUTDOWN_GRACE};
use crate::core::sync::InFlightGauge;
use crate::core::{ExecutionModelKind, HarnessError, HarnessResult};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Marks a task as retired when dropped, including on panic
struct Departure {
    in_flight: Arc<InFlightGauge>,
    completed: Arc<AtomicUsize>,
}

impl Drop for Departure {
    fn drop(&mut self) {
        self.completed.fetch_add(1, Ordering::Release);
        self.in_flight.exit();
    }
}

/// One task per submission over a shared set of carrier threads
pub struct PerTaskPool {
    carriers: usize,
    runtime: Option<Runtime>,
    in_flight: Arc<InFlightGauge>,
    submitted: AtomicUsize,
    completed: Arc<AtomicUsize>,
}

impl PerTaskPool {
    /// `worker_capacity` sizes the carrier threads only
    pub fn new(worker_capacity: usize) -> HarnessResult<Self> {
        if worker_capacity == 0 {
            return Err(HarnessError::provisioning(
                ExecutionModelKind::PerTaskUnbounded,
                "carrier count must be at least 1",
            ));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_capacity)
            .thread_name(CARRIER_THREAD_NAME)
            .enable_time()
            .build()
            .map_err(|e| HarnessError::provisioning(ExecutionModelKind::PerTaskUnbounded, e))?;

        debug!(carriers = worker_capacity, "Per-task runtime provisioned");

        Ok(Self {
            carriers: worker_capacity,
            runtime: Some(runtime),
            in_flight: Arc::new(InFlightGauge::new()),
            submitted: AtomicUsize::new(0),
            completed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Spawn a dedicated task for a blocking `job`
    #[inline]
    pub fn submit(&self, job: Job) -> HarnessResult<()> {
        self.spawn(async move { job() })
    }

    /// Spawn a dedicated task driving `future`
    pub fn spawn<F>(&self, future: F) -> HarnessResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or(HarnessError::PoolReleased(ExecutionModelKind::PerTaskUnbounded))?;

        self.in_flight.enter();
        let departure = Departure {
            in_flight: self.in_flight.clone(),
            completed: self.completed.clone(),
        };

        // Detached: completion is observed through the gauge, not the handle
        drop(runtime.spawn(async move {
            let _departure = departure;
            future.await;
        }));

        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Wait for every spawned task to retire, then stop the carriers
    ///
    /// Must not be called from inside an async context.
    pub fn release(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        debug!(in_flight = self.in_flight.current(), "Draining per-task runtime");
        self.in_flight.wait_idle();
        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    }

    pub fn is_released(&self) -> bool {
        self.runtime.is_none()
    }

    pub fn carriers(&self) -> usize {
        self.carriers
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.current()
    }

    pub fn stats(&self) -> PoolStats {
        let submitted = self.submitted.load(Ordering::Relaxed);
        PoolStats {
            kind: ExecutionModelKind::PerTaskUnbounded,
            worker_capacity: self.carriers,
            // One worker per submission
            provisioned_workers: submitted,
            submitted,
            completed: self.completed.load(Ordering::Acquire),
        }
    }
}

impl Drop for PerTaskPool {
    fn drop(&mut self) {
        self.release();
    }
}
