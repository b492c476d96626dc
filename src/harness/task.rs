/*!
 * Task Unit
 *
 * One schedulable unit of a burst: backoff under lock, then a completion
 * signal on every exit path.
 *
 * `run` blocks its thread throughout. `run_suspending` yields the carrier
 * while waiting for the lock or stalling, unless the lock strategy pins
 * the carrier; then it runs the blocking path in place.
 */

use crate::core::sync::{Backoff, CompletionBarrier, LockStrategy, TaskContext};
use crate::core::{TaskError, TaskResult};
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Task-local failures collected over one run
#[derive(Debug, Default)]
pub struct FailureLedger {
    count: AtomicUsize,
    last: Mutex<Option<TaskError>>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, error: TaskError) {
        self.count.fetch_add(1, Ordering::Relaxed);
        *self.last.lock() = Some(error);
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn last(&self) -> Option<TaskError> {
        self.last.lock().clone()
    }
}

/// Decrements the barrier when dropped
struct CompletionSignal<'a>(&'a CompletionBarrier);

impl Drop for CompletionSignal<'_> {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

/// Lock strategy and backoff bound to one task index
pub struct TaskUnit {
    ctx: TaskContext,
    lock: Arc<LockStrategy>,
    backoff: Arc<dyn Backoff>,
    failures: Arc<FailureLedger>,
}

impl TaskUnit {
    pub fn new(
        ctx: TaskContext,
        lock: Arc<LockStrategy>,
        backoff: Arc<dyn Backoff>,
        failures: Arc<FailureLedger>,
    ) -> Self {
        Self {
            ctx,
            lock,
            backoff,
            failures,
        }
    }

    pub fn task_id(&self) -> usize {
        self.ctx.task_id()
    }

    /// Apply the backoff under the lock, then signal `barrier` exactly once
    ///
    /// Errors and panics from the critical section are recorded, never
    /// propagated: a failed task must not abort its siblings.
    pub fn run(&self, barrier: &CompletionBarrier) {
        // Declared first so it drops last, after the failure is recorded
        let _signal = CompletionSignal(barrier);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute()));
        self.settle(outcome);
    }

    /// `run` for a task driven by an async runtime
    pub async fn run_suspending(&self, barrier: &CompletionBarrier) {
        let _signal = CompletionSignal(barrier);

        let outcome = match self.lock.suspending() {
            Some(lock) => {
                let section =
                    lock.run_under_lock(&self.ctx, || self.backoff.apply_suspending(&self.ctx));
                AssertUnwindSafe(section).catch_unwind().await
            }
            None => panic::catch_unwind(AssertUnwindSafe(|| self.execute())),
        };
        self.settle(outcome);
    }

    #[inline]
    fn execute(&self) -> TaskResult<()> {
        self.lock
            .run_under_lock(&self.ctx, || self.backoff.apply(&self.ctx))
    }

    fn settle(&self, outcome: std::thread::Result<TaskResult<()>>) {
        let result = outcome.unwrap_or_else(|payload| {
            Err(TaskError::TaskPanicked {
                task_id: self.ctx.task_id(),
                message: panic_message(payload.as_ref()),
            })
        });

        if let Err(error) = result {
            debug!(task_id = self.ctx.task_id(), error = %error, "Task failed");
            self.failures.record(error);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::InterruptRegistry;
    use crate::core::{BackoffKind, ExecutionModelKind, LockStrategyKind};

    struct PanickingBackoff;

    impl Backoff for PanickingBackoff {
        fn apply(&self, _ctx: &TaskContext) -> TaskResult<()> {
            panic!("backoff exploded");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    fn unit(
        task_id: usize,
        interrupts: &InterruptRegistry,
        lock: &Arc<LockStrategy>,
        backoff: Arc<dyn Backoff>,
        failures: &Arc<FailureLedger>,
    ) -> TaskUnit {
        TaskUnit::new(
            TaskContext::new(task_id, interrupts.clone()),
            lock.clone(),
            backoff,
            failures.clone(),
        )
    }

    #[test]
    fn test_success_signals_once() {
        let interrupts = InterruptRegistry::new();
        let lock = Arc::new(LockStrategy::new(LockStrategyKind::ReentrantMutex));
        let failures = Arc::new(FailureLedger::new());
        let barrier = CompletionBarrier::new(1);

        unit(0, &interrupts, &lock, Arc::new(BackoffKind::ParkBrief), &failures).run(&barrier);

        assert!(barrier.is_open());
        assert_eq!(barrier.overruns(), 0);
        assert_eq!(failures.count(), 0);
    }

    #[test]
    fn test_interrupt_still_signals() {
        let interrupts = InterruptRegistry::new();
        interrupts.interrupt(5);
        let lock = Arc::new(LockStrategy::new(LockStrategyKind::ExclusiveMonitor));
        let failures = Arc::new(FailureLedger::new());
        let barrier = CompletionBarrier::new(1);

        unit(5, &interrupts, &lock, Arc::new(BackoffKind::SleepBrief), &failures).run(&barrier);

        assert_eq!(barrier.decrements(), 1);
        assert_eq!(failures.count(), 1);
        assert!(matches!(
            failures.last(),
            Some(TaskError::InterruptedDuringBackoff { task_id: 5, .. })
        ));
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_panic_is_recorded_and_lock_released() {
        let interrupts = InterruptRegistry::new();
        let lock = Arc::new(LockStrategy::new(LockStrategyKind::ExclusiveMonitor));
        let failures = Arc::new(FailureLedger::new());
        let barrier = CompletionBarrier::new(2);

        unit(0, &interrupts, &lock, Arc::new(PanickingBackoff), &failures).run(&barrier);
        unit(1, &interrupts, &lock, Arc::new(BackoffKind::None), &failures).run(&barrier);

        assert!(barrier.is_open());
        assert_eq!(failures.count(), 1);
        assert_eq!(
            failures.last(),
            Some(TaskError::TaskPanicked {
                task_id: 0,
                message: "backoff exploded".to_string()
            })
        );
    }

    #[test]
    fn test_suspending_run_records_failures_and_signals() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let interrupts = InterruptRegistry::new();
        interrupts.interrupt(1);
        let lock = Arc::new(LockStrategy::for_model(
            LockStrategyKind::ReentrantMutex,
            ExecutionModelKind::PerTaskUnbounded,
        ));
        let failures = Arc::new(FailureLedger::new());
        let barrier = CompletionBarrier::new(3);

        runtime.block_on(async {
            unit(0, &interrupts, &lock, Arc::new(PanickingBackoff), &failures)
                .run_suspending(&barrier)
                .await;
            unit(1, &interrupts, &lock, Arc::new(BackoffKind::SleepBrief), &failures)
                .run_suspending(&barrier)
                .await;
            unit(2, &interrupts, &lock, Arc::new(BackoffKind::ParkBrief), &failures)
                .run_suspending(&barrier)
                .await;
        });

        assert!(barrier.is_open());
        assert_eq!(barrier.overruns(), 0);
        assert_eq!(failures.count(), 2);
        assert!(matches!(
            failures.last(),
            Some(TaskError::InterruptedDuringBackoff { task_id: 1, .. })
        ));
        assert!(!lock.is_locked());
    }
}
