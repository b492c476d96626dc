/*!
 * Lock Strategies
 *
 * Wraps a critical section with the mutual-exclusion discipline selected
 * for the trial. Release is guard-based: it happens exactly once on every
 * exit path, including a panicking critical section.
 *
 * Per-task trials back `ReentrantMutex` with an async mutex so waiters
 * suspend instead of holding their carrier thread. `ExclusiveMonitor`
 * always blocks: a waiter or holder stays pinned to its OS thread.
 */

use super::backoff::TaskContext;
use crate::core::types::{ExecutionModelKind, LockStrategyKind};
use crate::core::{TaskError, TaskResult};
use parking_lot::{Mutex, ReentrantMutex};
use std::future::Future;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

/// Trial-scoped primitive behind each discipline
enum Primitive {
    ExclusiveMonitor(Mutex<()>),
    ReentrantMutex(ReentrantMutex<()>),
    Suspending(AsyncMutex<()>),
    NoLock,
}

/// Mutual-exclusion discipline with its shared primitive
///
/// One instance is created per trial and shared by every task of that trial.
/// It is never reused across trials.
pub struct LockStrategy {
    kind: LockStrategyKind,
    primitive: Primitive,
    acquire_timeout: Option<Duration>,
}

impl LockStrategy {
    /// Blocking primitive for `kind`
    pub fn new(kind: LockStrategyKind) -> Self {
        let primitive = match kind {
            LockStrategyKind::ExclusiveMonitor => Primitive::ExclusiveMonitor(Mutex::new(())),
            LockStrategyKind::ReentrantMutex => Primitive::ReentrantMutex(ReentrantMutex::new(())),
            LockStrategyKind::NoLock => Primitive::NoLock,
        };

        Self {
            kind,
            primitive,
            acquire_timeout: None,
        }
    }

    /// Primitive suited to the workers of `model`
    pub fn for_model(kind: LockStrategyKind, model: ExecutionModelKind) -> Self {
        match (kind, model) {
            (LockStrategyKind::ReentrantMutex, ExecutionModelKind::PerTaskUnbounded) => Self {
                kind,
                primitive: Primitive::Suspending(AsyncMutex::new(())),
                acquire_timeout: None,
            },
            _ => Self::new(kind),
        }
    }

    /// Bound lock acquisition; expiry fails the task
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn kind(&self) -> LockStrategyKind {
        self.kind
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }

    /// Execute `critical_section` under this discipline, blocking to acquire
    ///
    /// The guard is dropped after the closure returns or unwinds.
    pub fn run_under_lock<F, R>(&self, ctx: &TaskContext, critical_section: F) -> TaskResult<R>
    where
        F: FnOnce() -> TaskResult<R>,
    {
        match &self.primitive {
            Primitive::ExclusiveMonitor(monitor) => {
                let _guard = match self.acquire_timeout {
                    Some(timeout) => monitor
                        .try_lock_for(timeout)
                        .ok_or_else(|| self.acquisition_failure(ctx, timeout))?,
                    None => monitor.lock(),
                };
                critical_section()
            }
            Primitive::ReentrantMutex(mutex) => {
                let _guard = match self.acquire_timeout {
                    Some(timeout) => mutex
                        .try_lock_for(timeout)
                        .ok_or_else(|| self.acquisition_failure(ctx, timeout))?,
                    None => mutex.lock(),
                };
                critical_section()
            }
            Primitive::Suspending(mutex) => {
                let _guard = self.acquire_yielding(mutex, ctx)?;
                critical_section()
            }
            Primitive::NoLock => critical_section(),
        }
    }

    /// Suspending view of this strategy, if waiters can release their carrier
    ///
    /// `None` for the blocking primitives: their sections run through
    /// `run_under_lock` and pin the calling thread.
    pub fn suspending(&self) -> Option<SuspendingLock<'_>> {
        let mutex = match &self.primitive {
            Primitive::Suspending(mutex) => Some(mutex),
            Primitive::NoLock => None,
            Primitive::ExclusiveMonitor(_) | Primitive::ReentrantMutex(_) => return None,
        };
        Some(SuspendingLock {
            strategy: self,
            mutex,
        })
    }

    /// Whether some task currently holds the primitive
    pub fn is_locked(&self) -> bool {
        match &self.primitive {
            Primitive::ExclusiveMonitor(monitor) => monitor.is_locked(),
            Primitive::ReentrantMutex(mutex) => mutex.is_locked(),
            Primitive::Suspending(mutex) => mutex.try_lock().is_err(),
            Primitive::NoLock => false,
        }
    }

    /// Blocking acquisition of the async primitive from outside a runtime
    fn acquire_yielding<'a>(
        &self,
        mutex: &'a AsyncMutex<()>,
        ctx: &TaskContext,
    ) -> TaskResult<AsyncMutexGuard<'a, ()>> {
        let started = Instant::now();
        loop {
            if let Ok(guard) = mutex.try_lock() {
                return Ok(guard);
            }
            if let Some(timeout) = self.acquire_timeout {
                if started.elapsed() >= timeout {
                    return Err(self.acquisition_failure(ctx, timeout));
                }
            }
            thread::yield_now();
        }
    }

    fn acquisition_failure(&self, ctx: &TaskContext, waited: Duration) -> TaskError {
        TaskError::LockAcquisitionFailure {
            task_id: ctx.task_id(),
            lock: self.kind,
            waited_ms: waited.as_millis() as u64,
        }
    }
}

impl std::fmt::Debug for LockStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockStrategy")
            .field("kind", &self.kind)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("suspending", &self.suspending().is_some())
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Lock strategy whose waiters suspend rather than block
///
/// Only reachable through `LockStrategy::suspending`.
pub struct SuspendingLock<'a> {
    strategy: &'a LockStrategy,
    mutex: Option<&'a AsyncMutex<()>>,
}

impl SuspendingLock<'_> {
    /// Execute `critical_section` under the lock, suspending while waiting
    ///
    /// Must be polled inside a runtime with timers enabled when an acquire
    /// timeout is set.
    pub async fn run_under_lock<F, Fut, R>(
        &self,
        ctx: &TaskContext,
        critical_section: F,
    ) -> TaskResult<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = TaskResult<R>>,
    {
        let Some(mutex) = self.mutex else {
            return critical_section().await;
        };

        let _guard = match self.strategy.acquire_timeout {
            Some(timeout) => tokio::time::timeout(timeout, mutex.lock())
                .await
                .map_err(|_| self.strategy.acquisition_failure(ctx, timeout))?,
            None => mutex.lock().await,
        };
        critical_section().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::InterruptRegistry;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::mpsc;
    use futures::FutureExt;
    use std::sync::Arc;
    use std::thread;

    fn ctx(task_id: usize) -> TaskContext {
        TaskContext::new(task_id, InterruptRegistry::new())
    }

    #[test]
    fn test_lock_held_only_inside_section() {
        for kind in [LockStrategyKind::ExclusiveMonitor, LockStrategyKind::ReentrantMutex] {
            let lock = LockStrategy::new(kind);
            let held = lock.run_under_lock(&ctx(0), || Ok(lock.is_locked())).unwrap();
            assert!(held, "{kind} should be held inside the section");
            assert!(!lock.is_locked());
        }
    }

    #[test]
    fn test_error_releases_lock() {
        let lock = LockStrategy::new(LockStrategyKind::ExclusiveMonitor);
        let result: TaskResult<()> = lock.run_under_lock(&ctx(2), || {
            Err(TaskError::TaskPanicked {
                task_id: 2,
                message: "boom".into(),
            })
        });
        assert!(result.is_err());
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_panic_releases_lock() {
        for kind in [LockStrategyKind::ExclusiveMonitor, LockStrategyKind::ReentrantMutex] {
            let lock = LockStrategy::new(kind);
            let unwound = panic::catch_unwind(AssertUnwindSafe(|| {
                let _: TaskResult<()> = lock.run_under_lock(&ctx(0), || panic!("critical section"));
            }));
            assert!(unwound.is_err());
            assert!(!lock.is_locked(), "{kind} must be released on unwind");
        }
    }

    #[test]
    fn test_reentrant_mutex_nests() {
        let lock = LockStrategy::new(LockStrategyKind::ReentrantMutex);
        let depth = lock
            .run_under_lock(&ctx(0), || lock.run_under_lock(&ctx(0), || Ok(2)))
            .unwrap();
        assert_eq!(depth, 2);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_acquire_timeout_fails_task() {
        let lock = Arc::new(
            LockStrategy::new(LockStrategyKind::ExclusiveMonitor)
                .with_acquire_timeout(Some(Duration::from_millis(20))),
        );
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let lock = lock.clone();
            thread::spawn(move || {
                lock.run_under_lock(&ctx(0), || {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(())
                })
            })
        };

        entered_rx.recv().unwrap();
        let err = lock.run_under_lock(&ctx(1), || Ok(())).unwrap_err();
        assert_eq!(
            err,
            TaskError::LockAcquisitionFailure {
                task_id: 1,
                lock: LockStrategyKind::ExclusiveMonitor,
                waited_ms: 20
            }
        );

        release_tx.send(()).unwrap();
        assert!(holder.join().unwrap().is_ok());
        assert!(lock.run_under_lock(&ctx(1), || Ok(())).is_ok());
    }

    #[test]
    fn test_no_lock_never_holds() {
        let lock = LockStrategy::new(LockStrategyKind::NoLock);
        assert!(!lock.run_under_lock(&ctx(0), || Ok(lock.is_locked())).unwrap());
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
    }

    async fn exploding_section() -> TaskResult<()> {
        panic!("critical section")
    }

    #[test]
    fn test_primitive_follows_model() {
        let suspends = |kind, model| LockStrategy::for_model(kind, model).suspending().is_some();

        assert!(!suspends(
            LockStrategyKind::ExclusiveMonitor,
            ExecutionModelKind::PerTaskUnbounded
        ));
        assert!(!suspends(
            LockStrategyKind::ReentrantMutex,
            ExecutionModelKind::BoundedPool
        ));
        assert!(suspends(
            LockStrategyKind::ReentrantMutex,
            ExecutionModelKind::PerTaskUnbounded
        ));
        assert!(suspends(
            LockStrategyKind::NoLock,
            ExecutionModelKind::BoundedPool
        ));
    }

    #[test]
    fn test_suspending_lock_held_only_inside_section() {
        let lock = LockStrategy::for_model(
            LockStrategyKind::ReentrantMutex,
            ExecutionModelKind::PerTaskUnbounded,
        );
        let view = lock.suspending().unwrap();

        let held = runtime()
            .block_on(view.run_under_lock(&ctx(0), || async { Ok(lock.is_locked()) }))
            .unwrap();
        assert!(held);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_suspending_panic_releases_lock() {
        let lock = LockStrategy::for_model(
            LockStrategyKind::ReentrantMutex,
            ExecutionModelKind::PerTaskUnbounded,
        );
        let view = lock.suspending().unwrap();

        let unwound = runtime().block_on(
            AssertUnwindSafe(view.run_under_lock(&ctx(0), exploding_section)).catch_unwind(),
        );
        assert!(unwound.is_err());
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_suspending_acquire_timeout_fails_task() {
        let lock = LockStrategy::for_model(
            LockStrategyKind::ReentrantMutex,
            ExecutionModelKind::PerTaskUnbounded,
        )
        .with_acquire_timeout(Some(Duration::from_millis(10)));
        let view = lock.suspending().unwrap();
        let runtime = runtime();

        let err = runtime
            .block_on(view.run_under_lock(&ctx(0), || async {
                // Contend from inside the holder's own section
                view.run_under_lock(&ctx(1), || async { Ok(()) }).await
            }))
            .unwrap_err();
        assert_eq!(
            err,
            TaskError::LockAcquisitionFailure {
                task_id: 1,
                lock: LockStrategyKind::ReentrantMutex,
                waited_ms: 10
            }
        );
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_blocking_path_on_async_primitive() {
        let lock = LockStrategy::for_model(
            LockStrategyKind::ReentrantMutex,
            ExecutionModelKind::PerTaskUnbounded,
        )
        .with_acquire_timeout(Some(Duration::from_millis(5)));

        assert!(lock.run_under_lock(&ctx(0), || Ok(lock.is_locked())).unwrap());
        let err = lock
            .run_under_lock(&ctx(0), || lock.run_under_lock(&ctx(1), || Ok(())))
            .unwrap_err();
        assert!(matches!(err, TaskError::LockAcquisitionFailure { task_id: 1, .. }));
    }
}
