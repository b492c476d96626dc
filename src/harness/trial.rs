/*!
 * Trial Lifecycle
 *
 * A trial owns every resource its bursts touch: the worker pool, the
 * shared lock primitive and the interrupt registry. Setup acquires them,
 * teardown (or drop) releases them after draining in-flight work.
 */

use crate::core::limits::{DEFAULT_LOAD_FACTOR, MAX_TASK_COUNT, PARALLELISM_ENV};
use crate::core::sync::{Backoff, InterruptRegistry, LockStrategy};
use crate::core::{BackoffKind, ExecutionModelKind, HarnessError, HarnessResult, LockStrategyKind};
use crate::execution::{PoolStats, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Parameters of one trial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialConfig {
    pub execution_model: ExecutionModelKind,
    pub lock_strategy: LockStrategyKind,
    pub backoff: BackoffKind,
    /// Explicit capacity; `None` resolves to the ambient parallelism
    pub worker_capacity: Option<usize>,
    pub load_factor: usize,
    /// Bound on lock acquisition; `None` waits indefinitely
    pub lock_timeout: Option<Duration>,
    /// Interval after which an outstanding burst is logged as stalled
    pub stall_warning: Option<Duration>,
}

impl TrialConfig {
    pub fn new(
        execution_model: ExecutionModelKind,
        lock_strategy: LockStrategyKind,
        backoff: BackoffKind,
    ) -> Self {
        Self {
            execution_model,
            lock_strategy,
            backoff,
            worker_capacity: None,
            load_factor: DEFAULT_LOAD_FACTOR,
            lock_timeout: None,
            stall_warning: None,
        }
    }

    pub fn with_worker_capacity(mut self, capacity: usize) -> Self {
        self.worker_capacity = Some(capacity);
        self
    }

    pub fn with_load_factor(mut self, load_factor: usize) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    pub fn with_stall_warning(mut self, interval: Duration) -> Self {
        self.stall_warning = Some(interval);
        self
    }

    /// Explicit override, otherwise the process-wide ambient level
    pub fn resolve_worker_capacity(&self) -> usize {
        self.worker_capacity.unwrap_or_else(ambient_parallelism)
    }

    /// `worker_capacity × load_factor`, validated
    pub fn task_count(&self, worker_capacity: usize) -> HarnessResult<usize> {
        if worker_capacity == 0 {
            return Err(HarnessError::InvalidConfig(
                "worker capacity must be at least 1".into(),
            ));
        }
        if self.load_factor == 0 {
            return Err(HarnessError::InvalidConfig(
                "load factor must be at least 1".into(),
            ));
        }

        worker_capacity
            .checked_mul(self.load_factor)
            .filter(|count| *count <= MAX_TASK_COUNT)
            .ok_or_else(|| {
                HarnessError::InvalidConfig(format!(
                    "{} workers × load factor {} exceeds {} tasks",
                    worker_capacity, self.load_factor, MAX_TASK_COUNT
                ))
            })
    }

    /// Short label used in logs and reports
    pub fn label(&self) -> String {
        format!(
            "{}/{}/{}",
            self.execution_model, self.lock_strategy, self.backoff
        )
    }
}

/// Parallelism level taken from the environment override or the hardware
///
/// Read once per process so every trial of a sweep compares at the same level.
pub fn ambient_parallelism() -> usize {
    static AMBIENT: OnceLock<usize> = OnceLock::new();
    *AMBIENT.get_or_init(|| {
        let available = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let configured = std::env::var(PARALLELISM_ENV).ok();
        let resolved = parallelism_from(configured.as_deref(), available);
        debug!(available, resolved, "Resolved ambient parallelism");
        resolved
    })
}

/// Pick the override when it parses to a positive count
pub fn parallelism_from(configured: Option<&str>, available: usize) -> usize {
    match configured.map(str::trim) {
        None | Some("") => available.max(1),
        Some(value) => match value.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!(
                    variable = PARALLELISM_ENV,
                    value, available, "Ignoring invalid parallelism override"
                );
                available.max(1)
            }
        },
    }
}

/// Resources and parameters fixed for the duration of a trial
pub struct Trial {
    id: Uuid,
    config: TrialConfig,
    worker_capacity: usize,
    task_count: usize,
    lock: Arc<LockStrategy>,
    backoff: Arc<dyn Backoff>,
    interrupts: InterruptRegistry,
    pool: WorkerPool,
    runs: AtomicUsize,
}

impl Trial {
    /// Acquire the trial's resources with the configured backoff kind
    pub fn setup(config: TrialConfig) -> HarnessResult<Self> {
        let backoff: Arc<dyn Backoff> = Arc::new(config.backoff);
        Self::setup_with_backoff(config, backoff)
    }

    /// Acquire the trial's resources around a caller-provided backoff
    ///
    /// The backoff replaces `config.backoff` in the critical section.
    pub fn setup_with_backoff(
        config: TrialConfig,
        backoff: Arc<dyn Backoff>,
    ) -> HarnessResult<Self> {
        let worker_capacity = config.resolve_worker_capacity();
        let task_count = config.task_count(worker_capacity)?;

        let lock = Arc::new(
            LockStrategy::for_model(config.lock_strategy, config.execution_model)
                .with_acquire_timeout(config.lock_timeout),
        );
        let pool = WorkerPool::acquire(config.execution_model, worker_capacity)?;
        let id = Uuid::new_v4();

        info!(
            trial = %id,
            model = %config.execution_model,
            lock = %config.lock_strategy,
            backoff = backoff.name(),
            worker_capacity,
            task_count,
            "Trial set up"
        );

        Ok(Self {
            id,
            config,
            worker_capacity,
            task_count,
            lock,
            backoff,
            interrupts: InterruptRegistry::new(),
            pool,
            runs: AtomicUsize::new(0),
        })
    }

    /// Drain and release the worker pool
    pub fn teardown(mut self) -> PoolStats {
        self.release_resources();
        let stats = self.pool.stats();
        info!(
            trial = %self.id,
            runs = self.runs(),
            completed = stats.completed,
            "Trial torn down"
        );
        stats
    }

    /// Raise an interrupt against `task_id` for the next run that reaches it
    ///
    /// Returns false if `task_id` is outside the burst or already pending.
    pub fn interrupt(&self, task_id: usize) -> bool {
        if task_id >= self.task_count {
            warn!(
                trial = %self.id,
                task_id,
                task_count = self.task_count,
                "Interrupt target outside the burst"
            );
            return false;
        }
        self.interrupts.interrupt(task_id)
    }

    /// Interrupts raised but not yet observed by a suspension
    pub fn pending_interrupts(&self) -> usize {
        self.interrupts.pending_count()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    pub fn worker_capacity(&self) -> usize {
        self.worker_capacity
    }

    pub fn task_count(&self) -> usize {
        self.task_count
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }

    pub(crate) fn lock(&self) -> &Arc<LockStrategy> {
        &self.lock
    }

    pub(crate) fn backoff(&self) -> &Arc<dyn Backoff> {
        &self.backoff
    }

    pub(crate) fn interrupts(&self) -> &InterruptRegistry {
        &self.interrupts
    }

    pub(crate) fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub(crate) fn next_run(&self) -> usize {
        self.runs.fetch_add(1, Ordering::Relaxed)
    }

    fn release_resources(&mut self) {
        if self.pool.is_released() {
            return;
        }
        self.pool.release();
        let stale = self.interrupts.clear();
        if stale > 0 {
            debug!(trial = %self.id, stale, "Discarded unconsumed interrupts");
        }
    }
}

impl Drop for Trial {
    fn drop(&mut self) {
        self.release_resources();
    }
}

impl std::fmt::Debug for Trial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trial")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("worker_capacity", &self.worker_capacity)
            .field("task_count", &self.task_count)
            .field("backoff", &self.backoff.name())
            .field("pool", &self.pool)
            .finish()
    }
}
