/*!
 * sync-burst
 * Synchronization-overhead measurement harness exposed as a library
 *
 * A trial runs bursts of tasks over a bounded thread pool or a per-task
 * runtime; each task applies a backoff inside a lock strategy and signals a
 * completion barrier. The driver module sweeps and reports.
 */

pub mod core;
pub mod driver;
pub mod execution;
pub mod harness;
pub mod monitoring;

// Re-exports
pub use crate::core::sync::{Backoff, CompletionBarrier, LockStrategy, TaskContext};
pub use crate::core::{
    BackoffKind, DriverError, ExecutionModelKind, HarnessError, HarnessResult, LockStrategyKind,
    TaskError, TaskResult,
};
pub use execution::{PoolStats, WorkerPool};
pub use harness::{
    run_trial, setup_trial, teardown_trial, OccupancyGauge, Trial, TrialConfig, TrialOutcome,
};
pub use monitoring::init_tracing;
