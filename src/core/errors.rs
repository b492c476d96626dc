/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{ExecutionModelKind, LockStrategyKind};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for work executed inside a single task
pub type TaskResult<T> = Result<T, TaskError>;

/// Result type for trial setup, execution and teardown
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Failures local to one task unit
///
/// A task error never aborts sibling tasks; it is recorded in the run's
/// failure ledger and surfaced after the completion barrier opens.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum TaskError {
    #[error("Task {task_id} interrupted during {backoff} backoff")]
    #[diagnostic(
        code(task::interrupted_during_backoff),
        help("An interrupt was raised for this task while it was suspended inside the critical section.")
    )]
    InterruptedDuringBackoff { task_id: usize, backoff: String },

    #[error("Task {task_id} could not acquire {lock} within {waited_ms}ms")]
    #[diagnostic(
        code(task::lock_acquisition_failure),
        help("The lock timeout is shorter than the contention on the shared primitive. Increase it or disable it.")
    )]
    LockAcquisitionFailure {
        task_id: usize,
        lock: LockStrategyKind,
        waited_ms: u64,
    },

    #[error("Task {task_id} panicked: {message}")]
    #[diagnostic(
        code(task::panicked),
        help("The critical section panicked. Any lock it held has been released.")
    )]
    TaskPanicked { task_id: usize, message: String },
}

impl TaskError {
    /// Index of the task that failed
    pub fn task_id(&self) -> usize {
        match self {
            Self::InterruptedDuringBackoff { task_id, .. }
            | Self::LockAcquisitionFailure { task_id, .. }
            | Self::TaskPanicked { task_id, .. } => *task_id,
        }
    }
}

/// Trial-level failures
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum HarnessError {
    #[error("Failed to provision {model} workers: {reason}")]
    #[diagnostic(
        code(harness::pool_provisioning_failure),
        help("Check thread limits (ulimit -u) and the configured worker capacity.")
    )]
    PoolProvisioningFailure {
        model: ExecutionModelKind,
        reason: String,
    },

    #[error("Invalid trial configuration: {0}")]
    #[diagnostic(
        code(harness::invalid_config),
        help("Worker capacity and load factor must be positive and their product bounded.")
    )]
    InvalidConfig(String),

    #[error("Burst under-submitted: {submitted}/{expected} tasks accepted ({reason})")]
    #[diagnostic(
        code(harness::submission_failed),
        help("The worker pool stopped accepting work mid-burst. The run is discarded.")
    )]
    SubmissionFailed {
        submitted: usize,
        expected: usize,
        reason: String,
    },

    #[error("{0} pool already released")]
    #[diagnostic(
        code(harness::pool_released),
        help("Set up a new trial; a released pool cannot accept work.")
    )]
    PoolReleased(ExecutionModelKind),
}

impl HarnessError {
    pub fn provisioning(model: ExecutionModelKind, reason: impl ToString) -> Self {
        Self::PoolProvisioningFailure {
            model,
            reason: reason.to_string(),
        }
    }
}

/// Measurement driver errors
#[derive(Error, Debug, Diagnostic)]
pub enum DriverError {
    #[error("Harness error: {0}")]
    #[diagnostic(transparent)]
    Harness(#[from] HarnessError),

    #[error("Failed to load sweep config {path}: {reason}")]
    #[diagnostic(
        code(driver::config_load),
        help("The sweep file must be JSON matching the documented SweepConfig fields.")
    )]
    ConfigLoad { path: String, reason: String },

    #[error("Invalid sweep: {0}")]
    #[diagnostic(
        code(driver::invalid_sweep),
        help("Every axis needs at least one value and iteration counts must be positive.")
    )]
    InvalidSweep(String),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(driver::serialization))]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(driver::io_error),
        help("Check that the report destination is writable.")
    )]
    Io(#[from] std::io::Error),
}

pub type DriverResult<T> = Result<T, DriverError>;
