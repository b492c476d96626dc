/*!
 * Burst Coordinator
 *
 * Submits one burst of task units to the trial's pool and blocks once, on
 * the aggregate completion barrier. Submission never waits on individual
 * tasks.
 */

use super::task::{FailureLedger, TaskUnit};
use super::trial::Trial;
use crate::core::sync::{CompletionBarrier, TaskContext};
use crate::core::{HarnessError, HarnessResult, TaskError};
use crate::execution::WorkerPool;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Result of one `run_trial` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialOutcome {
    pub trial_id: Uuid,
    /// Zero-based index of this run within the trial
    pub run: usize,
    pub elapsed: Duration,
    pub task_count: usize,
    /// Barrier decrements observed when the wait returned
    pub decrements: usize,
    pub failed_tasks: usize,
    pub last_error: Option<TaskError>,
}

impl TrialOutcome {
    /// Every task ran to completion without a recorded failure
    pub fn is_clean(&self) -> bool {
        self.failed_tasks == 0 && self.decrements == self.task_count
    }
}

/// Run one burst and wait for every task to signal
///
/// No retries: failures of individual tasks are tallied in the outcome.
pub fn run_trial(trial: &Trial) -> HarnessResult<TrialOutcome> {
    let start = Instant::now();
    let run = trial.next_run();
    let task_count = trial.task_count();

    let barrier = Arc::new(CompletionBarrier::new(task_count));
    let failures = Arc::new(FailureLedger::new());

    let submission = submit_burst(task_count, &barrier, |task_id| {
        let unit = TaskUnit::new(
            TaskContext::new(task_id, trial.interrupts().clone()),
            trial.lock().clone(),
            trial.backoff().clone(),
            failures.clone(),
        );
        submit_unit(trial.pool(), unit, barrier.clone())
    });

    if let Err((submitted, error)) = submission {
        warn!(
            trial = %trial.id(),
            submitted,
            expected = task_count,
            error = %error,
            "Burst under-submitted"
        );
        return Err(HarnessError::SubmissionFailed {
            submitted,
            expected: task_count,
            reason: error.to_string(),
        });
    }

    await_completion(trial, &barrier);
    let elapsed = start.elapsed();

    let outcome = TrialOutcome {
        trial_id: trial.id(),
        run,
        elapsed,
        task_count,
        decrements: barrier.decrements(),
        failed_tasks: failures.count(),
        last_error: failures.last(),
    };

    if outcome.failed_tasks > 0 {
        warn!(
            trial = %trial.id(),
            run,
            failed = outcome.failed_tasks,
            last_error = ?outcome.last_error,
            "Tasks failed during burst"
        );
    }
    debug!(
        trial = %trial.id(),
        run,
        task_count,
        elapsed_us = elapsed.as_micros() as u64,
        "Burst complete"
    );

    Ok(outcome)
}

/// Submit `task_count` units through `submit`, in task order
///
/// On the first rejection the unsubmitted share of `barrier` is released
/// and the already submitted units are awaited before returning the
/// number submitted with the error.
fn submit_burst<S>(
    task_count: usize,
    barrier: &CompletionBarrier,
    mut submit: S,
) -> Result<(), (usize, HarnessError)>
where
    S: FnMut(usize) -> HarnessResult<()>,
{
    for task_id in 0..task_count {
        if let Err(error) = submit(task_id) {
            for _ in task_id..task_count {
                barrier.count_down();
            }
            barrier.wait();
            return Err((task_id, error));
        }
    }
    Ok(())
}

/// Hand one unit to the pool in the form its workers execute
fn submit_unit(
    pool: &WorkerPool,
    unit: TaskUnit,
    signal: Arc<CompletionBarrier>,
) -> HarnessResult<()> {
    match pool {
        WorkerPool::Bounded(pool) => pool.submit(Box::new(move || unit.run(&signal))),
        WorkerPool::PerTask(pool) => pool.spawn(async move { unit.run_suspending(&signal).await }),
    }
}

/// Block on the barrier, logging periodically if a stall interval is set
///
/// The warning is advisory; the wait never gives up.
fn await_completion(trial: &Trial, barrier: &CompletionBarrier) {
    match trial.config().stall_warning {
        None => barrier.wait(),
        Some(interval) => {
            let mut waited = Duration::ZERO;
            while !barrier.wait_timeout(interval) {
                waited += interval;
                warn!(
                    trial = %trial.id(),
                    remaining = barrier.remaining(),
                    waited_ms = waited.as_millis() as u64,
                    "Burst still outstanding"
                );
            }
        }
    }
}
