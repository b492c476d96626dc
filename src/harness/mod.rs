/*!
 * Burst Harness
 *
 * Trial lifecycle and burst execution:
 * - `setup_trial` acquires a trial's pool and lock primitive
 * - `run_trial` submits one burst and waits for it
 * - `teardown_trial` drains and releases everything
 *
 * Timing and repetition belong to the caller.
 */

mod coordinator;
mod gauge;
mod task;
mod trial;

pub use coordinator::{run_trial, TrialOutcome};
pub use gauge::OccupancyGauge;
pub use task::{FailureLedger, TaskUnit};
pub use trial::{ambient_parallelism, parallelism_from, Trial, TrialConfig};

use crate::core::HarnessResult;
use crate::execution::PoolStats;

/// Acquire the resources for one trial
pub fn setup_trial(config: TrialConfig) -> HarnessResult<Trial> {
    Trial::setup(config)
}

/// Release a trial's resources once its in-flight work has drained
pub fn teardown_trial(trial: Trial) -> PoolStats {
    trial.teardown()
}
