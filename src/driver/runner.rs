/*!
 * Sweep Runner
 *
 * Drives the harness over every combination of a sweep: setup, warmup,
 * measured runs, teardown. A combination that fails to set up is recorded
 * and the sweep moves on.
 */

use super::config::{MeasurementPlan, SweepConfig};
use super::stats::Summary;
use crate::core::sync::Backoff;
use crate::core::{
    BackoffKind, DriverResult, ExecutionModelKind, HarnessResult, LockStrategyKind, TaskError,
};
use crate::harness::{run_trial, setup_trial, teardown_trial, OccupancyGauge, Trial, TrialConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span};

/// Measurements for one point of the matrix
#[derive(Debug, Clone, Serialize)]
pub struct CombinationReport {
    pub execution_model: ExecutionModelKind,
    pub lock_strategy: LockStrategyKind,
    pub backoff: BackoffKind,
    pub load_factor: usize,
    pub worker_capacity: usize,
    pub task_count: usize,
    pub summary: Option<Summary>,
    /// Task failures across warmup and measured runs
    pub failed_tasks: usize,
    pub last_error: Option<TaskError>,
    /// Highest critical-section occupancy, when verification is on
    pub max_occupancy: Option<usize>,
    /// Setup or run failure that prevented measurement
    pub error: Option<String>,
}

impl CombinationReport {
    fn empty(config: &TrialConfig) -> Self {
        Self {
            execution_model: config.execution_model,
            lock_strategy: config.lock_strategy,
            backoff: config.backoff,
            load_factor: config.load_factor,
            worker_capacity: config.resolve_worker_capacity(),
            task_count: 0,
            summary: None,
            failed_tasks: 0,
            last_error: None,
            max_occupancy: None,
            error: None,
        }
    }

    /// Occupancy above one under an exclusive lock means exclusion broke
    pub fn exclusion_violated(&self) -> bool {
        self.lock_strategy.is_exclusive() && self.max_occupancy.is_some_and(|max| max > 1)
    }
}

/// Results of a whole sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub parallelism: usize,
    pub warmup_iterations: u32,
    pub measurement_iterations: u32,
    pub total_elapsed: Duration,
    pub combinations: Vec<CombinationReport>,
}

impl SweepReport {
    pub fn failed_combinations(&self) -> usize {
        self.combinations.iter().filter(|c| c.error.is_some()).count()
    }
}

/// Run every combination of `config`
pub fn run_sweep(config: &SweepConfig) -> DriverResult<SweepReport> {
    config.validate()?;
    let start = Instant::now();
    let trials = config.combinations();

    info!(
        combinations = trials.len(),
        warmup = config.plan.warmup_iterations,
        iterations = config.plan.measurement_iterations,
        verify = config.verify,
        "Starting sweep"
    );

    let parallelism = trials
        .first()
        .map(TrialConfig::resolve_worker_capacity)
        .unwrap_or(1);
    let combinations = trials
        .into_iter()
        .map(|trial| measure_combination(trial, &config.plan, config.verify))
        .collect::<Vec<_>>();

    let report = SweepReport {
        parallelism,
        warmup_iterations: config.plan.warmup_iterations,
        measurement_iterations: config.plan.measurement_iterations,
        total_elapsed: start.elapsed(),
        combinations,
    };

    info!(
        failed = report.failed_combinations(),
        elapsed_ms = report.total_elapsed.as_millis() as u64,
        "Sweep finished"
    );
    Ok(report)
}

/// Measure one combination; errors are folded into the report
pub fn measure_combination(
    config: TrialConfig,
    plan: &MeasurementPlan,
    verify: bool,
) -> CombinationReport {
    let span = info_span!("combination", label = %config.label(), load_factor = config.load_factor);
    let _entered = span.enter();

    let mut report = CombinationReport::empty(&config);

    let gauge = verify.then(|| Arc::new(OccupancyGauge::new(config.backoff)));
    let trial = match &gauge {
        Some(gauge) => {
            let backoff: Arc<dyn Backoff> = gauge.clone();
            Trial::setup_with_backoff(config, backoff)
        }
        None => setup_trial(config),
    };

    let trial = match trial {
        Ok(trial) => trial,
        Err(e) => {
            error!(error = %e, "Trial setup failed");
            report.error = Some(e.to_string());
            return report;
        }
    };

    report.worker_capacity = trial.worker_capacity();
    report.task_count = trial.task_count();

    let measured = run_iterations(&trial, plan, &mut report);
    teardown_trial(trial);

    match measured {
        Ok(samples) => report.summary = Summary::from_durations(&samples),
        Err(e) => {
            error!(error = %e, "Trial run failed");
            report.error = Some(e.to_string());
        }
    }
    report.max_occupancy = gauge.map(|p| p.max_occupancy());

    if let Some(summary) = &report.summary {
        info!(
            mean_ms = summary.mean_ms,
            stddev_ms = summary.stddev_ms,
            failed_tasks = report.failed_tasks,
            "Combination measured"
        );
    }
    report
}

fn run_iterations(
    trial: &Trial,
    plan: &MeasurementPlan,
    report: &mut CombinationReport,
) -> HarnessResult<Vec<Duration>> {
    for _ in 0..plan.warmup_iterations {
        let outcome = run_trial(trial)?;
        report.failed_tasks += outcome.failed_tasks;
        if outcome.last_error.is_some() {
            report.last_error = outcome.last_error;
        }
    }

    let mut samples = Vec::with_capacity(plan.measurement_iterations as usize);
    for _ in 0..plan.measurement_iterations {
        let outcome = run_trial(trial)?;
        report.failed_tasks += outcome.failed_tasks;
        if outcome.last_error.is_some() {
            report.last_error = outcome.last_error;
        }
        samples.push(outcome.elapsed);
    }
    Ok(samples)
}
