/*!
 * Sweep Configuration
 *
 * Parameter matrix and repetition plan for the measurement driver.
 * Loadable from JSON; every field is optional and falls back to the
 * full matrix at the default load factor.
 */

use crate::core::limits::{
    DEFAULT_LOAD_FACTOR, DEFAULT_MEASUREMENT_ITERATIONS, DEFAULT_WARMUP_ITERATIONS,
};
use crate::core::{
    BackoffKind, DriverError, DriverResult, ExecutionModelKind, LockStrategyKind,
};
use crate::harness::TrialConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How many times each combination is run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MeasurementPlan {
    /// Runs executed and discarded before measuring
    pub warmup_iterations: u32,
    /// Runs whose elapsed time is recorded
    pub measurement_iterations: u32,
    /// Advisory interval for "burst still outstanding" warnings
    pub stall_warning_ms: Option<u64>,
}

impl Default for MeasurementPlan {
    fn default() -> Self {
        Self {
            warmup_iterations: DEFAULT_WARMUP_ITERATIONS,
            measurement_iterations: DEFAULT_MEASUREMENT_ITERATIONS,
            stall_warning_ms: None,
        }
    }
}

impl MeasurementPlan {
    /// Single measured run, no warmup
    pub const fn quick() -> Self {
        Self {
            warmup_iterations: 0,
            measurement_iterations: 1,
            stall_warning_ms: None,
        }
    }
}

/// Parameter matrix swept by the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SweepConfig {
    pub execution_models: Vec<ExecutionModelKind>,
    pub lock_strategies: Vec<LockStrategyKind>,
    pub backoffs: Vec<BackoffKind>,
    pub load_factors: Vec<usize>,
    /// Explicit capacity for every trial; ambient parallelism otherwise
    pub worker_capacity: Option<usize>,
    pub lock_timeout_ms: Option<u64>,
    /// Wrap the backoff in an occupancy gauge and report max occupancy
    pub verify: bool,
    pub plan: MeasurementPlan,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            execution_models: ExecutionModelKind::ALL.to_vec(),
            lock_strategies: LockStrategyKind::ALL.to_vec(),
            backoffs: BackoffKind::ALL.to_vec(),
            load_factors: vec![DEFAULT_LOAD_FACTOR],
            worker_capacity: None,
            lock_timeout_ms: None,
            verify: false,
            plan: MeasurementPlan::default(),
        }
    }
}

impl SweepConfig {
    /// Load a sweep from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> DriverResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| DriverError::ConfigLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&contents).map_err(|e| DriverError::ConfigLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> DriverResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DriverResult<()> {
        if self.execution_models.is_empty() {
            return Err(DriverError::InvalidSweep("no execution models".into()));
        }
        if self.lock_strategies.is_empty() {
            return Err(DriverError::InvalidSweep("no lock strategies".into()));
        }
        if self.backoffs.is_empty() {
            return Err(DriverError::InvalidSweep("no backoffs".into()));
        }
        if self.load_factors.is_empty() || self.load_factors.contains(&0) {
            return Err(DriverError::InvalidSweep(
                "load factors must be non-empty and positive".into(),
            ));
        }
        if self.worker_capacity == Some(0) {
            return Err(DriverError::InvalidSweep("worker capacity must be positive".into()));
        }
        if self.plan.measurement_iterations == 0 {
            return Err(DriverError::InvalidSweep(
                "at least one measurement iteration is required".into(),
            ));
        }
        Ok(())
    }

    /// Number of trials the sweep expands to
    pub fn combination_count(&self) -> usize {
        self.execution_models.len()
            * self.lock_strategies.len()
            * self.backoffs.len()
            * self.load_factors.len()
    }

    /// Expand the matrix into trial configurations
    ///
    /// Order: execution model, lock strategy, backoff, load factor.
    pub fn combinations(&self) -> Vec<TrialConfig> {
        let mut trials = Vec::with_capacity(self.combination_count());
        for &model in &self.execution_models {
            for &lock in &self.lock_strategies {
                for &backoff in &self.backoffs {
                    for &load_factor in &self.load_factors {
                        let mut config =
                            TrialConfig::new(model, lock, backoff).with_load_factor(load_factor);
                        config.worker_capacity = self.worker_capacity;
                        config.lock_timeout = self.lock_timeout_ms.map(Duration::from_millis);
                        config.stall_warning =
                            self.plan.stall_warning_ms.map(Duration::from_millis);
                        trials.push(config);
                    }
                }
            }
        }
        trials
    }
}
