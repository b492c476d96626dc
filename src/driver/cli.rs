/*!
 * Command-line Arguments
 *
 * Flags overlay the sweep file (or the default sweep): an axis given on
 * the command line replaces that axis entirely.
 */

use super::config::SweepConfig;
use super::report::OutputFormat;
use crate::core::{BackoffKind, DriverResult, ExecutionModelKind, LockStrategyKind};
use clap::Parser;
use std::path::PathBuf;

/// Measure synchronization overhead across execution models, locks and backoffs
#[derive(Parser, Debug, Clone)]
#[command(name = "sync-burst")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// JSON sweep file; flags below override its fields
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    // ===== Matrix =====
    /// Execution models (bounded_pool, per_task_unbounded)
    #[arg(long = "model", value_delimiter = ',')]
    pub models: Vec<ExecutionModelKind>,

    /// Lock strategies (exclusive_monitor, reentrant_mutex, no_lock)
    #[arg(long = "lock", value_delimiter = ',')]
    pub locks: Vec<LockStrategyKind>,

    /// Backoffs (none, sleep_brief, park_brief)
    #[arg(long = "backoff", value_delimiter = ',')]
    pub backoffs: Vec<BackoffKind>,

    /// Tasks per unit of worker capacity
    #[arg(long = "load-factor", value_delimiter = ',')]
    pub load_factors: Vec<usize>,

    /// Worker capacity (defaults to SYNC_BURST_PARALLELISM or available cores)
    #[arg(long = "parallelism")]
    pub parallelism: Option<usize>,

    /// Fail a task whose lock wait exceeds this many milliseconds
    #[arg(long = "lock-timeout-ms")]
    pub lock_timeout_ms: Option<u64>,

    // ===== Repetition =====
    /// Warmup runs per combination
    #[arg(long = "warmup")]
    pub warmup: Option<u32>,

    /// Measured runs per combination
    #[arg(short = 'i', long = "iterations")]
    pub iterations: Option<u32>,

    /// Log a warning every N ms while a burst is outstanding
    #[arg(long = "stall-warning-ms")]
    pub stall_warning_ms: Option<u64>,

    /// Record max critical-section occupancy per combination
    #[arg(long = "verify")]
    pub verify: bool,

    // ===== Output =====
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the sweep: file (or default) overlaid with flags
    pub fn sweep(&self) -> DriverResult<SweepConfig> {
        let mut sweep = match &self.config {
            Some(path) => SweepConfig::from_file(path)?,
            None => SweepConfig::default(),
        };

        if !self.models.is_empty() {
            sweep.execution_models = self.models.clone();
        }
        if !self.locks.is_empty() {
            sweep.lock_strategies = self.locks.clone();
        }
        if !self.backoffs.is_empty() {
            sweep.backoffs = self.backoffs.clone();
        }
        if !self.load_factors.is_empty() {
            sweep.load_factors = self.load_factors.clone();
        }
        if self.parallelism.is_some() {
            sweep.worker_capacity = self.parallelism;
        }
        if self.lock_timeout_ms.is_some() {
            sweep.lock_timeout_ms = self.lock_timeout_ms;
        }
        if let Some(warmup) = self.warmup {
            sweep.plan.warmup_iterations = warmup;
        }
        if let Some(iterations) = self.iterations {
            sweep.plan.measurement_iterations = iterations;
        }
        if self.stall_warning_ms.is_some() {
            sweep.plan.stall_warning_ms = self.stall_warning_ms;
        }
        sweep.verify |= self.verify;

        sweep.validate()?;
        Ok(sweep)
    }
}
