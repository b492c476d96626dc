/*!
 * Measurement Driver
 *
 * Everything outside the harness core that makes it runnable: sweep
 * configuration, repetition, summary statistics and reporting. Talks to
 * the harness only through `setup_trial`, `run_trial` and `teardown_trial`.
 */

pub mod cli;
pub mod config;
pub mod report;
pub mod runner;
pub mod stats;

pub use cli::CliArgs;
pub use config::{MeasurementPlan, SweepConfig};
pub use report::{OutputFormat, Reporter};
pub use runner::{measure_combination, run_sweep, CombinationReport, SweepReport};
pub use stats::Summary;
