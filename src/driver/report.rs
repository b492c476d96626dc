/*!
 * Sweep Reporter
 *
 * Supports two output formats:
 * - Text (aligned table, one row per combination)
 * - JSON
 */

use super::runner::SweepReport;
use crate::core::DriverResult;
use clap::ValueEnum;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Output format for sweep results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Renders a sweep report
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn render(&self, report: &SweepReport) -> DriverResult<String> {
        match self.format {
            OutputFormat::Text => Ok(render_text(report)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        }
    }

    /// Write to `path`, or stdout when no path is given
    pub fn write(&self, report: &SweepReport, path: Option<&Path>) -> DriverResult<()> {
        let rendered = self.render(report)?;
        match path {
            Some(path) => {
                let mut file = File::create(path)?;
                file.write_all(rendered.as_bytes())?;
                file.write_all(b"\n")?;
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(rendered.as_bytes())?;
                handle.write_all(b"\n")?;
            }
        }
        Ok(())
    }
}

fn render_text(report: &SweepReport) -> String {
    let verify = report
        .combinations
        .iter()
        .any(|c| c.max_occupancy.is_some());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "# parallelism={} warmup={} iterations={} elapsed={:.1}s",
        report.parallelism,
        report.warmup_iterations,
        report.measurement_iterations,
        report.total_elapsed.as_secs_f64()
    );

    let _ = write!(
        out,
        "{:<20} {:<18} {:<11} {:>6} {:>8} {:>4} {:>11} {:>9} {:>7}",
        "model", "lock", "backoff", "load", "tasks", "cnt", "avgt(ms)", "± (ms)", "failed"
    );
    if verify {
        let _ = write!(out, " {:>5}", "occ");
    }
    out.push('\n');

    for c in &report.combinations {
        let _ = write!(
            out,
            "{:<20} {:<18} {:<11} {:>6} {:>8}",
            c.execution_model.as_str(),
            c.lock_strategy.as_str(),
            c.backoff.as_str(),
            c.load_factor,
            c.task_count
        );
        match (&c.summary, &c.error) {
            (_, Some(error)) => {
                let _ = write!(out, "  error: {}", error);
            }
            (Some(summary), None) => {
                let _ = write!(
                    out,
                    " {:>4} {:>11.3} {:>9.3} {:>7}",
                    summary.samples, summary.mean_ms, summary.stddev_ms, c.failed_tasks
                );
                if let Some(max) = c.max_occupancy {
                    let _ = write!(out, " {:>5}", max);
                    if c.exclusion_violated() {
                        out.push_str(" !");
                    }
                }
            }
            (None, None) => out.push_str("  no samples"),
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BackoffKind, ExecutionModelKind, LockStrategyKind};
    use crate::driver::runner::CombinationReport;
    use crate::driver::stats::Summary;
    use std::time::Duration;

    fn report() -> SweepReport {
        SweepReport {
            parallelism: 4,
            warmup_iterations: 1,
            measurement_iterations: 2,
            total_elapsed: Duration::from_millis(1500),
            combinations: vec![
                CombinationReport {
                    execution_model: ExecutionModelKind::BoundedPool,
                    lock_strategy: LockStrategyKind::ReentrantMutex,
                    backoff: BackoffKind::None,
                    load_factor: 2,
                    worker_capacity: 4,
                    task_count: 8,
                    summary: Summary::from_durations(&[
                        Duration::from_millis(1),
                        Duration::from_millis(3),
                    ]),
                    failed_tasks: 0,
                    last_error: None,
                    max_occupancy: Some(1),
                    error: None,
                },
                CombinationReport {
                    execution_model: ExecutionModelKind::PerTaskUnbounded,
                    lock_strategy: LockStrategyKind::NoLock,
                    backoff: BackoffKind::ParkBrief,
                    load_factor: 2,
                    worker_capacity: 4,
                    task_count: 0,
                    summary: None,
                    failed_tasks: 0,
                    last_error: None,
                    max_occupancy: None,
                    error: Some("Failed to provision".into()),
                },
            ],
        }
    }

    #[test]
    fn test_text_has_one_row_per_combination() {
        let text = Reporter::new(OutputFormat::Text).render(&report()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("# parallelism=4"));
        assert!(lines[1].contains("occ"));
        assert!(lines[2].contains("reentrant_mutex") && lines[2].contains("2.000"));
        assert!(lines[3].contains("error: Failed to provision"));
    }

    #[test]
    fn test_json_is_parseable() {
        let json = Reporter::new(OutputFormat::Json).render(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["combinations"].as_array().unwrap().len(), 2);
        assert_eq!(value["combinations"][0]["lock_strategy"], "reentrant_mutex");
        assert_eq!(value["combinations"][0]["summary"]["samples"], 2);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        Reporter::new(OutputFormat::Json)
            .write(&report(), Some(&path))
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with("}\n"));
    }
}
