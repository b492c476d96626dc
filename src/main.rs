/*!
 * sync-burst - Main Entry Point
 *
 * Runs a sweep of burst trials and prints the per-combination timings.
 */

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::{info, warn};

use sync_burst::driver::{run_sweep, CliArgs, Reporter};
use sync_burst::init_tracing;

fn main() -> miette::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let sweep = args.sweep()?;

    info!(
        combinations = sweep.combination_count(),
        "sync-burst starting"
    );

    let report = run_sweep(&sweep)?;
    Reporter::new(args.format).write(&report, args.output.as_deref())?;

    let violations = report
        .combinations
        .iter()
        .filter(|c| c.exclusion_violated())
        .count();
    if violations > 0 {
        warn!(violations, "Exclusive lock strategies admitted concurrent occupants");
        return Err(miette::miette!(
            "{} combination(s) violated mutual exclusion",
            violations
        ));
    }

    if report.failed_combinations() > 0 {
        warn!(
            failed = report.failed_combinations(),
            "Some combinations could not be measured"
        );
    }

    std::io::Write::flush(&mut std::io::stdout()).into_diagnostic()?;
    Ok(())
}
