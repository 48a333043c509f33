//! Rollback command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, RollbackArgs};
use crate::commands::common::{load_project, ExitCode};

/// Execute the rollback command
pub(crate) fn execute(args: &RollbackArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let mut runner = project.runner(global)?;

    let report = runner.rollback(args.steps)?;

    if report.reverted.is_empty() && report.failures.is_empty() {
        println!("Nothing to roll back");
        return Ok(());
    }

    for step in &report.reverted {
        match step.outcome {
            None => println!("  Would roll back: {}", step.id),
            Some(_) => println!("  Rolled back: {} ({}ms)", step.id, step.duration_ms),
        }
    }
    for failure in &report.failures {
        eprintln!("  Failed: {}: {}", failure.id, failure.error);
    }

    println!();
    if report.dry_run {
        println!(
            "Dry run: {} migration(s) would be rolled back",
            report.reverted.len()
        );
    } else {
        println!(
            "Rolled back {} migration(s), {} failed",
            report.reverted.len(),
            report.failures.len()
        );
    }

    if !report.is_success() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

#[cfg(test)]
#[path = "rollback_test.rs"]
mod tests;
