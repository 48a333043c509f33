//! Migrate command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::load_project;

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let mut runner = project.runner(global)?;

    let report = runner.apply(args.target.as_deref())?;

    if report.applied.is_empty() {
        println!(
            "Nothing to apply ({} already applied)",
            report.already_applied.len()
        );
        return Ok(());
    }

    for step in &report.applied {
        match &step.outcome {
            None => println!("  Would apply: {}", step.id),
            Some(outcome) => match outcome.affected {
                Some(n) => println!(
                    "  Applied: {} ({} statement{}, {}ms)",
                    step.id,
                    n,
                    if n == 1 { "" } else { "s" },
                    step.duration_ms
                ),
                None => println!("  Applied: {} ({}ms)", step.id, step.duration_ms),
            },
        }
    }

    println!();
    if report.dry_run {
        println!("Dry run: {} migration(s) would be applied", report.applied.len());
    } else {
        println!(
            "Applied {} migration(s), {} already applied (run {})",
            report.applied.len(),
            report.already_applied.len(),
            report.run_id
        );
    }

    Ok(())
}

#[cfg(test)]
#[path = "migrate_test.rs"]
mod tests;
