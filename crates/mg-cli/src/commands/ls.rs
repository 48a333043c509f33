//! List command implementation

use anyhow::Result;
use mg_core::{MigrationId, MigrationStatus};
use serde::Serialize;

use crate::cli::{GlobalArgs, LsArgs, OutputFormat};
use crate::commands::common::{load_project, ProjectRunner};

/// Execute the ls command
pub(crate) fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let runner = project.runner(global)?;
    let entries = collect_entries(&runner)?;

    match args.output {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }

    Ok(())
}

/// One migration in apply order
#[derive(Debug, Serialize)]
pub(crate) struct LsEntry {
    pub(crate) position: usize,
    pub(crate) id: MigrationId,
    pub(crate) status: MigrationStatus,
    pub(crate) run_before: Vec<MigrationId>,
}

pub(crate) fn collect_entries(runner: &ProjectRunner) -> Result<Vec<LsEntry>> {
    let rows = runner.status()?;
    let entries = rows
        .into_iter()
        .filter(|row| row.status != MigrationStatus::Missing)
        .enumerate()
        .map(|(i, row)| LsEntry {
            position: i + 1,
            run_before: runner
                .registry()
                .get(&row.id)
                .map(|m| m.run_before().to_vec())
                .unwrap_or_default(),
            id: row.id,
            status: row.status,
        })
        .collect();
    Ok(entries)
}

fn print_table(entries: &[LsEntry]) {
    let id_width = entries.iter().map(|e| e.id.len()).max().unwrap_or(2).max(2);
    let status_width = 8;

    println!(
        "{:>3}  {:<id_width$}  {:<status_width$}  RUN_BEFORE",
        "#", "ID", "STATUS",
    );
    println!(
        "{:->3}  {:-<id_width$}  {:-<status_width$}  {}",
        "",
        "",
        "",
        "-".repeat(30),
    );

    for entry in entries {
        let run_before: Vec<&str> = entry.run_before.iter().map(|id| id.as_str()).collect();
        println!(
            "{:>3}  {:<id_width$}  {:<status_width$}  {}",
            entry.position,
            entry.id.as_str(),
            entry.status.to_string(),
            if run_before.is_empty() {
                "-".to_string()
            } else {
                run_before.join(", ")
            },
        );
    }

    println!();
    println!("{} migration(s)", entries.len());
}

#[cfg(test)]
#[path = "ls_test.rs"]
mod tests;
