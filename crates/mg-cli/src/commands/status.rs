//! Status command implementation

use anyhow::Result;
use mg_core::{MigrationStatus, StatusRow};

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::load_project;

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let runner = project.runner(global)?;
    let rows = runner.status()?;

    match args.output {
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }

    let drifted = rows
        .iter()
        .filter(|r| matches!(r.status, MigrationStatus::Modified | MigrationStatus::Missing))
        .count();
    if drifted > 0 {
        log::warn!(
            "{} applied migration(s) are modified or no longer on disk",
            drifted
        );
    }

    Ok(())
}

fn print_table(rows: &[StatusRow]) {
    if rows.is_empty() {
        println!("No migrations found");
        return;
    }

    let id_width = rows.iter().map(|r| r.id.len()).max().unwrap_or(2).max(2);
    let status_width = 8;
    let applied_width = 19;

    println!(
        "{:<id_width$}  {:<status_width$}  {:<applied_width$}  INFO",
        "ID", "STATUS", "APPLIED_AT",
    );
    println!(
        "{:-<id_width$}  {:-<status_width$}  {:-<applied_width$}  {}",
        "",
        "",
        "",
        "-".repeat(30),
    );

    for row in rows {
        let applied_at = row
            .applied_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<id_width$}  {:<status_width$}  {:<applied_width$}  {}",
            row.id.as_str(),
            row.status.to_string(),
            applied_at,
            row.info.as_deref().unwrap_or("-"),
        );
    }

    let pending = rows
        .iter()
        .filter(|r| r.status == MigrationStatus::Pending)
        .count();
    println!();
    println!("{} migration(s), {} pending", rows.len(), pending);
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
