//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Mongrate - ordered, reversible migrations with run_before constraints
#[derive(Parser, Debug)]
#[command(name = "mongrate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(
        short = 'p',
        long,
        global = true,
        default_value = ".",
        env = "MONGRATE_PROJECT_DIR"
    )]
    pub project_dir: PathBuf,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Report what would run without calling up/down or recording anything
    #[arg(long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show applied, pending, modified and missing migrations
    Status(StatusArgs),

    /// Apply pending migrations in order
    Migrate(MigrateArgs),

    /// Revert applied migrations, most recent first
    Rollback(RollbackArgs),

    /// Describe one migration, or all of them
    Info(InfoArgs),

    /// List migrations in apply order
    Ls(LsArgs),

    /// Create a new migration file
    New(NewArgs),
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Stop after this migration (runs it and everything that must precede it)
    #[arg(short, long)]
    pub target: Option<String>,
}

/// Arguments for the rollback command
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Number of migrations to revert (default: all applied)
    #[arg(short, long)]
    pub steps: Option<usize>,
}

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Migration id (default: every migration)
    pub id: Option<String>,
}

/// Arguments for the ls command
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the new command
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Id of the new migration
    pub id: String,

    /// Directory to create it in (default: first of migration_paths)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

/// Output formats for listing commands
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
