//! Mongrate CLI - ordered, reversible SQL migrations for DuckDB

use clap::Parser;

mod cli;
mod commands;
mod logging;

use cli::Cli;
use commands::common::{load_config, ExitCode};
use commands::{info, ls, migrate, new, rollback, status};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Commands report config errors themselves; logging falls back to defaults
    let config = load_config(&cli.global).ok();
    if let Err(err) = logging::init(&cli.global, config.as_ref()) {
        eprintln!("Warning: failed to set up logging: {err:#}");
    }

    let result = match &cli.command {
        cli::Commands::Status(args) => status::execute(args, &cli.global),
        cli::Commands::Migrate(args) => migrate::execute(args, &cli.global),
        cli::Commands::Rollback(args) => rollback::execute(args, &cli.global),
        cli::Commands::Info(args) => info::execute(args, &cli.global),
        cli::Commands::Ls(args) => ls::execute(args, &cli.global),
        cli::Commands::New(args) => new::execute(args, &cli.global),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(code) => std::process::ExitCode::from(code.0.clamp(1, 255) as u8),
            None => {
                eprintln!("Error: {err:#}");
                std::process::ExitCode::FAILURE
            }
        },
    }
}
