//! Logger setup for the CLI
//!
//! Level: `--verbose` forces debug, otherwise `RUST_LOG` when set, otherwise
//! the config's `log_level`. Records go to `log_file` when configured and to
//! stderr otherwise.

use anyhow::{Context, Result};
use log::LevelFilter;
use mg_core::Config;
use std::fs::OpenOptions;
use std::io::Write;

use crate::cli::GlobalArgs;
use crate::commands::common::project_root;

/// Install the global logger
pub(crate) fn init(global: &GlobalArgs, config: Option<&Config>) -> Result<()> {
    let mut builder = env_logger::Builder::new();

    if global.verbose {
        builder.filter_level(LevelFilter::Debug);
    } else if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else {
        let level = config
            .map(|c| c.log_level.to_level_filter())
            .unwrap_or(LevelFilter::Info);
        builder.filter_level(level);
    }

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} - mongrate - {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });

    if let Some(log_file) = config.and_then(|c| c.log_file.as_deref()) {
        let path = project_root(global).join(log_file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("Logger already initialised")?;
    Ok(())
}
