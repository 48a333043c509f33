//! Configuration types and parsing for mongrate.yml

use crate::error::{CoreError, CoreResult};
use crate::runner::RollbackPolicy;
use crate::session::RESERVED_STATE_KEYS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Config file names searched for in a project directory, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["mongrate.yml", "mongrate.yaml"];

/// Main project configuration from mongrate.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Directories containing migration files
    #[serde(default = "default_migration_paths")]
    pub migration_paths: Vec<String>,

    /// Output directory for ledger files
    #[serde(default = "default_target_path")]
    pub target_path: String,

    /// Database the SQL migrations run against
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Where applied migrations are recorded
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// What to do when a rollback step fails
    #[serde(default)]
    pub rollback_policy: RollbackPolicy,

    /// Log level for the CLI
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<String>,

    /// Initial session state handed to every `on_load`
    #[serde(default)]
    pub state: HashMap<String, serde_yaml::Value>,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB database path, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Ledger backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// Table inside the target DuckDB database (default)
    #[default]
    DuckDb,
    /// JSON file under the target directory
    Json,
}

/// Ledger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: LedgerBackend,

    /// JSON ledger path, relative to the project root.
    ///
    /// Only used by the `json` backend; defaults to
    /// `<target_path>/mongrate_status.json`.
    #[serde(default)]
    pub path: Option<String>,
}

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` crate filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_migration_paths() -> Vec<String> {
    vec!["migrations".to_string()]
}

const DEFAULT_TARGET_DIR: &str = "target";

const DEFAULT_LEDGER_FILE: &str = "mongrate_status.json";

const DEFAULT_DB_PATH: &str = ":memory:";

fn default_target_path() -> String {
    DEFAULT_TARGET_DIR.to_string()
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
            .map(|path| Self::load(&path))
            .unwrap_or_else(|| {
                Err(CoreError::ConfigNotFound {
                    path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
                })
            })
    }

    /// Validate values serde cannot check on its own
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "name must not be empty".to_string(),
            });
        }
        if self.migration_paths.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migration_paths must list at least one directory".to_string(),
            });
        }
        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path must not be empty (use ':memory:' for in-memory)"
                    .to_string(),
            });
        }
        if let Some(key) = RESERVED_STATE_KEYS.iter().find(|k| self.state.contains_key(**k)) {
            return Err(CoreError::ConfigInvalid {
                message: format!("state key '{key}' is reserved for the runner"),
            });
        }
        if self.ledger.backend == LedgerBackend::DuckDb && self.ledger.path.is_some() {
            return Err(CoreError::ConfigInvalid {
                message: "ledger.path is only valid with the json backend".to_string(),
            });
        }
        Ok(())
    }

    /// Migration directories resolved against the project root
    pub fn migration_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.migration_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Target directory resolved against the project root
    pub fn target_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.target_path)
    }

    /// JSON ledger location resolved against the project root
    pub fn ledger_path_absolute(&self, root: &Path) -> PathBuf {
        match &self.ledger.path {
            Some(path) => root.join(path),
            None => self.target_path_absolute(root).join(DEFAULT_LEDGER_FILE),
        }
    }

    /// Database location resolved against the project root; `None` for in-memory
    pub fn database_path_absolute(&self, root: &Path) -> Option<PathBuf> {
        if self.database.path == DEFAULT_DB_PATH {
            None
        } else {
            Some(root.join(&self.database.path))
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
