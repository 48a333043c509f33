//! Migrations declared as YAML files with SQL bodies
//!
//! Each `.yml`/`.yaml` file under a migration path declares exactly one
//! migration:
//!
//! ```yaml
//! id: CS-12345
//! run_before: [CS-12332]
//! description: Add the orders table
//! on_load:
//!   orders_table: orders
//! up: |
//!   CREATE TABLE orders (id INTEGER);
//! down: |
//!   DROP TABLE orders;
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::checksum::migration_checksum;
use crate::error::{CoreError, CoreResult, HookError};
use crate::migration::{Migration, MigrationOutcome};
use crate::migration_id::MigrationId;
use crate::session::SessionState;

/// Something that can run a batch of SQL statements
pub trait SqlExecutor {
    /// Execute one or more `;`-separated statements
    fn execute_batch(&self, sql: &str) -> Result<(), HookError>;
}

/// Raw file contents
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MigrationFile {
    id: MigrationId,
    #[serde(default)]
    run_before: Vec<MigrationId>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    on_load: HashMap<String, serde_yaml::Value>,
    up: String,
    #[serde(default)]
    down: Option<String>,
}

/// A migration loaded from a YAML file, executed through a [`SqlExecutor`]
pub struct SqlMigration {
    id: MigrationId,
    run_before: Vec<MigrationId>,
    description: Option<String>,
    on_load: HashMap<String, serde_yaml::Value>,
    up: String,
    down: Option<String>,
    path: PathBuf,
    executor: Rc<dyn SqlExecutor>,
}

impl SqlMigration {
    /// Load a migration file
    pub fn load(path: &Path, executor: Rc<dyn SqlExecutor>) -> CoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path, executor)
    }

    /// Parse migration file contents; `path` is used for error messages
    pub fn parse(content: &str, path: &Path, executor: Rc<dyn SqlExecutor>) -> CoreResult<Self> {
        let parse_error = |details: String| CoreError::MigrationParseError {
            path: path.display().to_string(),
            details,
        };

        let file: MigrationFile =
            serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;

        if file.up.trim().is_empty() {
            return Err(parse_error(format!("migration '{}' has an empty up body", file.id)));
        }

        let down = file.down.filter(|sql| !sql.trim().is_empty());

        Ok(Self {
            id: file.id,
            run_before: file.run_before,
            description: file.description,
            on_load: file.on_load,
            up: file.up,
            down,
            path: path.to_path_buf(),
            executor,
        })
    }

    /// File this migration was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a `down` body is defined
    pub fn is_reversible(&self) -> bool {
        self.down.is_some()
    }

    fn run(&self, direction: &str, sql: &str) -> Result<MigrationOutcome, HookError> {
        log::debug!("{} {} from {}", direction, self.id, self.path.display());
        self.executor.execute_batch(sql)?;
        let statements = count_statements(sql);
        Ok(MigrationOutcome::message(format!(
            "{} {}: {} statement(s)",
            direction, self.id, statements
        ))
        .with_affected(statements))
    }
}

/// Rough statement count for reporting; ignores blank segments
fn count_statements(sql: &str) -> usize {
    sql.split(';').filter(|s| !s.trim().is_empty()).count()
}

impl std::fmt::Debug for SqlMigration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlMigration")
            .field("id", &self.id)
            .field("run_before", &self.run_before)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Migration for SqlMigration {
    fn id(&self) -> &MigrationId {
        &self.id
    }

    fn run_before(&self) -> &[MigrationId] {
        &self.run_before
    }

    /// Merge declared `on_load` values into the session without overwriting
    fn on_load(&self, state: &mut SessionState) -> Result<(), HookError> {
        let mut keys: Vec<&String> = self.on_load.keys().collect();
        keys.sort();
        for key in keys {
            let value = serde_json::to_value(&self.on_load[key])
                .map_err(|e| HookError::failed(format!("on_load value '{key}': {e}")))?;
            if !state.insert_if_absent(key.clone(), value) {
                log::debug!("{}: session key '{}' already set, keeping it", self.id, key);
            }
        }
        Ok(())
    }

    fn up(&self) -> Result<MigrationOutcome, HookError> {
        self.run("up", &self.up)
    }

    fn down(&self) -> Result<MigrationOutcome, HookError> {
        match &self.down {
            Some(sql) => self.run("down", sql),
            None => Err(HookError::Irreversible {
                id: self.id.to_string(),
            }),
        }
    }

    fn info(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }

    fn checksum(&self) -> Option<String> {
        Some(migration_checksum(&self.up, self.down.as_deref()))
    }
}

fn is_migration_file(path: &Path) -> bool {
    path.is_file()
        && matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        )
}

/// Load every migration file directly under the given directories.
///
/// Files are loaded in path order; missing directories are skipped.
pub fn discover_migrations(
    dirs: &[PathBuf],
    executor: Rc<dyn SqlExecutor>,
) -> CoreResult<Vec<SqlMigration>> {
    let mut migrations = Vec::new();

    for dir in dirs {
        if !dir.is_dir() {
            log::debug!("Migration path {} does not exist, skipping", dir.display());
            continue;
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| CoreError::IoWithPath {
                path: dir.display().to_string(),
                source: e,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_migration_file(p))
            .collect();
        files.sort();

        for file in files {
            migrations.push(SqlMigration::load(&file, executor.clone())?);
        }
    }

    log::debug!("Discovered {} migration files", migrations.len());
    Ok(migrations)
}

#[cfg(test)]
#[path = "sql_migration_test.rs"]
mod tests;
