//! Ledger schema setup.
//!
//! Tracks applied schema versions in `mongrate.schema_version` and runs any
//! missing versions each time a database is opened.

use crate::ddl::SCHEMA_VERSIONS;
use crate::error::{MetaError, MetaResult};
use duckdb::Connection;

/// Ensure the `mongrate` schema and `schema_version` table exist.
fn ensure_version_table(conn: &Connection) -> MetaResult<()> {
    conn.execute_batch(
        "CREATE SCHEMA IF NOT EXISTS mongrate;
         CREATE TABLE IF NOT EXISTS mongrate.schema_version (
             version    INTEGER NOT NULL,
             applied_at TIMESTAMP NOT NULL DEFAULT now()
         );",
    )
    .map_err(|e| {
        MetaError::MigrationError(format!("failed to create schema_version table: {e}"))
    })?;
    Ok(())
}

/// Return the highest applied schema version, or 0 if none.
pub fn current_version(conn: &Connection) -> MetaResult<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM mongrate.schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| MetaError::MigrationError(format!("failed to read schema version: {e}")))
}

/// Whether `mongrate.applied` has been created in this database.
pub fn ledger_exists(conn: &Connection) -> MetaResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = 'mongrate' AND table_name = 'applied'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| MetaError::QueryError(format!("failed to look up ledger table: {e}")))?;
    Ok(count > 0)
}

/// Bring the ledger schema up to the latest version.
pub fn ensure_schema(conn: &Connection) -> MetaResult<()> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;

    for step in SCHEMA_VERSIONS.iter().filter(|s| s.version > current) {
        log::debug!("Applying ledger schema v{:03}", step.version);

        conn.execute_batch(step.sql).map_err(|e| {
            MetaError::MigrationError(format!("schema v{:03} failed: {e}", step.version))
        })?;

        conn.execute(
            "INSERT INTO mongrate.schema_version (version) VALUES (?)",
            duckdb::params![step.version],
        )
        .map_err(|e| {
            MetaError::MigrationError(format!(
                "failed to record schema v{:03}: {e}",
                step.version
            ))
        })?;
    }
    Ok(())
}
