//! DuckDB connection wrapper.
//!
//! [`MetaDb`] owns a DuckDB [`Connection`] to the database migrations run
//! against. Opening it creates the `mongrate` ledger schema, and it executes
//! migration SQL for [`mg_core::SqlMigration`] through [`SqlExecutor`].

use crate::error::{MetaError, MetaResult};
use crate::schema::{ensure_schema, ledger_exists};
use duckdb::{AccessMode, Config, Connection};
use mg_core::{HookError, SqlExecutor};
use std::cell::Cell;
use std::path::Path;

/// Wrapper around the target DuckDB database.
///
/// Single-threaded, no `Mutex` needed because migrations run sequentially.
pub struct MetaDb {
    conn: Connection,
    /// Set while a step transaction opened by [`MetaDb::begin`] is active
    in_step: Cell<bool>,
}

impl MetaDb {
    /// Open (or create) the database at `path` and set up the ledger schema.
    pub fn open(path: &Path) -> MetaResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MetaError::ConnectionError(format!("{e}: {}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| MetaError::ConnectionError(format!("{e}: {}", path.display())))?;
        ensure_schema(&conn)?;
        log::debug!("Opened database {}", path.display());
        Ok(Self::wrap(conn))
    }

    /// Open an existing database without writing to it.
    ///
    /// Returns `None` when the file does not exist or holds no ledger yet,
    /// meaning nothing has been applied to it.
    pub fn open_read_only(path: &Path) -> MetaResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let config = Config::default()
            .access_mode(AccessMode::ReadOnly)
            .map_err(|e| MetaError::ConnectionError(e.to_string()))?;
        let conn = Connection::open_with_flags(path, config)
            .map_err(|e| MetaError::ConnectionError(format!("{e}: {}", path.display())))?;
        if !ledger_exists(&conn)? {
            return Ok(None);
        }
        log::debug!("Opened database {} read-only", path.display());
        Ok(Some(Self::wrap(conn)))
    }

    /// Create an in-memory database with the ledger schema.
    pub fn open_memory() -> MetaResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| MetaError::ConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn,
            in_step: Cell::new(false),
        }
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open a transaction spanning one migration step.
    ///
    /// Until [`MetaDb::commit`] or [`MetaDb::rollback`], [`MetaDb::transaction`]
    /// runs inside it instead of opening its own.
    pub fn begin(&self) -> MetaResult<()> {
        if self.in_step.get() {
            return Err(MetaError::TransactionError(
                "a step transaction is already open".to_string(),
            ));
        }
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| MetaError::TransactionError(format!("BEGIN failed: {e}")))?;
        self.in_step.set(true);
        Ok(())
    }

    /// Commit the step transaction.
    pub fn commit(&self) -> MetaResult<()> {
        if !self.in_step.replace(false) {
            return Err(MetaError::TransactionError(
                "no step transaction to commit".to_string(),
            ));
        }
        if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
            let _ = self.conn.execute_batch("ROLLBACK");
            return Err(MetaError::TransactionError(format!(
                "COMMIT failed: {commit_err}"
            )));
        }
        Ok(())
    }

    /// Roll back the step transaction, if one is open.
    pub fn rollback(&self) {
        if self.in_step.replace(false) {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("ROLLBACK failed: {e}");
            }
        }
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
    /// error. Inside a step transaction `body` joins it instead.
    pub fn transaction<F, T>(&self, body: F) -> MetaResult<T>
    where
        F: FnOnce(&Connection) -> MetaResult<T>,
    {
        if self.in_step.get() {
            return body(&self.conn);
        }
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| MetaError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = body(&self.conn);

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(MetaError::TransactionError(format!(
                        "COMMIT failed: {commit_err}"
                    )));
                }
            }
            Err(_) => {
                let _ = self.conn.execute_batch("ROLLBACK");
            }
        }
        result
    }
}

impl SqlExecutor for MetaDb {
    /// Each migration body runs in its own transaction, or in the open step
    /// transaction, so a failing statement leaves none of the body applied.
    fn execute_batch(&self, sql: &str) -> Result<(), HookError> {
        self.transaction(|conn| {
            conn.execute_batch(sql)
                .map_err(|e| MetaError::QueryError(e.to_string()))
        })
        .map_err(HookError::from)
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
