//! Applied-migration ledger stored in `mongrate.applied`.

use crate::connection::MetaDb;
use crate::error::{MetaError, MetaResult};
use chrono::{DateTime, Utc};
use mg_core::{AppliedMigration, AppliedStore, CoreError, CoreResult, MigrationId};
use std::rc::Rc;

/// [`AppliedStore`] backed by the target DuckDB database.
///
/// Shares the connection with the migrations themselves, so the ledger lives
/// next to the schema it describes.
pub struct MetaStore {
    db: Rc<MetaDb>,
}

impl MetaStore {
    /// Wrap an open database
    pub fn new(db: Rc<MetaDb>) -> Self {
        Self { db }
    }

    fn load_all(&self) -> MetaResult<Vec<AppliedMigration>> {
        let mut stmt = self
            .db
            .conn()
            .prepare(
                "SELECT migration_id, sequence, applied_at, duration_ms, checksum, run_id
                 FROM mongrate.applied
                 ORDER BY sequence",
            )
            .map_err(|e| MetaError::QueryError(format!("prepare applied query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(|e| MetaError::QueryError(format!("query applied: {e}")))?;

        let mut applied = Vec::new();
        for row in rows {
            let (id, sequence, applied_at, duration_ms, checksum, run_id) =
                row.map_err(|e| MetaError::QueryError(format!("read applied row: {e}")))?;
            let id = MigrationId::try_new(id).ok_or_else(|| {
                MetaError::QueryError("blank migration_id in mongrate.applied".to_string())
            })?;
            let applied_at = DateTime::parse_from_rfc3339(&applied_at)
                .map_err(|e| {
                    MetaError::QueryError(format!("bad applied_at for {id}: {applied_at}: {e}"))
                })?
                .with_timezone(&Utc);
            applied.push(AppliedMigration {
                id,
                sequence: sequence as u64,
                applied_at,
                duration_ms: duration_ms as u64,
                checksum,
                run_id,
            });
        }
        Ok(applied)
    }
}

impl AppliedStore for MetaStore {
    fn applied(&self) -> CoreResult<Vec<AppliedMigration>> {
        Ok(self.load_all()?)
    }

    /// Migration SQL and the ledger row share one DuckDB transaction.
    fn begin_step(&mut self) -> CoreResult<()> {
        Ok(self.db.begin()?)
    }

    fn commit_step(&mut self) -> CoreResult<()> {
        Ok(self.db.commit()?)
    }

    fn abort_step(&mut self) {
        self.db.rollback();
    }

    fn record_applied(&mut self, record: AppliedMigration) -> CoreResult<()> {
        if self.is_applied(&record.id)? {
            return Err(CoreError::Store {
                message: format!("migration '{}' is already recorded as applied", record.id),
            });
        }
        self.db
            .conn()
            .execute(
                "INSERT INTO mongrate.applied
                     (migration_id, sequence, applied_at, duration_ms, checksum, run_id)
                 VALUES (?, ?, ?, ?, ?, ?)",
                duckdb::params![
                    record.id.as_str(),
                    record.sequence as i64,
                    record.applied_at.to_rfc3339(),
                    record.duration_ms as i64,
                    record.checksum,
                    record.run_id,
                ],
            )
            .map_err(|e| MetaError::QueryError(format!("record applied {}: {e}", record.id)))?;
        Ok(())
    }

    fn record_reverted(&mut self, id: &MigrationId) -> CoreResult<()> {
        let deleted = self
            .db
            .conn()
            .execute(
                "DELETE FROM mongrate.applied WHERE migration_id = ?",
                duckdb::params![id.as_str()],
            )
            .map_err(|e| MetaError::QueryError(format!("record reverted {id}: {e}")))?;
        if deleted == 0 {
            return Err(CoreError::Store {
                message: format!("migration '{}' is not recorded as applied", id),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
