//! Persisted record of applied migrations
//!
//! The runner consults an [`AppliedStore`] before every `up` and `down` call:
//! a migration is applied at most once, and only applied migrations are ever
//! reverted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::migration_id::MigrationId;

/// One applied migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    /// Migration id
    pub id: MigrationId,

    /// Position in applied order (1-based, strictly increasing)
    pub sequence: u64,

    /// When `up` completed
    pub applied_at: DateTime<Utc>,

    /// How long `up` took (in milliseconds)
    pub duration_ms: u64,

    /// Checksum of the migration body at apply time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Run that applied the migration
    pub run_id: String,
}

/// Storage for the applied-migration ledger
pub trait AppliedStore {
    /// All applied migrations, ordered by `sequence`
    fn applied(&self) -> CoreResult<Vec<AppliedMigration>>;

    /// Record a successful `up`. Fails if the id is already recorded.
    fn record_applied(&mut self, record: AppliedMigration) -> CoreResult<()>;

    /// Remove a migration after a successful `down`. Fails if it is not recorded.
    fn record_reverted(&mut self, id: &MigrationId) -> CoreResult<()>;

    /// Open a unit of work covering one `up`/`down` and its ledger update.
    ///
    /// Stores that share a database with the migrations make the change and
    /// the record atomic here; the default does nothing.
    fn begin_step(&mut self) -> CoreResult<()> {
        Ok(())
    }

    /// Make the current step durable
    fn commit_step(&mut self) -> CoreResult<()> {
        Ok(())
    }

    /// Discard the current step after a failed callback or record
    fn abort_step(&mut self) {}

    /// Check whether a migration is recorded as applied
    fn is_applied(&self, id: &str) -> CoreResult<bool> {
        Ok(self.applied()?.iter().any(|m| m.id == *id))
    }

    /// Next sequence number to hand out
    fn next_sequence(&self) -> CoreResult<u64> {
        Ok(self
            .applied()?
            .iter()
            .map(|m| m.sequence)
            .max()
            .unwrap_or(0)
            + 1)
    }
}

/// Ledger kept in memory only; used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<AppliedMigration>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing entries
    pub fn with_entries(mut entries: Vec<AppliedMigration>) -> Self {
        entries.sort_by_key(|m| m.sequence);
        Self { entries }
    }
}

fn insert_entry(entries: &mut Vec<AppliedMigration>, record: AppliedMigration) -> CoreResult<()> {
    if entries.iter().any(|m| m.id == record.id) {
        return Err(CoreError::Store {
            message: format!("migration '{}' is already recorded as applied", record.id),
        });
    }
    entries.push(record);
    entries.sort_by_key(|m| m.sequence);
    Ok(())
}

fn remove_entry(entries: &mut Vec<AppliedMigration>, id: &MigrationId) -> CoreResult<()> {
    let before = entries.len();
    entries.retain(|m| m.id != *id);
    if entries.len() == before {
        return Err(CoreError::Store {
            message: format!("migration '{}' is not recorded as applied", id),
        });
    }
    Ok(())
}

impl AppliedStore for MemoryStore {
    fn applied(&self) -> CoreResult<Vec<AppliedMigration>> {
        Ok(self.entries.clone())
    }

    fn record_applied(&mut self, record: AppliedMigration) -> CoreResult<()> {
        insert_entry(&mut self.entries, record)
    }

    fn record_reverted(&mut self, id: &MigrationId) -> CoreResult<()> {
        remove_entry(&mut self.entries, id)
    }
}

/// On-disk ledger format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerFile {
    last_updated_at: DateTime<Utc>,
    applied: Vec<AppliedMigration>,
}

/// Ledger persisted as a JSON file, rewritten atomically on every change.
#[derive(Debug)]
pub struct JsonLedger {
    path: PathBuf,
    entries: Vec<AppliedMigration>,
}

impl JsonLedger {
    /// Open the ledger at `path`; a missing file is an empty ledger
    pub fn open(path: &Path) -> CoreResult<Self> {
        let entries = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            })?;
            let mut file: LedgerFile = serde_json::from_str(&content)?;
            file.applied.sort_by_key(|m| m.sequence);
            file.applied
        } else {
            Vec::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save atomically using write-to-temp-then-rename
    fn save(&self) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = LedgerFile {
            last_updated_at: Utc::now(),
            applied: self.entries.clone(),
        };
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(&file)?)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl AppliedStore for JsonLedger {
    fn applied(&self) -> CoreResult<Vec<AppliedMigration>> {
        Ok(self.entries.clone())
    }

    fn record_applied(&mut self, record: AppliedMigration) -> CoreResult<()> {
        insert_entry(&mut self.entries, record)?;
        self.save()
    }

    fn record_reverted(&mut self, id: &MigrationId) -> CoreResult<()> {
        remove_entry(&mut self.entries, id)?;
        self.save()
    }
}

impl<S: AppliedStore + ?Sized> AppliedStore for Box<S> {
    fn applied(&self) -> CoreResult<Vec<AppliedMigration>> {
        (**self).applied()
    }

    fn record_applied(&mut self, record: AppliedMigration) -> CoreResult<()> {
        (**self).record_applied(record)
    }

    fn record_reverted(&mut self, id: &MigrationId) -> CoreResult<()> {
        (**self).record_reverted(id)
    }

    fn begin_step(&mut self) -> CoreResult<()> {
        (**self).begin_step()
    }

    fn commit_step(&mut self) -> CoreResult<()> {
        (**self).commit_step()
    }

    fn abort_step(&mut self) {
        (**self).abort_step()
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
