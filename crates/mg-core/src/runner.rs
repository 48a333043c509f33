//! Batch runner: load, apply, roll back and report on migrations
//!
//! A [`Runner`] owns one batch. Construction resolves the ordering graph, so
//! duplicate ids, unknown `run_before` targets and cycles are all rejected
//! before any callback runs. The load phase then calls every `on_load` once,
//! in registration order, and only afterwards may `up` or `down` be invoked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

use crate::dag::MigrationDag;
use crate::error::{CoreError, CoreResult};
use crate::ledger::{AppliedMigration, AppliedStore};
use crate::migration::MigrationOutcome;
use crate::migration_id::MigrationId;
use crate::registry::Registry;
use crate::session::{SessionState, RESERVED_STATE_KEYS};

/// What to do when a `down` call fails during rollback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackPolicy {
    /// Stop at the first failure and return it as an error
    #[default]
    Abort,
    /// Record the failure in the report and keep reverting the rest
    Continue,
}

impl std::fmt::Display for RollbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackPolicy::Abort => write!(f, "abort"),
            RollbackPolicy::Continue => write!(f, "continue"),
        }
    }
}

/// Runner settings
#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerOptions {
    /// Report what would run without calling `up`/`down` or touching the store
    pub dry_run: bool,

    /// Failure handling for `down`
    pub rollback_policy: RollbackPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    NotLoaded,
    Loaded,
    Failed,
}

/// One migration applied (or planned, in a dry run)
#[derive(Debug, Clone, Serialize)]
pub struct AppliedStep {
    pub id: MigrationId,
    /// `None` in a dry run
    pub outcome: Option<MigrationOutcome>,
    pub duration_ms: u64,
}

/// Result of [`Runner::apply`]
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub run_id: String,
    pub dry_run: bool,
    /// Migrations applied in this run, in order
    pub applied: Vec<AppliedStep>,
    /// Migrations skipped because they were already applied
    pub already_applied: Vec<MigrationId>,
}

/// One migration reverted (or planned, in a dry run)
#[derive(Debug, Clone, Serialize)]
pub struct RevertedStep {
    pub id: MigrationId,
    /// `None` in a dry run
    pub outcome: Option<MigrationOutcome>,
    pub duration_ms: u64,
}

/// A `down` failure recorded under [`RollbackPolicy::Continue`]
#[derive(Debug, Clone, Serialize)]
pub struct RollbackFailure {
    pub id: MigrationId,
    pub error: String,
}

/// Result of [`Runner::rollback`]
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    pub run_id: String,
    pub dry_run: bool,
    /// Migrations reverted, most recently applied first
    pub reverted: Vec<RevertedStep>,
    pub failures: Vec<RollbackFailure>,
}

impl RollbackReport {
    /// True when no `down` call failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Status of one migration relative to the applied store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    /// Registered and recorded as applied
    Applied,
    /// Registered, not applied
    Pending,
    /// Applied, but the body changed since
    Modified,
    /// Applied, but no descriptor is registered for it
    Missing,
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationStatus::Applied => write!(f, "applied"),
            MigrationStatus::Pending => write!(f, "pending"),
            MigrationStatus::Modified => write!(f, "modified"),
            MigrationStatus::Missing => write!(f, "missing"),
        }
    }
}

/// One row of [`Runner::status`]
#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    pub id: MigrationId,
    pub status: MigrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

/// Runs one batch of migrations against an applied store
pub struct Runner<S: AppliedStore> {
    registry: Registry,
    dag: MigrationDag,
    store: S,
    state: SessionState,
    options: RunnerOptions,
    run_id: String,
    phase: LoadPhase,
}

impl<S: AppliedStore> Runner<S> {
    /// Create a runner, validating the whole batch up front
    pub fn new(
        registry: Registry,
        store: S,
        state: SessionState,
        options: RunnerOptions,
    ) -> CoreResult<Self> {
        let dag = registry.resolve()?;
        let run_id = Uuid::new_v4().to_string()[..8].to_string();
        log::debug!(
            "Resolved {} migrations for run {} (dry_run={}, rollback_policy={})",
            dag.len(),
            run_id,
            options.dry_run,
            options.rollback_policy
        );
        Ok(Self {
            registry,
            dag,
            store,
            state,
            options,
            run_id,
            phase: LoadPhase::NotLoaded,
        })
    }

    /// Id of this run
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The registered migrations
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The resolved ordering graph
    pub fn dag(&self) -> &MigrationDag {
        &self.dag
    }

    /// The session state, as mutated by the load phase
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The applied store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the runner and return its store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Run the load phase: every `on_load` exactly once, in registration order.
    ///
    /// Calling it again after success is a no-op. A failing hook aborts the
    /// whole batch; later calls to `load`, `apply` or `rollback` keep failing.
    pub fn load(&mut self) -> CoreResult<()> {
        match self.phase {
            LoadPhase::Loaded => return Ok(()),
            LoadPhase::Failed => return Err(CoreError::BatchAborted),
            LoadPhase::NotLoaded => {}
        }

        let applied: Vec<String> = self
            .store
            .applied()?
            .into_iter()
            .map(|m| m.id.into_inner())
            .collect();
        for key in RESERVED_STATE_KEYS {
            if self.state.contains(key) {
                log::warn!(
                    "Session state key '{}' is set by the runner; ignoring the given value",
                    key
                );
            }
        }
        self.state.insert("run_id", self.run_id.clone());
        self.state.insert("dry_run", self.options.dry_run);
        self.state.insert("applied", applied);

        for migration in self.registry.iter() {
            log::debug!("on_load {}", migration.id());
            if let Err(source) = migration.on_load(&mut self.state) {
                self.phase = LoadPhase::Failed;
                log::error!("on_load failed for {}: {}", migration.id(), source);
                return Err(CoreError::LoadFailed {
                    id: migration.id().to_string(),
                    source,
                });
            }
        }

        self.phase = LoadPhase::Loaded;
        log::info!("Loaded {} migrations", self.registry.len());
        Ok(())
    }

    /// Pending migrations in the order `apply(None)` would run them
    pub fn plan(&self) -> CoreResult<Vec<MigrationId>> {
        self.pending_in(self.dag.apply_order().to_vec())
    }

    fn pending_in(&self, order: Vec<MigrationId>) -> CoreResult<Vec<MigrationId>> {
        let applied: HashSet<MigrationId> =
            self.store.applied()?.into_iter().map(|m| m.id).collect();
        Ok(order
            .into_iter()
            .filter(|id| !applied.contains(id))
            .collect())
    }

    /// Apply pending migrations in DAG order.
    ///
    /// With a `target`, only the target and the migrations that must precede
    /// it are considered. The first failing `up` stops the run and is
    /// returned as [`CoreError::ApplyFailed`]; migrations applied before it
    /// stay recorded. A pending migration whose `run_before` target is already
    /// applied is rejected before any callback runs.
    pub fn apply(&mut self, target: Option<&str>) -> CoreResult<ApplyReport> {
        let order = match target {
            Some(target) => self.dag.apply_order_until(target)?,
            None => self.dag.apply_order().to_vec(),
        };
        let pending = self.pending_in(order.clone())?;
        self.check_pending_order(&pending)?;

        self.load()?;
        let already_applied: Vec<MigrationId> = order
            .into_iter()
            .filter(|id| !pending.contains(id))
            .collect();

        let mut report = ApplyReport {
            run_id: self.run_id.clone(),
            dry_run: self.options.dry_run,
            applied: Vec::with_capacity(pending.len()),
            already_applied,
        };

        for id in pending {
            let migration = self
                .registry
                .get(&id)
                .ok_or_else(|| CoreError::MigrationNotFound { id: id.to_string() })?;

            if self.options.dry_run {
                log::info!("[dry-run] would apply {}", id);
                report.applied.push(AppliedStep {
                    id,
                    outcome: None,
                    duration_ms: 0,
                });
                continue;
            }

            log::info!("Applying {}", id);
            self.store.begin_step()?;
            let start = Instant::now();
            let outcome = match migration.up() {
                Ok(outcome) => outcome,
                Err(source) => {
                    self.store.abort_step();
                    log::error!("Migration {} failed: {}", id, source);
                    return Err(CoreError::ApplyFailed {
                        id: id.into_inner(),
                        source,
                    });
                }
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            let checksum = migration.checksum();
            if let Err(err) = self.record_step(&id, duration_ms, checksum) {
                self.store.abort_step();
                log::error!("Could not record {}: {}", id, err);
                return Err(err);
            }
            self.store.commit_step()?;
            log::info!("Applied {} in {}ms: {}", id, duration_ms, outcome.message);

            report.applied.push(AppliedStep {
                id,
                outcome: Some(outcome),
                duration_ms,
            });
        }

        Ok(report)
    }

    fn record_step(
        &mut self,
        id: &MigrationId,
        duration_ms: u64,
        checksum: Option<String>,
    ) -> CoreResult<()> {
        let record = AppliedMigration {
            id: id.clone(),
            sequence: self.store.next_sequence()?,
            applied_at: Utc::now(),
            duration_ms,
            checksum,
            run_id: self.run_id.clone(),
        };
        self.store.record_applied(record)
    }

    /// Pending migrations may not be ordered before one already applied
    fn check_pending_order(&self, pending: &[MigrationId]) -> CoreResult<()> {
        let applied: HashSet<MigrationId> =
            self.store.applied()?.into_iter().map(|m| m.id).collect();
        for id in pending {
            if let Some(target) = self
                .dag
                .successors(id)
                .into_iter()
                .find(|s| applied.contains(s))
            {
                return Err(CoreError::OrderViolation {
                    id: id.to_string(),
                    applied: target.into_inner(),
                });
            }
        }
        Ok(())
    }

    /// Revert applied migrations, most recently applied first.
    ///
    /// `steps` limits how many are reverted; `None` reverts everything.
    /// Only migrations recorded as applied are ever passed to `down`.
    pub fn rollback(&mut self, steps: Option<usize>) -> CoreResult<RollbackReport> {
        self.load()?;

        let mut applied = self.store.applied()?;
        applied.reverse();
        let selected: Vec<MigrationId> = applied
            .into_iter()
            .take(steps.unwrap_or(usize::MAX))
            .map(|m| m.id)
            .collect();

        // Refuse to start if any selected migration cannot be reverted at all
        if let Some(missing) = selected.iter().find(|id| !self.registry.contains(id)) {
            return Err(CoreError::MissingDescriptor {
                id: missing.to_string(),
            });
        }

        let mut report = RollbackReport {
            run_id: self.run_id.clone(),
            dry_run: self.options.dry_run,
            reverted: Vec::with_capacity(selected.len()),
            failures: Vec::new(),
        };

        for id in selected {
            let migration = self
                .registry
                .get(&id)
                .ok_or_else(|| CoreError::MissingDescriptor { id: id.to_string() })?;

            if self.options.dry_run {
                log::info!("[dry-run] would roll back {}", id);
                report.reverted.push(RevertedStep {
                    id,
                    outcome: None,
                    duration_ms: 0,
                });
                continue;
            }

            log::info!("Rolling back {}", id);
            self.store.begin_step()?;
            let start = Instant::now();
            match migration.down() {
                Ok(outcome) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    if let Err(err) = self.store.record_reverted(&id) {
                        self.store.abort_step();
                        return Err(err);
                    }
                    self.store.commit_step()?;
                    log::info!("Rolled back {} in {}ms: {}", id, duration_ms, outcome.message);
                    report.reverted.push(RevertedStep {
                        id,
                        outcome: Some(outcome),
                        duration_ms,
                    });
                }
                Err(source) => {
                    self.store.abort_step();
                    log::error!("Rollback of {} failed: {}", id, source);
                    match self.options.rollback_policy {
                        RollbackPolicy::Abort => {
                            return Err(CoreError::RollbackFailed {
                                id: id.into_inner(),
                                source,
                            });
                        }
                        RollbackPolicy::Continue => {
                            report.failures.push(RollbackFailure {
                                id,
                                error: source.to_string(),
                            });
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Status of every known migration: registered ones in apply order, then
    /// applied ids with no registered descriptor.
    pub fn status(&self) -> CoreResult<Vec<StatusRow>> {
        let applied = self.store.applied()?;
        let mut rows = Vec::with_capacity(self.dag.len());

        for id in self.dag.apply_order() {
            let Some(migration) = self.registry.get(id) else {
                continue;
            };
            let record = applied.iter().find(|m| m.id == *id);
            let status = match record {
                None => MigrationStatus::Pending,
                Some(record) => match (&record.checksum, migration.checksum()) {
                    (Some(then), Some(now)) if *then != now => MigrationStatus::Modified,
                    _ => MigrationStatus::Applied,
                },
            };
            rows.push(StatusRow {
                id: id.clone(),
                status,
                applied_at: record.map(|r| r.applied_at),
                info: Some(migration.info()),
            });
        }

        for record in &applied {
            if !self.registry.contains(&record.id) {
                rows.push(StatusRow {
                    id: record.id.clone(),
                    status: MigrationStatus::Missing,
                    applied_at: Some(record.applied_at),
                    info: None,
                });
            }
        }

        Ok(rows)
    }

    /// Description of one migration; safe to call in any phase
    pub fn info(&self, id: &str) -> CoreResult<String> {
        self.registry
            .get(id)
            .map(|m| m.info())
            .ok_or_else(|| CoreError::MigrationNotFound { id: id.to_string() })
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
