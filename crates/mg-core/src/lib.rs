//! mg-core - Core library for Mongrate
//!
//! This crate defines the migration contract (the [`Migration`] trait and the
//! closure-based [`Descriptor`]), the registry and ordering DAG built from
//! `run_before` constraints, the applied-migration ledger, the batch
//! [`Runner`], YAML/SQL migration files, and project configuration.

pub mod checksum;
pub mod config;
pub mod dag;
pub mod error;
pub mod ledger;
pub mod migration;
pub mod migration_id;
pub mod registry;
pub mod runner;
pub mod session;
pub mod sql_migration;
pub mod template;

pub use checksum::migration_checksum;
pub use config::{Config, LedgerBackend, LogLevel};
pub use dag::MigrationDag;
pub use error::{CoreError, CoreResult, HookError};
pub use ledger::{AppliedMigration, AppliedStore, JsonLedger, MemoryStore};
pub use migration::{Descriptor, Migration, MigrationOutcome};
pub use migration_id::MigrationId;
pub use registry::Registry;
pub use runner::{
    ApplyReport, MigrationStatus, RollbackPolicy, RollbackReport, Runner, RunnerOptions,
    StatusRow,
};
pub use session::SessionState;
pub use sql_migration::{discover_migrations, SqlExecutor, SqlMigration};
pub use template::{render_template, write_template};
