//! Error types for mg-core

use thiserror::Error;

/// Error raised by a migration callback (`on_load`, `up`, `down`).
///
/// Callbacks never swallow failures: whatever goes wrong is returned to the
/// runner as one of these and becomes a [`CoreError`] or a rollback failure.
#[derive(Error, Debug)]
pub enum HookError {
    /// Free-form failure reported by the migration
    #[error("{0}")]
    Failed(String),

    /// SQL statement failed while running a migration body
    #[error("SQL failed: {0}")]
    Sql(String),

    /// The migration has no `down` body and cannot be reverted
    #[error("migration '{id}' is irreversible: no down body defined")]
    Irreversible { id: String },

    /// Any other error carried through from a callback
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HookError {
    /// Convenience constructor for a free-form failure
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed(message.into())
    }
}

/// Core error type for Mongrate
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Migration id is empty or otherwise unusable
    #[error("[E004] Invalid migration id in {context}")]
    InvalidMigrationId { context: String },

    /// E005: Migration not registered
    #[error("[E005] Migration not found: {id}")]
    MigrationNotFound { id: String },

    /// E006: Migration file could not be parsed
    #[error("[E006] Failed to parse migration file {path}: {details}")]
    MigrationParseError { path: String, details: String },

    /// E007: Circular run_before chain
    #[error("[E007] Circular run_before dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// E008: Duplicate migration id within one registry
    #[error("[E008] Duplicate migration id: {id}")]
    DuplicateMigration { id: String },

    /// E009: run_before names an id no registered migration has
    #[error("[E009] Migration '{id}' must run before unknown migration '{target}'")]
    UnknownRunBefore { id: String, target: String },

    /// E010: Migration file already exists
    #[error("[E010] Migration file already exists: {path}")]
    MigrationExists { path: String },

    /// MG001: An `on_load` hook failed; the whole batch is aborted
    #[error("[MG001] on_load failed for migration '{id}': {source}")]
    LoadFailed {
        id: String,
        #[source]
        source: HookError,
    },

    /// MG002: `up` failed; no further migrations were applied
    #[error("[MG002] Migration '{id}' failed to apply: {source}")]
    ApplyFailed {
        id: String,
        #[source]
        source: HookError,
    },

    /// MG003: `down` failed under the abort rollback policy
    #[error("[MG003] Migration '{id}' failed to roll back: {source}")]
    RollbackFailed {
        id: String,
        #[source]
        source: HookError,
    },

    /// MG004: The applied store lists a migration that is not registered
    #[error("[MG004] Applied migration '{id}' has no registered descriptor; cannot roll it back")]
    MissingDescriptor { id: String },

    /// MG005: The applied store could not be read or written
    #[error("[MG005] Applied store error: {message}")]
    Store { message: String },

    /// MG006: The load phase failed earlier; the batch cannot continue
    #[error("[MG006] Batch aborted: the load phase failed")]
    BatchAborted,

    /// MG007: A pending migration must run before one that is already applied
    #[error(
        "[MG007] Pending migration '{id}' must run before '{applied}', which is already applied"
    )]
    OrderViolation { id: String, applied: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
