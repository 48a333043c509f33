//! Error types for the DuckDB backend.

use mg_core::{CoreError, HookError};
use thiserror::Error;

/// Backend errors.
#[derive(Error, Debug)]
pub enum MetaError {
    /// Failed to open or create the database (M001).
    #[error("[M001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Ledger schema migration failed (M002).
    #[error("[M002] Ledger schema migration failed: {0}")]
    MigrationError(String),

    /// SQL execution error (M003).
    #[error("[M003] Query failed: {0}")]
    QueryError(String),

    /// Transaction management error (M004).
    #[error("[M004] Transaction failed: {0}")]
    TransactionError(String),

    /// DuckDB driver error with preserved source chain (M007).
    #[error("[M007] DuckDB error")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for [`MetaError`].
pub type MetaResult<T> = Result<T, MetaError>;

impl From<duckdb::Error> for MetaError {
    fn from(err: duckdb::Error) -> Self {
        MetaError::DuckDb(err)
    }
}

impl From<MetaError> for CoreError {
    fn from(err: MetaError) -> Self {
        CoreError::Store {
            message: display_chain(&err),
        }
    }
}

impl From<MetaError> for HookError {
    fn from(err: MetaError) -> Self {
        HookError::Sql(display_chain(&err))
    }
}

/// Render an error with its sources, since `DuckDb` keeps detail in the source
fn display_chain(err: &MetaError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
