//! Embedded DDL for the ledger schema.
//!
//! Each version is a numbered `.sql` file embedded via `include_str!`.
//! [`SCHEMA_VERSIONS`] is ordered by version number and consumed by
//! [`crate::schema::ensure_schema`].

/// A single ledger schema version.
pub struct SchemaVersion {
    /// Sequential version number (1-based).
    pub version: i32,
    /// Raw SQL to execute.
    pub sql: &'static str,
}

/// All known schema versions, in order.
pub static SCHEMA_VERSIONS: &[SchemaVersion] = &[SchemaVersion {
    version: 1,
    sql: include_str!("v001_applied.sql"),
}];
