//! DuckDB backend for Mongrate.
//!
//! Provides [`MetaDb`], the connection SQL migrations execute against, and
//! [`MetaStore`], which keeps the applied-migration ledger in the
//! `mongrate.applied` table of the same database.

pub mod connection;
pub mod ddl;
pub mod error;
pub mod schema;
pub mod store;

pub use connection::MetaDb;
pub use error::{MetaError, MetaResult};
pub use store::MetaStore;
