//! Tests for MetaDb connection, ledger schema, and SQL execution.

use crate::MetaDb;
use mg_core::{HookError, SqlExecutor};

/// Query a single i64 value (convenience for COUNT(*) assertions).
fn count(db: &MetaDb, sql: &str) -> i64 {
    db.conn()
        .query_row(sql, [], |row| row.get::<_, i64>(0))
        .unwrap()
}

#[test]
fn open_memory_creates_ledger_schema() {
    let db = MetaDb::open_memory().unwrap();
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM mongrate.schema_version"),
        crate::ddl::SCHEMA_VERSIONS.len() as i64
    );
    assert_eq!(count(&db, "SELECT COUNT(*) FROM mongrate.applied"), 0);
}

#[test]
fn open_file_creates_database_and_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("app.duckdb");
    let _db = MetaDb::open(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn open_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.duckdb");
    {
        let _db1 = MetaDb::open(&path).unwrap();
    }
    let db2 = MetaDb::open(&path).unwrap();
    assert_eq!(
        count(&db2, "SELECT COUNT(*) FROM mongrate.schema_version"),
        crate::ddl::SCHEMA_VERSIONS.len() as i64,
        "schema_version should have one row per version"
    );
    assert_eq!(
        crate::schema::current_version(db2.conn()).unwrap(),
        crate::ddl::SCHEMA_VERSIONS.len() as i32
    );
}

#[test]
fn execute_batch_runs_statements() {
    let db = MetaDb::open_memory().unwrap();
    db.execute_batch("CREATE TABLE orders (id INTEGER); INSERT INTO orders VALUES (1), (2);")
        .unwrap();
    assert_eq!(count(&db, "SELECT COUNT(*) FROM orders"), 2);
}

#[test]
fn failed_batch_is_rolled_back() {
    let db = MetaDb::open_memory().unwrap();
    let err = db
        .execute_batch("CREATE TABLE orders (id INTEGER); SELECT * FROM no_such_table;")
        .unwrap_err();
    assert!(matches!(err, HookError::Sql(_)));
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'orders'"
        ),
        0
    );
}

#[test]
fn transaction_commits_on_success() {
    let db = MetaDb::open_memory().unwrap();
    db.transaction(|conn| {
        conn.execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(count(&db, "SELECT COUNT(*) FROM t"), 1);
}

#[test]
fn nested_step_transaction_rejected() {
    let db = MetaDb::open_memory().unwrap();
    db.begin().unwrap();
    assert!(db.begin().is_err());
    db.rollback();
    assert!(db.commit().is_err());
}

#[test]
fn open_read_only_leaves_missing_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("app.duckdb");
    assert!(MetaDb::open_read_only(&path).unwrap().is_none());
    assert!(!path.exists());
    assert!(!dir.path().join("data").exists());
}

#[test]
fn open_read_only_reads_existing_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.duckdb");
    {
        let db = MetaDb::open(&path).unwrap();
        db.execute_batch("CREATE TABLE orders (id INTEGER)").unwrap();
    }
    let db = MetaDb::open_read_only(&path).unwrap().unwrap();
    assert_eq!(count(&db, "SELECT COUNT(*) FROM mongrate.applied"), 0);
    assert!(db.execute_batch("DROP TABLE orders").is_err());
}
