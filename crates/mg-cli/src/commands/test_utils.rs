//! Temp-project helpers shared by command tests

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::cli::GlobalArgs;

/// A project with a file-backed DuckDB database so state survives between commands
pub(crate) fn project(migrations: &[(&str, &str)]) -> TempDir {
    project_with_config(
        "name: test_project\ndatabase:\n  path: target/app.duckdb\n",
        migrations,
    )
}

pub(crate) fn project_with_config(config: &str, migrations: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("mongrate.yml"), config).unwrap();
    let migrations_dir = dir.path().join("migrations");
    fs::create_dir_all(&migrations_dir).unwrap();
    for (name, content) in migrations {
        fs::write(migrations_dir.join(name), content).unwrap();
    }
    dir
}

pub(crate) fn global(root: &Path) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: root.to_path_buf(),
        config: None,
        dry_run: false,
    }
}

pub(crate) const ORDERS: &str = "id: CS-2\ndescription: Orders table\nup: CREATE TABLE orders (id INTEGER);\ndown: DROP TABLE orders;\n";

pub(crate) const CUSTOMERS: &str = "id: CS-9\nrun_before: [CS-2]\nup: CREATE TABLE customers (id INTEGER);\ndown: DROP TABLE customers;\n";

/// Ids recorded in the project's DuckDB ledger, in applied order
pub(crate) fn applied_ids(root: &Path) -> Vec<String> {
    use mg_core::AppliedStore;
    use mg_meta::{MetaDb, MetaStore};
    use std::rc::Rc;

    let db = MetaDb::open(&root.join("target/app.duckdb")).unwrap();
    MetaStore::new(Rc::new(db))
        .applied()
        .unwrap()
        .into_iter()
        .map(|m| m.id.into_inner())
        .collect()
}

/// Whether a table exists in the project's DuckDB database
pub(crate) fn table_exists(root: &Path, table: &str) -> bool {
    let db = mg_meta::MetaDb::open(&root.join("target/app.duckdb")).unwrap();
    let count: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            [table],
            |row| row.get(0),
        )
        .unwrap();
    count > 0
}
