use super::*;
use crate::cli::MigrateArgs;
use crate::commands::migrate;
use crate::commands::test_utils::{
    applied_ids, global, project, project_with_config, table_exists, CUSTOMERS, ORDERS,
};

fn migrate_all(root: &std::path::Path) {
    migrate::execute(&MigrateArgs { target: None }, &global(root)).unwrap();
}

#[test]
fn test_rollback_all_in_reverse_order() {
    let dir = project(&[("orders.yml", ORDERS), ("customers.yml", CUSTOMERS)]);
    migrate_all(dir.path());

    execute(&RollbackArgs { steps: None }, &global(dir.path())).unwrap();

    assert!(applied_ids(dir.path()).is_empty());
    assert!(!table_exists(dir.path(), "orders"));
    assert!(!table_exists(dir.path(), "customers"));
}

#[test]
fn test_rollback_steps_reverts_most_recent() {
    let dir = project(&[("orders.yml", ORDERS), ("customers.yml", CUSTOMERS)]);
    migrate_all(dir.path());

    execute(&RollbackArgs { steps: Some(1) }, &global(dir.path())).unwrap();

    assert_eq!(applied_ids(dir.path()), vec!["CS-9"]);
    assert!(!table_exists(dir.path(), "orders"));
    assert!(table_exists(dir.path(), "customers"));
}

#[test]
fn test_rollback_with_nothing_applied() {
    let dir = project(&[("orders.yml", ORDERS)]);
    execute(&RollbackArgs { steps: None }, &global(dir.path())).unwrap();
}

#[test]
fn test_rollback_dry_run_keeps_everything() {
    let dir = project(&[("orders.yml", ORDERS)]);
    migrate_all(dir.path());
    let mut args = global(dir.path());
    args.dry_run = true;

    execute(&RollbackArgs { steps: None }, &args).unwrap();

    assert_eq!(applied_ids(dir.path()), vec!["CS-2"]);
    assert!(table_exists(dir.path(), "orders"));
}

const IRREVERSIBLE: &str = "id: CS-1\nrun_before: [CS-2]\nup: CREATE TABLE legacy (id INTEGER);\n";

#[test]
fn test_rollback_abort_policy_returns_error() {
    let dir = project(&[("orders.yml", ORDERS), ("legacy.yml", IRREVERSIBLE)]);
    migrate_all(dir.path());

    let err = execute(&RollbackArgs { steps: None }, &global(dir.path())).unwrap_err();

    assert!(format!("{err:#}").contains("MG003"));
    assert_eq!(applied_ids(dir.path()), vec!["CS-1"]);
}

#[test]
fn test_rollback_continue_policy_exits_nonzero() {
    let dir = project_with_config(
        "name: test_project\ndatabase:\n  path: target/app.duckdb\nrollback_policy: continue\n",
        &[("legacy.yml", IRREVERSIBLE), ("orders.yml", ORDERS)],
    );
    migrate_all(dir.path());

    let err = execute(&RollbackArgs { steps: None }, &global(dir.path())).unwrap_err();

    assert_eq!(err.downcast_ref::<ExitCode>().map(|c| c.0), Some(1));
    assert_eq!(applied_ids(dir.path()), vec!["CS-1"]);
    assert!(!table_exists(dir.path(), "orders"));
}
