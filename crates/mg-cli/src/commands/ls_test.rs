use super::*;
use crate::commands::test_utils::{global, project, CUSTOMERS, ORDERS};

#[test]
fn test_entries_follow_apply_order() {
    let dir = project(&[
        ("orders.yml", ORDERS),
        ("customers.yml", CUSTOMERS),
        ("audit.yml", "id: AUDIT\nup: SELECT 1;\n"),
    ]);
    let project = load_project(&global(dir.path())).unwrap();
    let runner = project.runner(&global(dir.path())).unwrap();

    let entries = collect_entries(&runner).unwrap();

    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["AUDIT", "CS-9", "CS-2"]);
    assert_eq!(entries[0].position, 1);
    assert_eq!(entries[1].run_before, vec![MigrationId::new("CS-2")]);
    assert!(entries.iter().all(|e| e.status == MigrationStatus::Pending));
}

#[test]
fn test_ls_json_output() {
    let dir = project(&[("orders.yml", ORDERS)]);
    execute(
        &LsArgs {
            output: OutputFormat::Json,
        },
        &global(dir.path()),
    )
    .unwrap();
}
