use super::*;
use tempfile::tempdir;

fn record(id: &str, sequence: u64) -> AppliedMigration {
    AppliedMigration {
        id: MigrationId::new(id),
        sequence,
        applied_at: Utc::now(),
        duration_ms: 10,
        checksum: Some("abc".to_string()),
        run_id: "run1".to_string(),
    }
}

#[test]
fn test_memory_store_records_in_sequence_order() {
    let mut store = MemoryStore::new();
    store.record_applied(record("b", 2)).unwrap();
    store.record_applied(record("a", 1)).unwrap();

    let applied = store.applied().unwrap();
    assert_eq!(applied[0].id, "a");
    assert_eq!(applied[1].id, "b");
    assert_eq!(store.next_sequence().unwrap(), 3);
    assert!(store.is_applied("a").unwrap());
    assert!(!store.is_applied("c").unwrap());
}

#[test]
fn test_double_apply_rejected() {
    let mut store = MemoryStore::new();
    store.record_applied(record("a", 1)).unwrap();
    let err = store.record_applied(record("a", 2)).unwrap_err();
    assert!(matches!(err, CoreError::Store { .. }));
}

#[test]
fn test_revert_unknown_rejected() {
    let mut store = MemoryStore::new();
    let err = store.record_reverted(&MigrationId::new("a")).unwrap_err();
    assert!(matches!(err, CoreError::Store { .. }));
}

#[test]
fn test_next_sequence_on_empty_store() {
    let store = MemoryStore::new();
    assert_eq!(store.next_sequence().unwrap(), 1);
}

#[test]
fn test_json_ledger_missing_file_is_empty() {
    let dir = tempdir().unwrap();
    let ledger = JsonLedger::open(&dir.path().join("nope.json")).unwrap();
    assert!(ledger.applied().unwrap().is_empty());
}

#[test]
fn test_json_ledger_persists_across_opens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("target").join("status.json");

    let mut ledger = JsonLedger::open(&path).unwrap();
    ledger.record_applied(record("CS-1", 1)).unwrap();
    ledger.record_applied(record("CS-2", 2)).unwrap();
    ledger.record_reverted(&MigrationId::new("CS-2")).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = JsonLedger::open(&path).unwrap();
    let applied = reopened.applied().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].id, "CS-1");
    assert_eq!(applied[0].checksum.as_deref(), Some("abc"));
}

#[test]
fn test_json_ledger_rejects_corrupt_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("status.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(JsonLedger::open(&path), Err(CoreError::Json(_))));
}

#[test]
fn test_boxed_store_delegates() {
    let mut store: Box<dyn AppliedStore> = Box::new(MemoryStore::new());
    store.record_applied(record("a", 1)).unwrap();
    assert!(store.is_applied("a").unwrap());
}
