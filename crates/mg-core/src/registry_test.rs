use super::*;
use crate::migration::Descriptor;

fn descriptor(id: &str, run_before: &[&str]) -> Box<dyn Migration> {
    Box::new(
        Descriptor::new(id)
            .unwrap()
            .with_run_before(run_before.iter().copied())
            .unwrap(),
    )
}

#[test]
fn test_register_keeps_registration_order() {
    let mut registry = Registry::new();
    registry.register(descriptor("b", &[])).unwrap();
    registry.register(descriptor("a", &[])).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.ids(), vec![MigrationId::new("b"), MigrationId::new("a")]);
    assert!(registry.contains("a"));
    assert_eq!(registry.get("b").unwrap().id(), "b");
    assert!(registry.get("c").is_none());
}

#[test]
fn test_duplicate_id_rejected() {
    let mut registry = Registry::new();
    registry.register(descriptor("CS-1", &[])).unwrap();
    let err = registry.register(descriptor("CS-1", &["CS-2"])).unwrap_err();

    assert!(matches!(err, CoreError::DuplicateMigration { ref id } if id == "CS-1"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_unknown_target_is_deferred_to_resolve() {
    let mut registry = Registry::new();
    // Registering a forward reference is fine
    registry.register(descriptor("a", &["b"])).unwrap();
    assert!(matches!(
        registry.resolve(),
        Err(CoreError::UnknownRunBefore { .. })
    ));

    registry.register(descriptor("b", &[])).unwrap();
    let dag = registry.resolve().unwrap();
    assert_eq!(
        dag.apply_order(),
        &[MigrationId::new("a"), MigrationId::new("b")]
    );
}

#[test]
fn test_register_all_stops_on_duplicate() {
    let mut registry = Registry::new();
    let result = registry.register_all(vec![
        descriptor("a", &[]),
        descriptor("a", &[]),
        descriptor("b", &[]),
    ]);
    assert!(result.is_err());
    assert_eq!(registry.len(), 1);
}
