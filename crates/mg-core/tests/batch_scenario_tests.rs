//! Multi-migration batch scenarios across runners and ledgers

use mg_core::{
    CoreError, HookError, JsonLedger, MemoryStore, Migration, MigrationId, MigrationOutcome,
    Registry, Runner, RunnerOptions, SessionState,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared fake "database": the list of tables currently present
type Tables = Rc<RefCell<Vec<String>>>;

/// Migration that creates one table and can require another to exist first
struct CreateTable {
    id: MigrationId,
    run_before: Vec<MigrationId>,
    table: String,
    requires: Option<String>,
    tables: Tables,
}

impl CreateTable {
    fn boxed(
        id: &str,
        run_before: &[&str],
        table: &str,
        requires: Option<&str>,
        tables: &Tables,
    ) -> Box<dyn Migration> {
        Box::new(Self {
            id: MigrationId::new(id),
            run_before: run_before.iter().map(|s| MigrationId::new(*s)).collect(),
            table: table.to_string(),
            requires: requires.map(String::from),
            tables: tables.clone(),
        })
    }
}

impl Migration for CreateTable {
    fn id(&self) -> &MigrationId {
        &self.id
    }

    fn run_before(&self) -> &[MigrationId] {
        &self.run_before
    }

    fn on_load(&self, state: &mut SessionState) -> Result<(), HookError> {
        let seen = state.get_i64("loaded").unwrap_or(0);
        state.insert("loaded", seen + 1);
        Ok(())
    }

    fn up(&self) -> Result<MigrationOutcome, HookError> {
        let mut tables = self.tables.borrow_mut();
        if let Some(required) = &self.requires {
            if !tables.contains(required) {
                return Err(HookError::Sql(format!("table {required} does not exist")));
            }
        }
        tables.push(self.table.clone());
        Ok(MigrationOutcome::message(format!("created {}", self.table)).with_affected(1))
    }

    fn down(&self) -> Result<MigrationOutcome, HookError> {
        self.tables.borrow_mut().retain(|t| *t != self.table);
        Ok(MigrationOutcome::message(format!("dropped {}", self.table)))
    }

    fn info(&self) -> String {
        format!("create table {}", self.table)
    }
}

/// customers -> orders -> order_items, declared out of order and with
/// an unrelated audit table
fn ecommerce(tables: &Tables) -> Registry {
    let mut registry = Registry::new();
    registry
        .register_all([
            CreateTable::boxed("CS-300", &[], "order_items", Some("orders"), tables),
            CreateTable::boxed("CS-200", &["CS-300"], "orders", Some("customers"), tables),
            CreateTable::boxed("CS-100", &["CS-200"], "customers", None, tables),
            CreateTable::boxed("AUD-1", &[], "audit_log", None, tables),
        ])
        .unwrap();
    registry
}

// ── Clean E-Commerce batch ──────────────────────────────────────────────

#[test]
fn test_ecommerce_batch_applies_and_reverts() {
    let tables = Tables::default();
    let mut runner = Runner::new(
        ecommerce(&tables),
        MemoryStore::new(),
        SessionState::new(),
        RunnerOptions::default(),
    )
    .unwrap();

    let report = runner.apply(None).unwrap();
    let order: Vec<&str> = report.applied.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(order, vec!["AUD-1", "CS-100", "CS-200", "CS-300"]);
    assert_eq!(runner.state().get_i64("loaded"), Some(4));
    assert_eq!(tables.borrow().len(), 4);

    let report = runner.rollback(None).unwrap();
    let order: Vec<&str> = report.reverted.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(order, vec!["CS-300", "CS-200", "CS-100", "AUD-1"]);
    assert!(tables.borrow().is_empty());
}

// ── Resumed batch with a persisted ledger ───────────────────────────────

#[test]
fn test_second_batch_resumes_from_json_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("target").join("mongrate_status.json");
    let tables = Tables::default();

    let mut first = Runner::new(
        ecommerce(&tables),
        JsonLedger::open(&ledger_path).unwrap(),
        SessionState::new(),
        RunnerOptions::default(),
    )
    .unwrap();
    first.apply(Some("CS-200")).unwrap();
    assert_eq!(*tables.borrow(), vec!["customers", "orders"]);

    let mut second = Runner::new(
        ecommerce(&tables),
        JsonLedger::open(&ledger_path).unwrap(),
        SessionState::new(),
        RunnerOptions::default(),
    )
    .unwrap();
    assert_eq!(
        second.plan().unwrap(),
        vec![MigrationId::new("AUD-1"), MigrationId::new("CS-300")]
    );

    let report = second.apply(None).unwrap();
    assert_eq!(report.already_applied.len(), 2);
    assert_eq!(tables.borrow().len(), 4);
}

// ── Broken batches ──────────────────────────────────────────────────────

#[test]
fn test_cycle_through_three_migrations_rejected() {
    let tables = Tables::default();
    let mut registry = Registry::new();
    registry
        .register_all([
            CreateTable::boxed("a", &["b"], "a", None, &tables),
            CreateTable::boxed("b", &["c"], "b", None, &tables),
            CreateTable::boxed("c", &["a"], "c", None, &tables),
        ])
        .unwrap();

    let err = Runner::new(
        registry,
        MemoryStore::new(),
        SessionState::new(),
        RunnerOptions::default(),
    )
    .err()
    .unwrap();

    match err {
        CoreError::CircularDependency { cycle } => {
            let hops: Vec<&str> = cycle.split(" -> ").collect();
            assert_eq!(hops.len(), 4, "cycle was {cycle}");
            assert_eq!(hops.first(), hops.last());
            assert!(["a", "b", "c"].iter().all(|id| hops.contains(id)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(tables.borrow().is_empty());
}

#[test]
fn test_missing_prerequisite_stops_batch() {
    let tables = Tables::default();
    let mut registry = Registry::new();
    // order_items needs orders but nothing orders them
    registry
        .register_all([
            CreateTable::boxed("A-1", &[], "order_items", Some("orders"), &tables),
            CreateTable::boxed("B-1", &[], "orders", None, &tables),
        ])
        .unwrap();
    let mut runner = Runner::new(
        registry,
        MemoryStore::new(),
        SessionState::new(),
        RunnerOptions::default(),
    )
    .unwrap();

    let err = runner.apply(None).unwrap_err();

    assert!(matches!(err, CoreError::ApplyFailed { ref id, .. } if id == "A-1"));
    assert!(tables.borrow().is_empty());
}
