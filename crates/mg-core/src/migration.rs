//! The migration contract
//!
//! Every migration, whether compiled in or loaded from a file, is a value
//! implementing [`Migration`]: an id, the ids it must run before, and four
//! lifecycle callbacks. The runner owns ordering, persistence and session
//! state; a migration only describes itself and performs its own change.

use crate::error::HookError;
use crate::migration_id::MigrationId;
use crate::session::SessionState;
use serde::Serialize;

/// Structured result of an `up` or `down` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    /// Human-readable summary of what happened
    pub message: String,

    /// Number of statements or records touched, when the migration knows it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected: Option<usize>,
}

impl MigrationOutcome {
    /// Outcome with a message and no count
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            affected: None,
        }
    }

    /// Attach an affected count
    pub fn with_affected(mut self, affected: usize) -> Self {
        self.affected = Some(affected);
        self
    }
}

/// A single migration unit.
///
/// `id`, `up` and `down` are required; the rest have defaults. `down` is only
/// ever called by the runner for a migration recorded as applied.
pub trait Migration {
    /// Unique id of this migration
    fn id(&self) -> &MigrationId;

    /// Ids of migrations that must be applied strictly after this one
    fn run_before(&self) -> &[MigrationId] {
        &[]
    }

    /// Called once per batch, before any `up`/`down` of the batch
    fn on_load(&self, _state: &mut SessionState) -> Result<(), HookError> {
        Ok(())
    }

    /// Apply the migration
    fn up(&self) -> Result<MigrationOutcome, HookError>;

    /// Revert the migration
    fn down(&self) -> Result<MigrationOutcome, HookError>;

    /// Human-readable description
    fn info(&self) -> String {
        self.id().to_string()
    }

    /// Fingerprint of the migration body, used to detect edits after apply
    fn checksum(&self) -> Option<String> {
        None
    }
}

type LoadHook = Box<dyn Fn(&mut SessionState) -> Result<(), HookError>>;
type ChangeHook = Box<dyn Fn() -> Result<MigrationOutcome, HookError>>;

/// A migration declared as a literal record of closures.
///
/// ```
/// use mg_core::{Descriptor, MigrationOutcome};
///
/// let migration = Descriptor::new("CS-12345")
///     .unwrap()
///     .with_run_before(["CS-12332", "CS-12221"])
///     .unwrap()
///     .with_info("Adds the orders table")
///     .with_up(|| Ok(MigrationOutcome::message("created orders")))
///     .with_down(|| Ok(MigrationOutcome::message("dropped orders")));
/// # let _ = migration;
/// ```
pub struct Descriptor {
    id: MigrationId,
    run_before: Vec<MigrationId>,
    description: Option<String>,
    on_load: Option<LoadHook>,
    up: Option<ChangeHook>,
    down: Option<ChangeHook>,
}

impl Descriptor {
    /// Start a descriptor. Returns `None` for a blank id.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        Some(Self {
            id: MigrationId::try_new(id)?,
            run_before: Vec::new(),
            description: None,
            on_load: None,
            up: None,
            down: None,
        })
    }

    /// Set the ids this migration must run before. Returns `None` if any is blank.
    pub fn with_run_before<I, S>(mut self, ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_before = ids
            .into_iter()
            .map(MigrationId::try_new)
            .collect::<Option<Vec<_>>>()?;
        Some(self)
    }

    /// Set the description returned by `info`
    pub fn with_info(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the load hook
    pub fn with_on_load<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut SessionState) -> Result<(), HookError> + 'static,
    {
        self.on_load = Some(Box::new(hook));
        self
    }

    /// Set the forward change
    pub fn with_up<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<MigrationOutcome, HookError> + 'static,
    {
        self.up = Some(Box::new(hook));
        self
    }

    /// Set the reverse change
    pub fn with_down<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<MigrationOutcome, HookError> + 'static,
    {
        self.down = Some(Box::new(hook));
        self
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.id)
            .field("run_before", &self.run_before)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Migration for Descriptor {
    fn id(&self) -> &MigrationId {
        &self.id
    }

    fn run_before(&self) -> &[MigrationId] {
        &self.run_before
    }

    fn on_load(&self, state: &mut SessionState) -> Result<(), HookError> {
        match &self.on_load {
            Some(hook) => hook(state),
            None => Ok(()),
        }
    }

    fn up(&self) -> Result<MigrationOutcome, HookError> {
        match &self.up {
            Some(hook) => hook(),
            None => Ok(MigrationOutcome::message(format!("{}: nothing to apply", self.id))),
        }
    }

    fn down(&self) -> Result<MigrationOutcome, HookError> {
        match &self.down {
            Some(hook) => hook(),
            None => Ok(MigrationOutcome::message(format!("{}: nothing to revert", self.id))),
        }
    }

    fn info(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let m = Descriptor::new("CS-1").unwrap();
        assert_eq!(m.id(), "CS-1");
        assert!(m.run_before().is_empty());
        assert_eq!(m.info(), "CS-1");
        assert!(m.up().is_ok());
        assert!(m.down().is_ok());
        assert!(m.checksum().is_none());
    }

    #[test]
    fn test_descriptor_rejects_blank_ids() {
        assert!(Descriptor::new("").is_none());
        let m = Descriptor::new("CS-1").unwrap();
        assert!(m.with_run_before(["CS-2", " "]).is_none());
    }

    #[test]
    fn test_descriptor_callbacks() {
        let m = Descriptor::new("CS-12345")
            .unwrap()
            .with_run_before(["CS-12332"])
            .unwrap()
            .with_info("orders table")
            .with_on_load(|state| {
                state.insert("seen", true);
                Ok(())
            })
            .with_up(|| Ok(MigrationOutcome::message("up").with_affected(2)))
            .with_down(|| Err(HookError::failed("cannot undo")));

        let mut state = SessionState::new();
        m.on_load(&mut state).unwrap();
        assert_eq!(state.get_bool("seen"), Some(true));
        assert_eq!(m.run_before(), &[MigrationId::new("CS-12332")]);
        assert_eq!(m.info(), "orders table");
        assert_eq!(m.up().unwrap().affected, Some(2));
        assert!(m.down().is_err());
    }
}
