//! In-memory registry of the migrations making up one batch

use crate::dag::MigrationDag;
use crate::error::{CoreError, CoreResult};
use crate::migration::Migration;
use crate::migration_id::MigrationId;
use std::collections::HashMap;

/// Registered migrations, kept in registration order.
#[derive(Default)]
pub struct Registry {
    migrations: Vec<Box<dyn Migration>>,
    index: HashMap<MigrationId, usize>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration.
    ///
    /// Rejects an id that is already registered. `run_before` targets are not
    /// checked here since migrations may register in any order; see
    /// [`Registry::resolve`].
    pub fn register(&mut self, migration: Box<dyn Migration>) -> CoreResult<()> {
        let id = migration.id().clone();
        if self.index.contains_key(&id) {
            return Err(CoreError::DuplicateMigration { id: id.into_inner() });
        }
        log::debug!("Registered migration {}", id);
        self.index.insert(id, self.migrations.len());
        self.migrations.push(migration);
        Ok(())
    }

    /// Register every migration from an iterator, stopping at the first duplicate
    pub fn register_all<I>(&mut self, migrations: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = Box<dyn Migration>>,
    {
        for migration in migrations {
            self.register(migration)?;
        }
        Ok(())
    }

    /// Build and validate the ordering graph for everything registered.
    ///
    /// Fails on unknown `run_before` targets and on cycles.
    pub fn resolve(&self) -> CoreResult<MigrationDag> {
        MigrationDag::build(self.iter())
    }

    /// Look up a migration by id
    pub fn get(&self, id: &str) -> Option<&dyn Migration> {
        self.index.get(id).map(|&i| self.migrations[i].as_ref())
    }

    /// Check if an id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Migration> {
        self.migrations.iter().map(|m| m.as_ref())
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> Vec<MigrationId> {
        self.iter().map(|m| m.id().clone()).collect()
    }

    /// Number of registered migrations
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("ids", &self.ids()).finish()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
