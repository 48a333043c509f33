//! Session state shared with migrations during the load phase

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys the runner writes before the load phase: the run id, the dry-run
/// flag and the ids already applied
pub const RESERVED_STATE_KEYS: [&str; 3] = ["run_id", "dry_run", "applied"];

/// Mutable context handed to every migration's `on_load` hook.
///
/// Owned by the runner for the lifetime of one batch. Its shape is open: any
/// field may be absent, so every accessor returns an `Option`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionState {
    values: Map<String, Value>,
}

impl SessionState {
    /// Create an empty session state
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session state from YAML values (the `state:` config key)
    pub fn from_yaml(
        values: &std::collections::HashMap<String, serde_yaml::Value>,
    ) -> serde_json::Result<Self> {
        let mut state = Self::new();
        for (key, value) in values {
            state.insert(key.clone(), serde_json::to_value(value)?);
        }
        Ok(state)
    }

    /// Get a raw value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a string value, `None` when absent or not a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Get a boolean value, `None` when absent or not a boolean
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// Get an integer value, `None` when absent or not an integer
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    /// Insert or replace a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Insert a value only when the key is not already present.
    ///
    /// Returns `true` when the value was inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        if self.values.contains_key(&key) {
            return false;
        }
        self.values.insert(key, value.into());
        true
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the state has no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_fields_are_none() {
        let state = SessionState::new();
        assert!(state.get("anything").is_none());
        assert!(state.get_str("name").is_none());
        assert!(state.get_bool("dry_run").is_none());
    }

    #[test]
    fn test_typed_getters_ignore_wrong_types() {
        let mut state = SessionState::new();
        state.insert("dry_run", "yes");
        state.insert("count", 3);
        assert_eq!(state.get_bool("dry_run"), None);
        assert_eq!(state.get_str("dry_run"), Some("yes"));
        assert_eq!(state.get_i64("count"), Some(3));
    }

    #[test]
    fn test_insert_if_absent_keeps_existing() {
        let mut state = SessionState::new();
        assert!(state.insert_if_absent("table", "orders"));
        assert!(!state.insert_if_absent("table", "customers"));
        assert_eq!(state.get_str("table"), Some("orders"));
    }

    #[test]
    fn test_from_yaml() {
        let mut values = HashMap::new();
        values.insert(
            "env".to_string(),
            serde_yaml::Value::String("dev".to_string()),
        );
        values.insert("batch_size".to_string(), serde_yaml::from_str("500").unwrap());
        let state = SessionState::from_yaml(&values).unwrap();
        assert_eq!(state.get_str("env"), Some("dev"));
        assert_eq!(state.get_i64("batch_size"), Some(500));
    }
}
