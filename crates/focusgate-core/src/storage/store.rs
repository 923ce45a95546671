use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Flat key/value settings, keyed the way the extension names them.
pub type Values = serde_json::Map<String, Value>;

/// One entry of a change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// Changed keys only. A key whose value was written unchanged is absent.
pub type StorageChanges = BTreeMap<String, StorageChange>;

pub type ChangeListener = Box<dyn FnMut(&StorageChanges) + Send>;

/// Key/value settings storage.
///
/// Listeners registered with [`subscribe`](Self::subscribe) only hear about
/// writes made through this store instance. They do not feed the gate: a
/// running [`MessageRouter`](crate::MessageRouter) learns about changes from
/// the host's `settingsChanged` event, which it passes to
/// [`handle_settings_changes`](crate::MessageRouter::handle_settings_changes).
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Value>;

    /// Reads every key of `defaults`, substituting the default where the
    /// store has nothing.
    fn get_many(&self, defaults: &Values) -> Values {
        defaults
            .iter()
            .map(|(key, default)| {
                let value = self.get(key).unwrap_or_else(|| default.clone());
                (key.clone(), value)
            })
            .collect()
    }

    /// Writes `values`; a `null` value removes the key. Listeners are told
    /// about the keys that actually changed.
    fn set(&mut self, values: Values) -> Result<StorageChanges>;

    fn remove(&mut self, keys: &[&str]) -> Result<StorageChanges> {
        let values = keys
            .iter()
            .map(|key| (key.to_string(), Value::Null))
            .collect();
        self.set(values)
    }

    fn subscribe(&mut self, listener: ChangeListener);
}

#[derive(Default)]
pub(crate) struct Listeners(Vec<ChangeListener>);

impl Listeners {
    pub(crate) fn push(&mut self, listener: ChangeListener) {
        self.0.push(listener);
    }

    pub(crate) fn notify(&mut self, changes: &StorageChanges) {
        if changes.is_empty() {
            return;
        }
        for listener in &mut self.0 {
            listener(changes);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listeners({})", self.0.len())
    }
}

/// Applies `incoming` onto `target` and reports what changed.
pub(crate) fn merge_values(target: &mut Values, incoming: Values) -> StorageChanges {
    let mut changes = StorageChanges::new();
    for (key, value) in incoming {
        let old_value = if value.is_null() {
            target.remove(&key)
        } else if target.get(&key) == Some(&value) {
            continue;
        } else {
            target.insert(key.clone(), value.clone())
        };

        let new_value = (!value.is_null()).then_some(value);
        if old_value.is_none() && new_value.is_none() {
            continue;
        }
        changes.insert(
            key,
            StorageChange {
                old_value,
                new_value,
            },
        );
    }
    changes
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Values,
    listeners: Listeners,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: Values) -> Self {
        Self {
            values,
            listeners: Listeners::default(),
        }
    }

    pub fn values(&self) -> &Values {
        &self.values
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, values: Values) -> Result<StorageChanges> {
        let changes = merge_values(&mut self.values, values);
        self.listeners.notify(&changes);
        Ok(changes)
    }

    fn subscribe(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }
}
