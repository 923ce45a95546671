//! Gate durations and how they are read out of the settings store.
//!
//! Values arrive as loosely typed JSON (whatever the options page wrote).
//! Anything that is not a number is treated as absent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{StorageChanges, Values};

pub const FOCUS_REQUIRED_KEY: &str = "focusRequiredMinutes";
pub const UNLOCK_MINUTES_KEY: &str = "unlockMinutes";

pub const DEFAULT_FOCUS_REQUIRED_MINUTES: u32 = 60;
pub const DEFAULT_UNLOCK_MINUTES: u32 = 10;

const MS_PER_MINUTE: u64 = 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub focus_required_minutes: u32,
    pub unlock_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_required_minutes: DEFAULT_FOCUS_REQUIRED_MINUTES,
            unlock_minutes: DEFAULT_UNLOCK_MINUTES,
        }
    }
}

/// Floors to whole minutes with a minimum of one.
///
/// NaN and negatives land on 1; infinities saturate.
pub fn clamp_minutes(value: f64) -> u32 {
    (value.floor() as u32).max(1)
}

impl Settings {
    pub fn clamped(focus_minutes: f64, unlock_minutes: f64) -> Self {
        Self {
            focus_required_minutes: clamp_minutes(focus_minutes),
            unlock_minutes: clamp_minutes(unlock_minutes),
        }
    }

    pub fn focus_required_ms(&self) -> u64 {
        u64::from(self.focus_required_minutes) * MS_PER_MINUTE
    }

    pub fn unlock_allowance_ms(&self) -> u64 {
        u64::from(self.unlock_minutes) * MS_PER_MINUTE
    }

    /// Keys and fallbacks to ask the store for at startup.
    pub fn defaults_map() -> Values {
        let defaults = Self::default();
        let mut map = Values::new();
        map.insert(
            FOCUS_REQUIRED_KEY.to_string(),
            Value::from(defaults.focus_required_minutes),
        );
        map.insert(
            UNLOCK_MINUTES_KEY.to_string(),
            Value::from(defaults.unlock_minutes),
        );
        map
    }

    /// Raw minute values from a store read, falling back to the defaults
    /// for missing or non-numeric entries.
    pub fn minutes_from_values(values: &Values) -> (f64, f64) {
        let defaults = Self::default();
        (
            values
                .get(FOCUS_REQUIRED_KEY)
                .and_then(Value::as_f64)
                .unwrap_or(f64::from(defaults.focus_required_minutes)),
            values
                .get(UNLOCK_MINUTES_KEY)
                .and_then(Value::as_f64)
                .unwrap_or(f64::from(defaults.unlock_minutes)),
        )
    }

    /// Folds a change notification into the current settings.
    ///
    /// Returns `None` when neither key carried a numeric new value, in which
    /// case nothing should be applied.
    pub fn minutes_from_changes(&self, changes: &StorageChanges) -> Option<(f64, f64)> {
        let numeric = |key: &str| {
            changes
                .get(key)
                .and_then(|change| change.new_value.as_ref())
                .and_then(Value::as_f64)
        };
        let focus = numeric(FOCUS_REQUIRED_KEY);
        let unlock = numeric(UNLOCK_MINUTES_KEY);
        if focus.is_none() && unlock.is_none() {
            return None;
        }
        Some((
            focus.unwrap_or(f64::from(self.focus_required_minutes)),
            unlock.unwrap_or(f64::from(self.unlock_minutes)),
        ))
    }
}
