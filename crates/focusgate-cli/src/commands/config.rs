use clap::Subcommand;
use focusgate_core::gate::{clamp_minutes, FOCUS_REQUIRED_KEY, UNLOCK_MINUTES_KEY};
use focusgate_core::{ConfigError, FileStore, Settings, SettingsStore, StorageChanges, Values};
use serde_json::Value;
use tracing::info;

const KEYS: [&str; 2] = [FOCUS_REQUIRED_KEY, UNLOCK_MINUTES_KEY];

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key ("focusRequiredMinutes" or "unlockMinutes")
        key: String,
    },
    /// Set a config value (whole minutes, at least 1)
    Set {
        /// Config key
        key: String,
        /// New value in minutes
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

fn known_key(key: &str) -> Result<&'static str, ConfigError> {
    KEYS.into_iter()
        .find(|k| *k == key)
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
}

/// Parses a minute count the way the options page stores it.
fn parse_minutes(key: &str, value: &str) -> Result<u32, ConfigError> {
    let minutes: f64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{value}' is not a number of minutes"),
    })?;
    Ok(clamp_minutes(minutes))
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = FileStore::open_default()?;

    match action {
        ConfigAction::Get { key } => {
            let key = known_key(&key)?;
            let values = store.get_many(&Settings::defaults_map());
            let value = values.get(key).cloned().unwrap_or(Value::Null);
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let key = known_key(&key)?;
            let minutes = parse_minutes(key, &value)?;
            store.subscribe(Box::new(|changes: &StorageChanges| {
                for (key, change) in changes {
                    info!(key = %key, old = ?change.old_value, new = ?change.new_value, "Setting changed");
                }
            }));
            let mut values = Values::new();
            values.insert(key.to_string(), Value::from(minutes));
            store.set(values)?;
            println!("ok");
        }
        ConfigAction::List => {
            let values = store.get_many(&Settings::defaults_map());
            let (focus, unlock) = Settings::minutes_from_values(&values);
            let settings = Settings::clamped(focus, unlock);
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::Reset => {
            store.remove(&KEYS)?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_gate_keys_are_known() {
        assert_eq!(known_key("unlockMinutes").unwrap(), UNLOCK_MINUTES_KEY);
        assert!(known_key("theme").is_err());
    }

    #[test]
    fn minutes_are_clamped() {
        assert_eq!(parse_minutes("unlockMinutes", "12.9").unwrap(), 12);
        assert_eq!(parse_minutes("unlockMinutes", " 0 ").unwrap(), 1);
        assert!(parse_minutes("unlockMinutes", "ten").is_err());
    }
}
