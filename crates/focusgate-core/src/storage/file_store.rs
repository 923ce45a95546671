//! TOML-backed settings store.
//!
//! Holds the gate durations and the blocked-domain list. Stored at
//! `<data dir>/settings.toml`; a missing file reads as empty.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::data_dir;
use super::store::{merge_values, ChangeListener, Listeners, SettingsStore, StorageChanges, Values};
use crate::error::{ConfigError, Result};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Values,
    listeners: Listeners,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "settings.toml";

    /// Open the store in the default data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory is unavailable or the file
    /// exists but cannot be parsed.
    pub fn open_default() -> Result<Self> {
        Self::open(data_dir()?.join(Self::FILE_NAME))
    }

    /// Open the store at `path`. The file is not created until first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str::<Values>(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.clone(),
                    message: e.to_string(),
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Values::new(),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path,
                    message: e.to_string(),
                }
                .into())
            }
        };
        debug!(path = %path.display(), keys = values.len(), "Settings store opened");
        Ok(Self {
            path,
            values,
            listeners: Listeners::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    fn save(&self) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: self.path.clone(),
            message,
        };
        let content = toml::to_string_pretty(&self.values).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(&self.path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, values: Values) -> Result<StorageChanges> {
        let mut next = self.values.clone();
        let changes = merge_values(&mut next, values);
        if changes.is_empty() {
            return Ok(changes);
        }

        let previous = std::mem::replace(&mut self.values, next);
        if let Err(e) = self.save() {
            self.values = previous;
            return Err(e);
        }
        self.listeners.notify(&changes);
        Ok(changes)
    }

    fn subscribe(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }
}
