//! Settings persistence.
//!
//! The gate only depends on the [`SettingsStore`] contract: keyed reads with
//! defaults, writes, and change notifications. [`FileStore`] keeps the values
//! in a TOML file under the data directory; [`MemoryStore`] is the same thing
//! without the file.

mod file_store;
mod store;

pub use file_store::FileStore;
pub use store::{
    ChangeListener, MemoryStore, SettingsStore, StorageChange, StorageChanges, Values,
};

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns the settings directory, creating it if needed.
///
/// `FOCUSGATE_DATA_DIR` wins when set. Otherwise `~/.config/focusgate/`, or
/// `~/.config/focusgate-dev/` when `FOCUSGATE_ENV=dev`.
///
/// # Errors
/// Returns an error if no home directory can be found or the directory
/// cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("FOCUSGATE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir().ok_or(ConfigError::NoDataDir)?.join(".config");
            let env = std::env::var("FOCUSGATE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusgate-dev")
            } else {
                base_dir.join("focusgate")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
