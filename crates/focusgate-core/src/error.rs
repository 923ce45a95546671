//! Core error types for focusgate-core.
//!
//! The gate state machine itself never fails: bad inputs are clamped.
//! Errors only come from the edges (settings persistence and the browser host).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusgate-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The browser host refused or failed a delegated command
    #[error("Browser host error: {message}")]
    Host { message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Could not locate a directory to keep settings in
    #[error("Could not determine a data directory for settings")]
    NoDataDir,

    /// Failed to load configuration
    #[error("Failed to load settings from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save settings to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key is not one the store knows how to hold
    #[error("Unknown settings key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl CoreError {
    pub fn host(message: impl Into<String>) -> Self {
        CoreError::Host {
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
