//! Error types for cors-watcher

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// A single rejected command-line or configuration option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionError {
    /// Option name as shown to the user (e.g. `--url`)
    pub option: String,
    /// Human readable reason
    pub message: String,
}

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.option, self.message)
    }
}

/// Main error type for cors-watcher operations
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid options: {}", join_option_errors(.0))]
    InvalidOptions(Vec<OptionError>),

    #[error("Unable to read \"{file}\": {message}")]
    InputError { file: String, message: String },
}

fn join_option_errors(errors: &[OptionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for cors-watcher operations
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Terminal failure of a single transaction.
///
/// Recorded on the transaction instead of being propagated, so it must be
/// cheap to clone and render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for TransactionError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_builder() {
            TransactionError::InvalidRequest(message)
        } else if err.is_timeout() {
            TransactionError::Timeout(message)
        } else if err.is_connect() {
            TransactionError::Connect(message)
        } else {
            TransactionError::Transport(message)
        }
    }
}

impl Serialize for TransactionError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
