//! Error types for configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{}'", path.display())]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration file is not a valid config document.
    #[error("failed to parse config file '{}'", path.display())]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Source decode error.
        source: serde_json::Error,
    },
    /// Field contained an invalid value.
    #[error("invalid value for '{field}': {message}")]
    InvalidField {
        /// Field or environment variable that failed validation.
        field: String,
        /// Offending value when available.
        value: Option<String>,
        /// Human-readable error description.
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, value: Option<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            value,
            message: message.into(),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
