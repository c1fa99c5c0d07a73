//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration invalid after applying CLI/env overrides
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Inbound message source could not be opened
    #[error("Failed to open input {path}: {source}")]
    InputOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn input_open(path: &Path, source: std::io::Error) -> Self {
        Self::InputOpen {
            path: path.display().to_string(),
            source,
        }
    }
}
