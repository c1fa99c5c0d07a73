//! Layered error definitions
//!
//! Categorized by source: config / primitive construction / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Primitive Errors =====
    /// Invalid construction parameter (window, ttl, interval, ...)
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    // ===== Sink Errors =====
    /// Sink send error
    #[error("sink '{sink_name}' send error: {message}")]
    SinkSend { sink_name: String, message: String },

    /// Sink destination is not reachable (client not started, channel closed)
    #[error("sink '{sink_name}' unavailable: {message}")]
    SinkUnavailable { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create sink send error
    pub fn sink_send(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkSend {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink unavailable error
    pub fn sink_unavailable(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkUnavailable {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
