//! Layered error definitions
//!
//! Categorized by source: config / policy construction / synchronizer.
//! Capture outcomes (retry, abort) are not errors; see [`crate::State`].

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

    // ===== Policy Errors =====
    /// Policy parameter rejected at construction time
    #[error("invalid {policy} parameter: {message}")]
    InvalidParameter {
        policy: &'static str,
        message: String,
    },

    // ===== Synchronizer Errors =====
    /// Captor id not registered with the synchronizer
    #[error("unknown captor: {captor_id}")]
    UnknownCaptor { captor_id: String },

    /// Two captors registered under the same id
    #[error("duplicate captor id: {captor_id}")]
    DuplicateCaptor { captor_id: String },

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

    /// Create policy parameter error
    pub fn invalid_parameter(policy: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            policy,
            message: message.into(),
        }
    }

    pub fn unknown_captor(captor_id: impl Into<String>) -> Self {
        Self::UnknownCaptor {
            captor_id: captor_id.into(),
        }
    }

    pub fn duplicate_captor(captor_id: impl Into<String>) -> Self {
        Self::DuplicateCaptor {
            captor_id: captor_id.into(),
        }
    }
}
