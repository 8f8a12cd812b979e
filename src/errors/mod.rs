//! # Error Handling
//!
//! Crate-level error type for process start-up: configuration loading, secret
//! source construction, logging initialisation and the HTTP trigger server.
//! Per-invocation failures are reported through [`crate::probe::ProbeError`]
//! instead, since they never abort the process.

use crate::secrets::SecretsError;

/// Custom result type for pingdb operations
pub type Result<T> = std::result::Result<T, PingDbError>;

/// Main error type for the pingdb process
#[derive(thiserror::Error, Debug)]
pub enum PingDbError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Secret source construction errors
    #[error("Secret source error: {0}")]
    Secrets(#[from] SecretsError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Network transport errors (HTTP trigger)
    #[error("Transport error: {0}")]
    Transport(String),
}

impl PingDbError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }
}

impl From<validator::ValidationErrors> for PingDbError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors.field_errors().keys().next().map(|k| k.to_string());
        Self::Validation { message: errors.to_string(), field }
    }
}
