//! Error types for secret retrieval.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Result type for secrets operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while fetching or caching secrets.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// Secret not found in the source.
    #[error("Secret not found: {key}")]
    NotFound { key: String },

    /// Failed to connect to the secret source.
    #[error("Source connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Authentication with the secret source failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Invalid secret identifier.
    #[error("Invalid secret key: '{key}' - {reason}")]
    InvalidKey { key: String, reason: String },

    /// The source returned something that is not a usable payload.
    #[error("Invalid secret value: {reason}")]
    InvalidValue { reason: String },

    /// Source-specific error.
    #[error("Backend error: {message}")]
    BackendError { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// The fetch did not complete in time.
    #[error("Operation timed out: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// A cache refresh failed. Every caller that joined the refresh receives
    /// the same underlying error.
    #[error("Failed to refresh secret '{secret_id}': {source}")]
    RefreshFailed {
        secret_id: String,
        #[source]
        source: Arc<SecretsError>,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create an authentication failed error.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: message.into() }
    }

    /// Create an invalid key error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into(), reason: reason.into() }
    }

    /// Create an invalid value error.
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue { reason: reason.into() }
    }

    /// Create a backend error.
    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::BackendError { message: message.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a refresh failure wrapping the shared source error.
    pub fn refresh_failed(secret_id: impl Into<String>, source: Arc<SecretsError>) -> Self {
        Self::RefreshFailed { secret_id: secret_id.into(), source }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Returns the error produced by the secret source, looking through the
    /// cache's refresh wrapper.
    pub fn root(&self) -> &SecretsError {
        match self {
            Self::RefreshFailed { source, .. } => source.root(),
            other => other,
        }
    }
}
