//! # Process Settings
//!
//! Settings fixed for the lifetime of the process: which secret to read and
//! from where, the cache TTL, the invocation deadline and logging options.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::errors::{PingDbError, Result};
use crate::secrets::SecretSourceType;

/// Identifier of the database credential secret.
pub const DEFAULT_SECRET_ID: &str = "postgres-secret";

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Secret holding the database password and name
    #[validate(length(min = 1, message = "Secret identifier cannot be empty"))]
    pub secret_id: String,

    /// Where secrets are fetched from
    pub secret_source: SecretSourceType,

    /// Secret cache TTL in milliseconds
    #[validate(range(min = 1, message = "Cache TTL must be at least 1ms"))]
    pub cache_ttl_ms: u64,

    /// Upper bound for one fetch from the secret source, in milliseconds
    #[validate(range(min = 1, message = "Fetch timeout must be at least 1ms"))]
    pub fetch_timeout_ms: u64,

    /// Deadline for a whole probe invocation, in milliseconds
    #[validate(range(min = 1, max = 900000, message = "Invocation timeout must be between 1ms and 15 minutes"))]
    pub invocation_timeout_ms: u64,

    /// Listen address of the HTTP trigger
    #[validate(length(min = 1, message = "Bind address cannot be empty"))]
    pub bind_address: String,

    /// Logging configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            secret_id: DEFAULT_SECRET_ID.to_string(),
            secret_source: SecretSourceType::Env,
            cache_ttl_ms: 5_000,
            fetch_timeout_ms: 5_000,
            invocation_timeout_ms: 5_000,
            bind_address: "0.0.0.0:8080".to_string(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Create configuration from environment variables
    ///
    /// Uses:
    /// - `PINGDB_SECRET_ID` (default: "postgres-secret")
    /// - `PINGDB_SECRET_BACKEND` (`env`, `vault` or `aws`; default: "env")
    /// - `PINGDB_CACHE_TTL_MS` (default: 5000)
    /// - `PINGDB_FETCH_TIMEOUT_MS` (default: 5000)
    /// - `PINGDB_INVOCATION_TIMEOUT_MS` (default: 5000)
    /// - `PINGDB_BIND_ADDRESS` (default: "0.0.0.0:8080")
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let secret_source = match std::env::var("PINGDB_SECRET_BACKEND") {
            Ok(raw) => SecretSourceType::from_str(&raw).map_err(PingDbError::config)?,
            Err(_) => defaults.secret_source,
        };

        let config = Self {
            secret_id: std::env::var("PINGDB_SECRET_ID").unwrap_or(defaults.secret_id),
            secret_source,
            cache_ttl_ms: parse_env("PINGDB_CACHE_TTL_MS", defaults.cache_ttl_ms)?,
            fetch_timeout_ms: parse_env("PINGDB_FETCH_TIMEOUT_MS", defaults.fetch_timeout_ms)?,
            invocation_timeout_ms: parse_env(
                "PINGDB_INVOCATION_TIMEOUT_MS",
                defaults.invocation_timeout_ms,
            )?,
            bind_address: std::env::var("PINGDB_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            observability: ObservabilityConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(PingDbError::from)
    }

    /// Secret cache TTL as Duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Secret fetch timeout as Duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Invocation deadline as Duration
    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_millis(self.invocation_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Service name attached to startup logs
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false, service_name: "pingdb".to_string() }
    }
}

impl ObservabilityConfig {
    /// Load from `PINGDB_LOG_LEVEL`, `PINGDB_LOG_JSON` and `PINGDB_SERVICE_NAME`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            log_level: std::env::var("PINGDB_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logging: parse_env("PINGDB_LOG_JSON", defaults.json_logging)?,
            service_name: std::env::var("PINGDB_SERVICE_NAME").unwrap_or(defaults.service_name),
        })
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| PingDbError::config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.secret_id, "postgres-secret");
        assert_eq!(config.cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.invocation_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = AppConfig { cache_ttl_ms: 0, ..Default::default() };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PingDbError::Validation { .. }));
    }

    #[test]
    fn test_empty_secret_id_rejected() {
        let config = AppConfig { secret_id: String::new(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("PINGDB_CACHE_TTL_MS", "250");
        env::set_var("PINGDB_SECRET_BACKEND", "vault");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_millis(250));
        assert_eq!(config.secret_source, SecretSourceType::Vault);

        env::set_var("PINGDB_CACHE_TTL_MS", "soon");
        assert!(matches!(AppConfig::from_env().unwrap_err(), PingDbError::Config { .. }));

        env::remove_var("PINGDB_CACHE_TTL_MS");
        env::remove_var("PINGDB_SECRET_BACKEND");
    }
}
