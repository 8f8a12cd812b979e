//! Environment variable secret source.
//!
//! Intended for **local development only**. Secrets are read from variables
//! with the `PINGDB_SECRET_` prefix; the identifier is upper-cased and `-` is
//! mapped to `_`:
//!
//! ```bash
//! export PINGDB_SECRET_POSTGRES_SECRET='{"password":"pw1","dbname":"tutorial"}'
//! ```
//!
//! The variable is re-read on every fetch, so editing it is picked up after
//! the cache TTL like a rotation in a real store would be.

use async_trait::async_trait;
use std::env;

use super::error::{Result, SecretsError};
use super::source::{SecretSource, SecretSourceType};
use super::types::SecretString;

/// Environment variable prefix for secrets.
const SECRET_PREFIX: &str = "PINGDB_SECRET_";

/// Environment variable secret source (development only).
#[derive(Debug, Clone, Default)]
pub struct EnvSecretSource {}

impl EnvSecretSource {
    /// Creates a new environment variable secret source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a secret identifier to the environment variable name.
    fn key_to_env_var(secret_id: &str) -> String {
        format!("{}{}", SECRET_PREFIX, secret_id.to_uppercase().replace(['-', '.', '/'], "_"))
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn get_secret(&self, secret_id: &str) -> Result<SecretString> {
        let env_var = Self::key_to_env_var(secret_id);

        env::var(&env_var).map(SecretString::new).map_err(|_| {
            SecretsError::not_found(format!(
                "Secret '{}' not found in environment (looking for {})",
                secret_id, env_var
            ))
        })
    }

    fn source_type(&self) -> SecretSourceType {
        SecretSourceType::Env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_to_env_var() {
        assert_eq!(
            EnvSecretSource::key_to_env_var("postgres-secret"),
            "PINGDB_SECRET_POSTGRES_SECRET"
        );
        assert_eq!(EnvSecretSource::key_to_env_var("rds/tutorial"), "PINGDB_SECRET_RDS_TUTORIAL");
    }

    #[tokio::test]
    async fn test_get_secret_not_found() {
        let source = EnvSecretSource::new();
        let result = source.get_secret("nonexistent-secret").await;
        assert!(matches!(result.unwrap_err(), SecretsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_secret_from_env() {
        env::set_var("PINGDB_SECRET_ENV_SOURCE_TEST", "payload");

        let source = EnvSecretSource::new();
        let value = source.get_secret("env-source-test").await.unwrap();
        assert_eq!(value.expose_secret(), "payload");

        env::remove_var("PINGDB_SECRET_ENV_SOURCE_TEST");
    }
}
