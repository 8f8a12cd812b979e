//! Secret source trait and types
//!
//! Defines the interface the [`SecretCache`](super::SecretCache) fetches
//! through. A source is the remote (or local) store that owns the secret; it
//! may be slow, rate-limited or unavailable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::Result;
use super::types::SecretString;

/// Type of secret source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSourceType {
    /// `PINGDB_SECRET_*` environment variables (development only)
    Env,
    /// In-memory map, used for local runs and tests
    Static,
    /// HashiCorp Vault KV v2
    Vault,
    /// AWS Secrets Manager
    AwsSecretsManager,
}

impl SecretSourceType {
    /// Get the configuration representation of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Static => "static",
            Self::Vault => "vault",
            Self::AwsSecretsManager => "aws_secrets_manager",
        }
    }
}

impl FromStr for SecretSourceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "env" => Ok(Self::Env),
            "static" => Ok(Self::Static),
            "vault" => Ok(Self::Vault),
            "aws" | "aws_secrets_manager" => Ok(Self::AwsSecretsManager),
            _ => Err(format!("Unknown secret source type: {}", s)),
        }
    }
}

impl fmt::Display for SecretSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for secret sources
///
/// Implementations must be Send + Sync; the cache shares one source across
/// every concurrent invocation in the process.
///
/// Implementations MUST NOT log secret values and MUST NOT retry internally;
/// retry policy belongs to the caller of the probe.
#[async_trait]
pub trait SecretSource: Send + Sync + fmt::Debug {
    /// Fetch the raw payload stored under `secret_id`.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotFound`](super::SecretsError::NotFound) if the secret doesn't exist
    /// - [`SecretsError::ConnectionFailed`](super::SecretsError::ConnectionFailed) if the source is unreachable
    /// - [`SecretsError::BackendError`](super::SecretsError::BackendError) for anything else the source reports
    async fn get_secret(&self, secret_id: &str) -> Result<SecretString>;

    /// Get the source type identifier
    fn source_type(&self) -> SecretSourceType;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_parse() {
        assert_eq!("env".parse::<SecretSourceType>().unwrap(), SecretSourceType::Env);
        assert_eq!("vault".parse::<SecretSourceType>().unwrap(), SecretSourceType::Vault);
        assert_eq!(
            "aws".parse::<SecretSourceType>().unwrap(),
            SecretSourceType::AwsSecretsManager
        );
        assert!("gcp".parse::<SecretSourceType>().is_err());
    }

    #[test]
    fn test_source_type_display() {
        assert_eq!(SecretSourceType::Env.to_string(), "env");
        assert_eq!(SecretSourceType::AwsSecretsManager.to_string(), "aws_secrets_manager");
    }
}
