//! Secret retrieval for the connectivity probe.
//!
//! The probe never talks to a secret store directly. It goes through the
//! [`SecretCache`], which wraps a [`SecretSource`] with a TTL and coalesces
//! concurrent refreshes of the same identifier into a single remote call.
//!
//! # Supported Sources
//!
//! - **AWS Secrets Manager**: the store RDS writes generated credentials to (`aws` feature)
//! - **HashiCorp Vault**: KV v2 engine
//! - **Environment Variables**: development fallback using the `PINGDB_SECRET_*` prefix
//! - **Static**: in-memory map for local runs and tests
//!
//! # Example
//!
//! ```rust,ignore
//! use pingdb::secrets::{source_from_env, SecretCache, SecretSourceType};
//! use std::time::Duration;
//!
//! let source = source_from_env(SecretSourceType::Vault).await?;
//! let cache = SecretCache::new(source, Duration::from_secs(5));
//!
//! let payload = cache.get("postgres-secret").await?;
//! ```
//!
//! # Security Considerations
//!
//! - Payloads are carried as [`SecretString`] and never logged
//! - Cached payloads live in memory only and are zeroed on drop

#[cfg(feature = "aws")]
pub mod aws;
pub mod cache;
pub mod env;
pub mod error;
pub mod memory;
pub mod source;
pub mod types;
pub mod vault;

use std::sync::Arc;

// Re-export main types
#[cfg(feature = "aws")]
pub use aws::AwsSecretsManagerSource;
pub use cache::{SecretCache, DEFAULT_FETCH_TIMEOUT, DEFAULT_TTL};
pub use env::EnvSecretSource;
pub use error::{Result, SecretsError};
pub use memory::StaticSecretSource;
pub use source::{SecretSource, SecretSourceType};
pub use types::SecretString;
pub use vault::{VaultSecretSource, VaultSourceConfig};

/// Construct the configured source, reading its settings from the environment.
///
/// # Errors
///
/// Returns [`SecretsError::ConfigError`] when the source is not configured or
/// not compiled in.
pub async fn source_from_env(kind: SecretSourceType) -> Result<Arc<dyn SecretSource>> {
    match kind {
        SecretSourceType::Env => Ok(Arc::new(EnvSecretSource::new())),
        SecretSourceType::Vault => Ok(Arc::new(VaultSecretSource::from_env()?)),
        #[cfg(feature = "aws")]
        SecretSourceType::AwsSecretsManager => Ok(Arc::new(AwsSecretsManagerSource::from_env().await?)),
        #[cfg(not(feature = "aws"))]
        SecretSourceType::AwsSecretsManager => Err(SecretsError::config_error(
            "AWS Secrets Manager source requires building with the `aws` feature",
        )),
        SecretSourceType::Static => Err(SecretsError::config_error(
            "the static secret source can only be constructed in-process",
        )),
    }
}
