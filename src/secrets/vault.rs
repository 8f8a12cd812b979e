//! Vault secret source implementation
//!
//! Fetches secrets from the HashiCorp Vault KV v2 engine. The identifier is the
//! path within the KV mount and the stored key/value map is handed to the cache
//! re-serialized as a JSON object, so a secret written as
//!
//! ```bash
//! vault kv put secret/postgres-secret password=pw1 dbname=tutorial
//! ```
//!
//! decodes exactly like the payload returned by AWS Secrets Manager.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use super::error::{Result, SecretsError};
use super::source::{SecretSource, SecretSourceType};
use super::types::SecretString;

/// Configuration for the Vault source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSourceConfig {
    /// Vault server address
    pub address: String,
    /// Vault authentication token
    pub token: Option<String>,
    /// Vault namespace (for Enterprise)
    pub namespace: Option<String>,
    /// KV v2 mount path (default: "secret")
    #[serde(default = "default_kv_mount")]
    pub kv_mount_path: String,
}

fn default_kv_mount() -> String {
    "secret".to_string()
}

impl VaultSourceConfig {
    /// Load configuration from environment variables
    ///
    /// Uses:
    /// - `PINGDB_VAULT_ADDR` or `VAULT_ADDR`
    /// - `PINGDB_VAULT_TOKEN` or `VAULT_TOKEN`
    /// - `PINGDB_VAULT_NAMESPACE` or `VAULT_NAMESPACE`
    /// - `PINGDB_VAULT_KV_MOUNT` (default: "secret")
    ///
    /// Returns `Ok(None)` if no address is configured.
    pub fn from_env() -> Result<Option<Self>> {
        let address =
            std::env::var("PINGDB_VAULT_ADDR").or_else(|_| std::env::var("VAULT_ADDR")).ok();

        let Some(address) = address else {
            return Ok(None);
        };

        let token =
            std::env::var("PINGDB_VAULT_TOKEN").or_else(|_| std::env::var("VAULT_TOKEN")).ok();

        let namespace = std::env::var("PINGDB_VAULT_NAMESPACE")
            .or_else(|_| std::env::var("VAULT_NAMESPACE"))
            .ok();

        let kv_mount_path =
            std::env::var("PINGDB_VAULT_KV_MOUNT").unwrap_or_else(|_| default_kv_mount());

        Ok(Some(Self { address, token, namespace, kv_mount_path }))
    }
}

/// HashiCorp Vault secret source
pub struct VaultSecretSource {
    client: VaultClient,
    kv_mount_path: String,
}

impl std::fmt::Debug for VaultSecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretSource")
            .field("kv_mount_path", &self.kv_mount_path)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultSecretSource {
    /// Create a new Vault source with the given configuration
    pub fn new(config: VaultSourceConfig) -> Result<Self> {
        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        if let Some(ref token) = config.token {
            settings_builder.token(token);
        }

        if let Some(ref namespace) = config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            SecretsError::config_error(format!("Invalid Vault source configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            SecretsError::config_error(format!("Failed to create Vault client: {}", e))
        })?;

        info!(address = %config.address, kv_mount = %config.kv_mount_path, "Initialized Vault secret source");

        Ok(Self { client, kv_mount_path: config.kv_mount_path })
    }

    /// Create the source from environment configuration
    pub fn from_env() -> Result<Self> {
        match VaultSourceConfig::from_env()? {
            Some(config) => Self::new(config),
            None => Err(SecretsError::config_error(
                "Vault secret source selected but PINGDB_VAULT_ADDR / VAULT_ADDR is not set",
            )),
        }
    }
}

/// Map a Vault client failure onto the source error taxonomy.
fn map_client_error(secret_id: &str, err: ClientError) -> SecretsError {
    match err {
        ClientError::APIError { code: 404, .. } => SecretsError::not_found(secret_id),
        ClientError::APIError { code: 401 | 403, .. } => {
            SecretsError::authentication_failed(format!("Vault denied access to '{}'", secret_id))
        }
        other => SecretsError::backend_error(format!("Vault read of '{}' failed: {}", secret_id, other)),
    }
}

#[async_trait]
impl SecretSource for VaultSecretSource {
    async fn get_secret(&self, secret_id: &str) -> Result<SecretString> {
        debug!(secret_id = %secret_id, kv_mount = %self.kv_mount_path, "Fetching secret from Vault");

        let data: HashMap<String, serde_json::Value> =
            kv2::read(&self.client, &self.kv_mount_path, secret_id).await.map_err(|e| {
                error!(secret_id = %secret_id, error = %e, "Failed to fetch secret from Vault");
                map_client_error(secret_id, e)
            })?;

        Ok(SecretString::new(serde_json::to_string(&data)?))
    }

    fn source_type(&self) -> SecretSourceType {
        SecretSourceType::Vault
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_source_config_default_mount() {
        let config: VaultSourceConfig =
            serde_json::from_str(r#"{"address":"http://localhost:8200","token":null,"namespace":null}"#)
                .unwrap();
        assert_eq!(config.kv_mount_path, "secret");
    }

    #[test]
    fn test_not_found_mapping() {
        let err = map_client_error(
            "postgres-secret",
            ClientError::APIError { code: 404, errors: vec![] },
        );
        assert!(matches!(err, SecretsError::NotFound { .. }));

        let err = map_client_error(
            "postgres-secret",
            ClientError::APIError { code: 403, errors: vec!["permission denied".to_string()] },
        );
        assert!(matches!(err, SecretsError::AuthenticationFailed { .. }));
    }

    #[tokio::test]
    async fn test_source_type() {
        let source = VaultSecretSource::new(VaultSourceConfig {
            address: "http://127.0.0.1:8200".to_string(),
            token: Some("dev-token".to_string()),
            namespace: None,
            kv_mount_path: default_kv_mount(),
        })
        .unwrap();
        assert_eq!(source.source_type(), SecretSourceType::Vault);
    }
}
