//! AWS Secrets Manager source implementation
//!
//! Reads the `SecretString` of the current version via `GetSecretValue`. RDS
//! generated credentials are stored as a JSON document containing (among
//! others) `password` and `dbname`, which is exactly the payload the probe
//! decodes.
//!
//! ## Configuration
//!
//! - `PINGDB_AWS_REGION` or `AWS_REGION` - optional, falls back to the default provider chain
//! - Credentials come from the standard AWS provider chain (env, profile, IMDS, ECS/Lambda role)

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, ConfigLoader, Region};
use aws_sdk_secretsmanager::error::{DisplayErrorContext, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use aws_sdk_secretsmanager::Client;
use tracing::{debug, info};

use super::error::{Result, SecretsError};
use super::source::{SecretSource, SecretSourceType};
use super::types::SecretString;

/// AWS Secrets Manager secret source
#[derive(Debug, Clone)]
pub struct AwsSecretsManagerSource {
    client: Client,
}

impl AwsSecretsManagerSource {
    /// Build a client from the default AWS configuration chain.
    pub async fn from_env() -> Result<Self> {
        let region = std::env::var("PINGDB_AWS_REGION").or_else(|_| std::env::var("AWS_REGION")).ok();
        let sdk_config = config_loader(region).load().await;
        info!(
            region = ?sdk_config.region().map(|r| r.as_ref().to_string()),
            "Initialized AWS Secrets Manager secret source"
        );

        Ok(Self { client: Client::new(&sdk_config) })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// SDK configuration with retries disabled. The cache makes exactly one
/// `GetSecretValue` call per refresh; retrying is left to the caller.
fn config_loader(region: Option<String>) -> ConfigLoader {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).retry_config(RetryConfig::disabled());

    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader
}

fn map_sdk_error(secret_id: &str, err: SdkError<GetSecretValueError>) -> SecretsError {
    match &err {
        SdkError::ServiceError(service) => map_service_error(secret_id, service.err()),
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            SecretsError::connection_failed(format!("{}", DisplayErrorContext(&err)))
        }
        _ => SecretsError::backend_error(format!(
            "AWS Secrets Manager error for '{}': {}",
            secret_id,
            DisplayErrorContext(&err)
        )),
    }
}

fn map_service_error(secret_id: &str, err: &GetSecretValueError) -> SecretsError {
    match err {
        GetSecretValueError::ResourceNotFoundException(_) => SecretsError::not_found(secret_id),
        other => SecretsError::backend_error(format!(
            "AWS Secrets Manager error for '{}': {}",
            secret_id,
            DisplayErrorContext(other)
        )),
    }
}

#[async_trait]
impl SecretSource for AwsSecretsManagerSource {
    async fn get_secret(&self, secret_id: &str) -> Result<SecretString> {
        debug!(secret_id = %secret_id, "Getting secret from AWS Secrets Manager");

        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| map_sdk_error(secret_id, e))?;

        let value = response
            .secret_string()
            .ok_or_else(|| SecretsError::invalid_value("Secret has no string value"))?;

        Ok(SecretString::new(value))
    }

    fn source_type(&self) -> SecretSourceType {
        SecretSourceType::AwsSecretsManager
    }
}
