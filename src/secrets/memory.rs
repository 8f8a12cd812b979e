//! In-memory secret source.
//!
//! Holds payloads in a map that can be updated at runtime with
//! [`StaticSecretSource::rotate`], which makes it useful for local runs and
//! for exercising rotation behaviour in tests without a remote store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::{Result, SecretsError};
use super::source::{SecretSource, SecretSourceType};
use super::types::SecretString;

/// In-memory secret source that counts how often it is queried.
#[derive(Debug, Default)]
pub struct StaticSecretSource {
    secrets: DashMap<String, SecretString>,
    fetches: AtomicUsize,
}

impl StaticSecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_secret(self, secret_id: impl Into<String>, payload: impl Into<SecretString>) -> Self {
        self.secrets.insert(secret_id.into(), payload.into());
        self
    }

    /// Replace the payload stored under `secret_id`.
    pub fn rotate(&self, secret_id: impl Into<String>, payload: impl Into<SecretString>) {
        self.secrets.insert(secret_id.into(), payload.into());
    }

    /// Number of `get_secret` calls served so far, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn get_secret(&self, secret_id: &str) -> Result<SecretString> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .get(secret_id)
            .map(|payload| payload.value().clone())
            .ok_or_else(|| SecretsError::not_found(secret_id))
    }

    fn source_type(&self) -> SecretSourceType {
        SecretSourceType::Static
    }
}
