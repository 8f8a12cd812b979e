//! Process start-up wiring.
//!
//! Builds the long-lived pieces exactly once: the configured secret source,
//! the process-wide [`SecretCache`] in front of it, and the
//! [`ConnectivityProbe`] every invocation runs through.

use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::probe::{ConnectivityProbe, PostgresDriver};
use crate::secrets::{source_from_env, SecretCache};

/// Build the probe described by `config`, backed by PostgreSQL.
///
/// # Errors
///
/// Fails when the configured secret source cannot be constructed.
pub async fn build_probe(config: &AppConfig) -> Result<ConnectivityProbe> {
    let source = source_from_env(config.secret_source).await?;
    let cache = SecretCache::new(source, config.cache_ttl()).with_fetch_timeout(config.fetch_timeout());

    info!(
        secret_source = %cache.source_type(),
        ttl_ms = config.cache_ttl_ms,
        "Secret cache initialized"
    );

    Ok(ConnectivityProbe::new(cache, Arc::new(PostgresDriver::new()))
        .with_secret_id(config.secret_id.clone())
        .with_timeout(config.invocation_timeout()))
}
