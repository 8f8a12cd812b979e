//! # Structured Logging
//!
//! Span macros and startup logging built on the tracing ecosystem.

/// Create a tracing span for one probe invocation.
///
/// Every invocation gets a fresh `invocation_id` so concurrent invocations
/// sharing the process can be told apart in the logs. The `stage` field is
/// recorded as the invocation advances.
///
/// ```rust,ignore
/// let span = probe_span!("postgres-secret");
/// let span = probe_span!("postgres-secret", trigger = "http");
/// ```
#[macro_export]
macro_rules! probe_span {
    ($secret_id:expr) => {
        tracing::info_span!(
            "probe_invocation",
            secret_id = %$secret_id,
            invocation_id = %uuid::Uuid::new_v4(),
            stage = tracing::field::Empty
        )
    };
    ($secret_id:expr, $($field:tt)*) => {
        tracing::info_span!(
            "probe_invocation",
            secret_id = %$secret_id,
            invocation_id = %uuid::Uuid::new_v4(),
            stage = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        secret_id = %config.secret_id,
        secret_source = %config.secret_source,
        cache_ttl_ms = config.cache_ttl_ms,
        fetch_timeout_ms = config.fetch_timeout_ms,
        invocation_timeout_ms = config.invocation_timeout_ms,
        "pingdb configuration"
    );
}
