//! # Observability Infrastructure
//!
//! Structured logging for the probe: an `EnvFilter`-driven `tracing`
//! subscriber with optional JSON output, and span helpers.

pub mod logging;

pub use logging::log_config_info;

use tracing_subscriber::{
    fmt,
    layer::{Layered, SubscriberExt},
    registry::Registry,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::ObservabilityConfig;
use crate::errors::{PingDbError, Result};

type FilteredRegistry = Layered<EnvFilter, Registry>;
type FormatLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Build the filter: `RUST_LOG` when set, otherwise the configured level for
/// this crate with noisy dependencies turned down.
fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "pingdb={},tower_http=info,sqlx=warn,hyper=info,aws_config=warn,aws_smithy_runtime=warn",
            config.log_level
        ))
    })
}

/// Assemble the subscriber without installing it.
fn build_subscriber(config: &ObservabilityConfig) -> Layered<FormatLayer, FilteredRegistry> {
    let format: FormatLayer = if config.json_logging {
        fmt::layer().with_target(false).with_ansi(false).json().boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry().with(env_filter(config)).with(format)
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    build_subscriber(config).try_init().map_err(|e| {
        PingDbError::config_with_source("Failed to initialise logging", Box::new(e))
    })?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        "Logging initialized"
    );
    Ok(())
}
