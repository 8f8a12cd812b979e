//! # pingdb
//!
//! A database connectivity probe that reads its credential from a remote
//! secret store through a time-bounded, single-flight secret cache.
//!
//! ## Architecture
//!
//! ```text
//! trigger (CLI / HTTP) → ConnectivityProbe → SecretCache → SecretSource
//!                               ↓
//!                        DatabaseDriver → PostgreSQL
//! ```
//!
//! The cache is created once per process and shared by every invocation; the
//! database connection is opened and released by each invocation on its own.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pingdb::{config::AppConfig, startup::build_probe, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let probe = build_probe(&config).await?;
//!     match probe.run().await {
//!         Ok(message) => println!("{}", message),
//!         Err(e) => eprintln!("{}: {}", e.status(), e),
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod probe;
pub mod secrets;
pub mod startup;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{PingDbError, Result};
pub use probe::{ConnectivityProbe, ProbeError, SUCCESS_MESSAGE};
pub use secrets::SecretCache;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
