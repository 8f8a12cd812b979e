//! # Configuration Management
//!
//! Process-level settings come from `PINGDB_*` environment variables (a `.env`
//! file is loaded first by the binary). The database parameters the probe
//! needs are read separately on every invocation, see [`DatabaseEnv`].

pub mod database;
pub mod settings;

pub use database::{DatabaseEnv, MissingVariable, DB_HOST, DB_PORT, DB_USERNAME};
pub use settings::{AppConfig, ObservabilityConfig, DEFAULT_SECRET_ID};
