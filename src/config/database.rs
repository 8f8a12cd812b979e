//! Database connection parameters read from the invocation environment.
//!
//! These are re-read on every probe invocation rather than captured at
//! start-up, mirroring a function runtime that injects them per deployment.

use thiserror::Error;

/// Database host name or address
pub const DB_HOST: &str = "DB_HOST";
/// Database port
pub const DB_PORT: &str = "DB_PORT";
/// Database user name
pub const DB_USERNAME: &str = "DB_USERNAME";

/// A required variable was absent or empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required environment variable {variable} is not set")]
pub struct MissingVariable {
    pub variable: &'static str,
}

/// Host, port and user of the database to probe.
///
/// The port is kept verbatim; it is checked when the connection string is
/// turned into a connection handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEnv {
    pub host: String,
    pub port: String,
    pub username: String,
}

impl DatabaseEnv {
    /// Read `DB_HOST`, `DB_PORT` and `DB_USERNAME` through `lookup`, usually
    /// a view of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MissingVariable>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |variable: &'static str| {
            lookup(variable)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(MissingVariable { variable })
        };

        Ok(Self { host: required(DB_HOST)?, port: required(DB_PORT)?, username: required(DB_USERNAME)? })
    }
}
