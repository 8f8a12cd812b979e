//! Database driver seam.
//!
//! [`DatabaseDriver::open`] only validates the connection string and builds a
//! handle; nothing goes over the network until [`DatabaseHandle::ping`]. That
//! split lets the probe tell "can't even try" (bad parameters) apart from
//! "tried and failed" (unreachable server, rejected credentials).

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{ConnectOptions, Connection};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::connection::ConnectionString;

/// Errors raised by a database driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The connection string could not be turned into a handle.
    #[error("invalid connection string: {reason}")]
    InvalidConnectionString { reason: String },

    /// Connecting or the liveness round-trip failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The round-trip did not finish before the invocation deadline.
    #[error("database did not answer within {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

impl DriverError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConnectionString { reason: reason.into() }
    }
}

/// Opens database handles from connection strings.
pub trait DatabaseDriver: Send + Sync + fmt::Debug {
    /// Validate `dsn` and build an unconnected handle.
    ///
    /// # Errors
    ///
    /// [`DriverError::InvalidConnectionString`] for unparseable parameters.
    fn open(&self, dsn: &ConnectionString) -> Result<Box<dyn DatabaseHandle>, DriverError>;
}

/// One invocation's database handle. Dropping it releases any connection.
#[async_trait]
pub trait DatabaseHandle: Send {
    /// Connect if necessary and confirm the server answers.
    async fn ping(&mut self) -> Result<(), DriverError>;

    /// Gracefully close the underlying connection, if one was opened.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// PostgreSQL driver backed by sqlx.
#[derive(Debug, Clone, Default)]
pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }

    /// Translate libpq key/value parameters into sqlx options.
    pub fn connect_options(dsn: &ConnectionString) -> Result<PgConnectOptions, DriverError> {
        let params = dsn.parameters().map_err(DriverError::invalid)?;
        let required = |key: &str| {
            params
                .get(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| DriverError::invalid(format!("missing '{}' parameter", key)))
        };

        let port: u16 = required("port")?
            .parse()
            .map_err(|_| DriverError::invalid("port must be a number between 0 and 65535"))?;

        let ssl_mode = match params.get("sslmode") {
            Some(mode) => mode
                .parse::<PgSslMode>()
                .map_err(|_| DriverError::invalid(format!("unknown sslmode '{}'", mode)))?,
            None => PgSslMode::Prefer,
        };

        let mut options = PgConnectOptions::new_without_pgpass()
            .host(required("host")?)
            .port(port)
            .username(required("user")?)
            .database(required("dbname")?)
            .ssl_mode(ssl_mode);

        if let Some(password) = params.get("password") {
            options = options.password(password);
        }

        Ok(options.disable_statement_logging())
    }
}

impl DatabaseDriver for PostgresDriver {
    fn open(&self, dsn: &ConnectionString) -> Result<Box<dyn DatabaseHandle>, DriverError> {
        let options = Self::connect_options(dsn)?;
        debug!(connection = %dsn, "Built PostgreSQL connection options");
        Ok(Box::new(PostgresHandle { options, connection: None }))
    }
}

/// Lazily connected PostgreSQL handle.
struct PostgresHandle {
    options: PgConnectOptions,
    connection: Option<PgConnection>,
}

#[async_trait]
impl DatabaseHandle for PostgresHandle {
    async fn ping(&mut self) -> Result<(), DriverError> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => PgConnection::connect_with(&self.options).await?,
        };
        self.connection.insert(connection).ping().await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        if let Some(connection) = self.connection {
            connection.close().await?;
        }
        Ok(())
    }
}
