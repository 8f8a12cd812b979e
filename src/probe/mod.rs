//! # Connectivity Probe
//!
//! One invocation walks a fixed, linear sequence of stages:
//!
//! ```text
//! Init -> SecretFetched -> ConnectionOpened -> Pinged
//! ```
//!
//! 1. read `DB_HOST`, `DB_PORT` and `DB_USERNAME`
//! 2. get the credential secret through the shared [`SecretCache`]
//! 3. decode it into a [`Credential`]
//! 4. render the connection string and open a handle
//! 5. ping the database
//! 6. release the handle, whatever happened in step 5
//!
//! Every step has its own [`ProbeError`] variant so callers can tell which one
//! failed. Nothing is retried and nothing survives the invocation except what
//! the cache keeps.

pub mod connection;
pub mod credential;
pub mod driver;

pub use connection::ConnectionString;
pub use credential::{Credential, CredentialError};
pub use driver::{DatabaseDriver, DatabaseHandle, DriverError, PostgresDriver};

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn, Instrument, Span};

use crate::config::{DatabaseEnv, MissingVariable, DEFAULT_SECRET_ID};
use crate::secrets::{SecretCache, SecretsError};

/// Status reported by a successful invocation.
pub const SUCCESS_MESSAGE: &str = "Successfully connected!";

/// Default deadline for a whole invocation.
pub const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Stages of an invocation, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStage {
    Init,
    SecretFetched,
    ConnectionOpened,
    Pinged,
}

impl ProbeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::SecretFetched => "secret_fetched",
            Self::ConnectionOpened => "connection_opened",
            Self::Pinged => "pinged",
        }
    }
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an invocation failed. One variant per failure point.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A required environment variable is missing.
    #[error("missing configuration: {source}")]
    Configuration {
        #[from]
        source: MissingVariable,
    },

    /// The secret could not be fetched, or the fetch missed the deadline.
    #[error("can't get secret '{secret_id}': {source}")]
    SecretFetch {
        secret_id: String,
        #[source]
        source: SecretsError,
    },

    /// The secret payload is not a usable credential.
    #[error("can't parse secret '{secret_id}': {source}")]
    SecretDecode {
        secret_id: String,
        #[source]
        source: CredentialError,
    },

    /// No handle could be built from the connection string.
    #[error("can't open db: {source}")]
    Connection {
        #[source]
        source: DriverError,
    },

    /// The handle was built but the database did not answer.
    #[error("can't ping db: {source}")]
    Ping {
        #[source]
        source: DriverError,
    },
}

impl ProbeError {
    /// Short description of the failed step.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "missing configuration",
            Self::SecretFetch { .. } => "can't get secret",
            Self::SecretDecode { .. } => "can't parse secret",
            Self::Connection { .. } => "can't open db",
            Self::Ping { .. } => "can't ping db",
        }
    }

    /// Last stage the invocation reached before failing.
    pub fn stage(&self) -> ProbeStage {
        match self {
            Self::Configuration { .. } | Self::SecretFetch { .. } => ProbeStage::Init,
            Self::SecretDecode { .. } | Self::Connection { .. } => ProbeStage::SecretFetched,
            Self::Ping { .. } => ProbeStage::ConnectionOpened,
        }
    }
}

/// Serializable outcome of one invocation, as reported to triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    pub status: String,
    pub stage: ProbeStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvocationResult {
    pub fn from_outcome(outcome: &Result<&'static str, ProbeError>) -> Self {
        match outcome {
            Ok(message) => {
                Self { status: (*message).to_string(), stage: ProbeStage::Pinged, error: None }
            }
            Err(e) => Self {
                status: e.status().to_string(),
                stage: e.stage(),
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Short-lived connectivity check against the configured database.
///
/// The probe itself holds no per-invocation state; concurrent calls to
/// [`ConnectivityProbe::run`] share only the secret cache.
#[derive(Clone)]
pub struct ConnectivityProbe {
    cache: SecretCache,
    driver: Arc<dyn DatabaseDriver>,
    secret_id: String,
    timeout: Duration,
    env: EnvLookup,
}

impl ConnectivityProbe {
    /// Create a probe reading the process environment, requesting
    /// `postgres-secret` with a 5 second deadline.
    pub fn new(cache: SecretCache, driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            cache,
            driver,
            secret_id: DEFAULT_SECRET_ID.to_string(),
            timeout: DEFAULT_INVOCATION_TIMEOUT,
            env: Arc::new(|name: &str| std::env::var(name).ok()),
        }
    }

    pub fn with_secret_id(mut self, secret_id: impl Into<String>) -> Self {
        self.secret_id = secret_id.into();
        self
    }

    /// Deadline applied to each invocation as a whole.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the process environment as the source of `DB_*` variables.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    pub fn cache(&self) -> &SecretCache {
        &self.cache
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one invocation from `Init`.
    ///
    /// # Errors
    ///
    /// The [`ProbeError`] variant of the first step that failed. A missed
    /// deadline is reported by the step that was running.
    pub async fn run(&self) -> Result<&'static str, ProbeError> {
        let span = crate::probe_span!(self.secret_id);
        let outcome = self.invoke().instrument(span.clone()).await;

        let _enter = span.enter();
        match &outcome {
            Ok(message) => info!(status = %message, "Probe invocation succeeded"),
            Err(e) => warn!(status = e.status(), stage = %e.stage(), error = %e, "Probe invocation failed"),
        }
        outcome
    }

    async fn invoke(&self) -> Result<&'static str, ProbeError> {
        let deadline = Instant::now() + self.timeout;
        let span = Span::current();
        span.record("stage", ProbeStage::Init.as_str());

        let env = DatabaseEnv::from_lookup(|name| (self.env)(name))?;

        let payload = timeout_at(deadline, self.cache.get(&self.secret_id))
            .await
            .unwrap_or_else(|_| Err(SecretsError::timeout("secret fetch", self.timeout)))
            .map_err(|source| ProbeError::SecretFetch { secret_id: self.secret_id.clone(), source })?;
        span.record("stage", ProbeStage::SecretFetched.as_str());

        let credential = Credential::decode(&payload).map_err(|source| {
            ProbeError::SecretDecode { secret_id: self.secret_id.clone(), source }
        })?;

        let dsn = ConnectionString::new(&env, &credential);
        let mut handle =
            self.driver.open(&dsn).map_err(|source| ProbeError::Connection { source })?;
        span.record("stage", ProbeStage::ConnectionOpened.as_str());
        debug!(connection = %dsn, "Opened database handle");

        let pinged = timeout_at(deadline, handle.ping()).await.unwrap_or_else(|_| {
            Err(DriverError::Timeout {
                duration_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })
        });

        // The handle is released on both paths; a failed close does not change
        // the outcome.
        match timeout_at(deadline, handle.close()).await {
            Ok(Ok(())) => debug!("Released database handle"),
            Ok(Err(e)) => warn!(error = %e, "Failed to close database handle"),
            Err(_) => warn!("Timed out closing database handle, dropping it"),
        }

        pinged.map_err(|source| ProbeError::Ping { source })?;
        span.record("stage", ProbeStage::Pinged.as_str());
        Ok(SUCCESS_MESSAGE)
    }
}

impl fmt::Debug for ConnectivityProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityProbe")
            .field("cache", &self.cache)
            .field("driver", &self.driver)
            .field("secret_id", &self.secret_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{SecretSource, SecretSourceType, SecretString, StaticSecretSource};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAYLOAD: &str = r#"{"password":"pw1","dbname":"tutorial"}"#;

    #[derive(Debug, Clone, Copy)]
    enum PingBehaviour {
        Answer,
        Refuse,
        Hang,
    }

    #[derive(Debug)]
    struct FakeDriver {
        ping: PingBehaviour,
        opens: AtomicUsize,
        closes: Arc<AtomicUsize>,
    }

    impl FakeDriver {
        fn new(ping: PingBehaviour) -> Arc<Self> {
            Arc::new(Self { ping, opens: AtomicUsize::new(0), closes: Arc::new(AtomicUsize::new(0)) })
        }
    }

    impl DatabaseDriver for FakeDriver {
        fn open(&self, dsn: &ConnectionString) -> Result<Box<dyn DatabaseHandle>, DriverError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            PostgresDriver::connect_options(dsn)?;
            Ok(Box::new(FakeHandle { ping: self.ping, closes: Arc::clone(&self.closes) }))
        }
    }

    struct FakeHandle {
        ping: PingBehaviour,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DatabaseHandle for FakeHandle {
        async fn ping(&mut self) -> Result<(), DriverError> {
            match self.ping {
                PingBehaviour::Answer => Ok(()),
                PingBehaviour::Refuse => Err(DriverError::Database(sqlx::Error::PoolTimedOut)),
                PingBehaviour::Hang => std::future::pending().await,
            }
        }

        async fn close(self: Box<Self>) -> Result<(), DriverError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct HungSource;

    #[async_trait]
    impl SecretSource for HungSource {
        async fn get_secret(&self, _secret_id: &str) -> crate::secrets::Result<SecretString> {
            std::future::pending().await
        }

        fn source_type(&self) -> SecretSourceType {
            SecretSourceType::Static
        }
    }

    fn db_env(name: &str) -> Option<String> {
        match name {
            "DB_HOST" => Some("127.0.0.1".to_string()),
            "DB_PORT" => Some("5432".to_string()),
            "DB_USERNAME" => Some("postgres".to_string()),
            _ => None,
        }
    }

    fn probe(source: Arc<dyn SecretSource>, driver: Arc<FakeDriver>) -> ConnectivityProbe {
        ConnectivityProbe::new(SecretCache::with_default_ttl(source), driver).with_env_lookup(db_env)
    }

    fn static_source(payload: &str) -> Arc<StaticSecretSource> {
        Arc::new(StaticSecretSource::new().with_secret(DEFAULT_SECRET_ID, payload))
    }

    #[tokio::test]
    async fn test_success() {
        let driver = FakeDriver::new(PingBehaviour::Answer);
        let probe = probe(static_source(PAYLOAD), driver.clone());

        assert_eq!(probe.run().await.unwrap(), SUCCESS_MESSAGE);
        assert_eq!(driver.opens.load(Ordering::SeqCst), 1);
        assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_port_is_configuration_error() {
        let source = static_source(PAYLOAD);
        let driver = FakeDriver::new(PingBehaviour::Answer);
        let probe = probe(source.clone(), driver)
            .with_env_lookup(|name| if name == "DB_PORT" { None } else { db_env(name) });

        let err = probe.run().await.unwrap_err();
        assert!(matches!(err, ProbeError::Configuration { source } if source.variable == "DB_PORT"));
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_secret_is_fetch_error() {
        let driver = FakeDriver::new(PingBehaviour::Answer);
        let probe = probe(Arc::new(StaticSecretSource::new()), driver.clone());

        let err = probe.run().await.unwrap_err();
        assert_eq!(err.status(), "can't get secret");
        assert_eq!(err.stage(), ProbeStage::Init);
        match &err {
            ProbeError::SecretFetch { source, .. } => {
                assert!(matches!(source.root(), SecretsError::NotFound { .. }))
            }
            other => panic!("expected SecretFetch, got {:?}", other),
        }
        assert_eq!(driver.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_port_is_connection_error() {
        let driver = FakeDriver::new(PingBehaviour::Answer);
        let probe = probe(static_source(PAYLOAD), driver.clone())
            .with_env_lookup(|name| if name == "DB_PORT" { Some("five".into()) } else { db_env(name) });

        let err = probe.run().await.unwrap_err();
        assert!(matches!(err, ProbeError::Connection { .. }));
        assert_eq!(err.status(), "can't open db");
        assert_eq!(driver.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refused_ping_still_releases_handle() {
        let driver = FakeDriver::new(PingBehaviour::Refuse);
        let probe = probe(static_source(PAYLOAD), driver.clone());

        let err = probe.run().await.unwrap_err();
        assert!(matches!(err, ProbeError::Ping { .. }));
        assert_eq!(err.stage(), ProbeStage::ConnectionOpened);
        assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_ping_respects_deadline() {
        let driver = FakeDriver::new(PingBehaviour::Hang);
        let probe = probe(static_source(PAYLOAD), driver.clone()).with_timeout(Duration::from_secs(2));

        let err = probe.run().await.unwrap_err();
        assert!(matches!(err, ProbeError::Ping { source: DriverError::Timeout { duration_ms: 2000 } }));
        assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_secret_source_respects_deadline() {
        let driver = FakeDriver::new(PingBehaviour::Answer);
        let probe = probe(Arc::new(HungSource), driver.clone()).with_timeout(Duration::from_secs(1));

        let err = probe.run().await.unwrap_err();
        assert!(matches!(err, ProbeError::SecretFetch { source: SecretsError::Timeout { .. }, .. }));
        assert_eq!(driver.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invocation_result_shapes() {
        let driver = FakeDriver::new(PingBehaviour::Answer);
        let ok = InvocationResult::from_outcome(&probe(static_source(PAYLOAD), driver.clone()).run().await);
        assert!(ok.is_success());
        assert_eq!(ok.status, SUCCESS_MESSAGE);
        assert_eq!(ok.stage, ProbeStage::Pinged);

        let failed =
            InvocationResult::from_outcome(&probe(static_source("not json"), driver).run().await);
        assert!(!failed.is_success());
        assert_eq!(failed.status, "can't parse secret");
        assert_eq!(failed.stage, ProbeStage::SecretFetched);

        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["stage"], "secret_fetched");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_password_never_logged() {
        let driver = FakeDriver::new(PingBehaviour::Answer);
        probe(static_source(PAYLOAD), driver).run().await.unwrap();

        assert!(logs_contain("Probe invocation succeeded"));
        assert!(logs_contain("password=***"));
        assert!(!logs_contain("pw1"));
    }

    #[tokio::test]
    async fn test_error_does_not_leak_password() {
        let driver = FakeDriver::new(PingBehaviour::Refuse);
        let err = probe(static_source(PAYLOAD), driver).run().await.unwrap_err();
        assert!(!err.to_string().contains("pw1"));
        assert!(!format!("{:?}", err).contains("pw1"));
    }
}
