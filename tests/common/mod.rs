//! Common test utilities for all integration tests.
//!
//! Fakes for the two external dependencies of the probe: the remote secret
//! source and the database driver. Both count how often they are used.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pingdb::probe::{ConnectionString, DatabaseDriver, DatabaseHandle, DriverError};
use pingdb::secrets::{SecretSource, SecretSourceType, SecretString, SecretsError};
use pingdb::{ConnectivityProbe, SecretCache};

pub const SECRET_ID: &str = "postgres-secret";
pub const PAYLOAD: &str = r#"{"password":"pw1","dbname":"tutorial"}"#;

/// Secret source whose answer can be switched between a payload and a
/// failure. Every fetch optionally sleeps first.
#[derive(Debug)]
pub struct FakeSecretStore {
    calls: AtomicUsize,
    answer: Mutex<Option<String>>,
    latency: Duration,
}

impl FakeSecretStore {
    pub fn serving(payload: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            answer: Mutex::new(Some(payload.to_string())),
            latency: Duration::ZERO,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), answer: Mutex::new(None), latency: Duration::ZERO })
    }

    pub fn slow(payload: &str, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            answer: Mutex::new(Some(payload.to_string())),
            latency,
        })
    }

    pub fn serve(&self, payload: &str) {
        *self.answer.lock().unwrap() = Some(payload.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretSource for FakeSecretStore {
    async fn get_secret(&self, secret_id: &str) -> pingdb::secrets::Result<SecretString> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let answer = self.answer.lock().unwrap().clone();
        match answer {
            Some(payload) if secret_id == SECRET_ID => Ok(SecretString::new(payload)),
            Some(_) => Err(SecretsError::not_found(secret_id)),
            None => Err(SecretsError::connection_failed("secret store unavailable")),
        }
    }

    fn source_type(&self) -> SecretSourceType {
        SecretSourceType::Static
    }
}

/// Database driver that records every connection string it is handed and
/// answers pings according to `reachable`.
#[derive(Debug, Default)]
pub struct FakeDatabase {
    reachable: bool,
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
    passwords: Mutex<Vec<String>>,
}

impl FakeDatabase {
    pub fn reachable() -> Arc<Self> {
        Arc::new(Self { reachable: true, ..Default::default() })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self { reachable: false, ..Default::default() })
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn passwords(&self) -> Vec<String> {
        self.passwords.lock().unwrap().clone()
    }
}

impl DatabaseDriver for FakeDatabase {
    fn open(&self, dsn: &ConnectionString) -> Result<Box<dyn DatabaseHandle>, DriverError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let params = dsn.parameters().map_err(DriverError::invalid)?;
        if let Some(password) = params.get("password") {
            self.passwords.lock().unwrap().push(password.clone());
        }
        Ok(Box::new(FakeConnection { reachable: self.reachable, closes: Arc::clone(&self.closes) }))
    }
}

struct FakeConnection {
    reachable: bool,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl DatabaseHandle for FakeConnection {
    async fn ping(&mut self) -> Result<(), DriverError> {
        if self.reachable {
            Ok(())
        } else {
            Err(DriverError::Database(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))))
        }
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Environment with all three `DB_*` variables set.
pub fn full_env(name: &str) -> Option<String> {
    match name {
        "DB_HOST" => Some("tutorial.cluster.local".to_string()),
        "DB_PORT" => Some("5432".to_string()),
        "DB_USERNAME" => Some("postgres".to_string()),
        _ => None,
    }
}

/// Probe over `store` and `database` with a 5 second cache TTL.
pub fn probe(store: Arc<FakeSecretStore>, database: Arc<FakeDatabase>) -> ConnectivityProbe {
    let cache = SecretCache::new(store, Duration::from_secs(5));
    ConnectivityProbe::new(cache, database).with_env_lookup(full_env)
}
