//! TTL secret cache with single-flight refresh.
//!
//! Sits in front of a [`SecretSource`] and keeps the last successfully fetched
//! payload for every secret identifier that has been requested:
//!
//! - An entry is fresh while `now - fetched_at < ttl`; fresh entries are served
//!   without contacting the source.
//! - A stale or absent entry triggers a refresh. At most one refresh per
//!   identifier is in flight; callers arriving while it runs join it and all
//!   observe the same value or the same error.
//! - A failed refresh leaves the previous entry untouched and is not cached, so
//!   the next caller starts a new fetch. Stale values are never served on error.
//! - Identifiers refresh independently of each other.
//!
//! Entries are never evicted. The probe only ever requests a handful of
//! well-known identifiers, so the map stays small.
//!
//! # Example
//!
//! ```rust,ignore
//! use pingdb::secrets::{SecretCache, StaticSecretSource};
//! use std::{sync::Arc, time::Duration};
//!
//! let source = Arc::new(StaticSecretSource::new().with_secret("postgres-secret", payload));
//! let cache = SecretCache::new(source, Duration::from_secs(5));
//!
//! // First call fetches from the source, the next five seconds are served from memory
//! let payload = cache.get("postgres-secret").await?;
//! ```

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::{Result, SecretsError};
use super::source::{SecretSource, SecretSourceType};
use super::types::SecretString;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

/// Default upper bound for a single fetch from the source.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

type RefreshOutcome = std::result::Result<SecretString, Arc<SecretsError>>;
type Refresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Last successfully fetched payload for one identifier.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: SecretString,
    fetched_at: Instant,
}

impl CacheEntry {
    fn new(value: SecretString) -> Self {
        Self { value, fetched_at: Instant::now() }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Per-identifier state: the cached entry plus the in-flight marker.
#[derive(Default)]
struct Slot {
    entry: Option<CacheEntry>,
    refresh: Option<Refresh>,
}

/// Process-wide secret cache.
///
/// Cloning is cheap and clones share the same entries, so one cache can be
/// handed to every concurrent invocation.
#[derive(Clone)]
pub struct SecretCache {
    source: Arc<dyn SecretSource>,
    slots: Arc<DashMap<String, Slot>>,
    ttl: Duration,
    fetch_timeout: Duration,
}

impl SecretCache {
    /// Create a cache over `source` whose entries stay fresh for `ttl`.
    pub fn new(source: Arc<dyn SecretSource>, ttl: Duration) -> Self {
        Self { source, slots: Arc::new(DashMap::new()), ttl, fetch_timeout: DEFAULT_FETCH_TIMEOUT }
    }

    /// Create a cache with the default TTL (5 seconds)
    pub fn with_default_ttl(source: Arc<dyn SecretSource>) -> Self {
        Self::new(source, DEFAULT_TTL)
    }

    /// Bound every fetch from the source. A fetch that exceeds the bound fails
    /// with [`SecretsError::Timeout`] and clears the in-flight marker, so a
    /// hung source cannot wedge later callers.
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Return the payload for `secret_id`, fetching it from the source when
    /// the cached entry is stale or absent.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::InvalidKey`] for an empty identifier (no fetch is made)
    /// - [`SecretsError::RefreshFailed`] when the refresh this call started or
    ///   joined failed; the wrapped source error is shared by all joiners
    pub async fn get(&self, secret_id: &str) -> Result<SecretString> {
        if secret_id.trim().is_empty() {
            return Err(SecretsError::invalid_key(secret_id, "secret identifier cannot be empty"));
        }

        let refresh = {
            let mut slot = self.slots.entry(secret_id.to_string()).or_default();

            if let Some(entry) = slot.entry.as_ref() {
                if entry.is_fresh(self.ttl) {
                    debug!(secret_id = %secret_id, "Cache hit for secret");
                    return Ok(entry.value.clone());
                }
                debug!(secret_id = %secret_id, "Cached secret expired");
            }

            // A completed refresh still parked in the slot belongs to a task
            // that never got to clear it (e.g. it panicked); start over.
            let joinable = slot.refresh.as_ref().filter(|r| r.peek().is_none()).cloned();
            match joinable {
                Some(in_flight) => {
                    debug!(secret_id = %secret_id, "Joining in-flight secret refresh");
                    in_flight
                }
                None => {
                    let refresh = self.start_refresh(secret_id);
                    slot.refresh = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await.map_err(|source| SecretsError::refresh_failed(secret_id, source))
    }

    /// Spawn the fetch so it completes (and updates the slot) even if every
    /// caller waiting on it gives up.
    fn start_refresh(&self, secret_id: &str) -> Refresh {
        let source = Arc::clone(&self.source);
        let slots = Arc::clone(&self.slots);
        let fetch_timeout = self.fetch_timeout;
        let secret_id = secret_id.to_string();

        let task = tokio::spawn(async move {
            debug!(
                secret_id = %secret_id,
                source = %source.source_type(),
                "Cache miss, fetching secret from source"
            );

            let outcome = match tokio::time::timeout(fetch_timeout, source.get_secret(&secret_id))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(SecretsError::timeout(
                    format!("fetch of secret '{}'", secret_id),
                    fetch_timeout,
                )),
            }
            .map_err(Arc::new);

            if let Some(mut slot) = slots.get_mut(&secret_id) {
                if let Ok(value) = &outcome {
                    slot.entry = Some(CacheEntry::new(value.clone()));
                }
                slot.refresh = None;
            }

            match &outcome {
                Ok(_) => debug!(secret_id = %secret_id, "Refreshed secret in cache"),
                Err(e) => warn!(secret_id = %secret_id, error = %e, "Secret refresh failed"),
            }
            outcome
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(Arc::new(SecretsError::internal(format!("secret refresh task failed: {}", e))))
            })
        }
        .boxed()
        .shared()
    }

    /// When the cached value for `secret_id` was last fetched successfully.
    pub fn fetched_at(&self, secret_id: &str) -> Option<Instant> {
        self.slots.get(secret_id).and_then(|slot| slot.entry.as_ref().map(|e| e.fetched_at))
    }

    /// Number of identifiers holding a cached value (fresh or stale).
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    /// Check if no value has been cached yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the TTL for this cache
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Type of the underlying source
    pub fn source_type(&self) -> SecretSourceType {
        self.source.source_type()
    }
}

impl fmt::Debug for SecretCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCache")
            .field("source", &self.source)
            .field("ttl", &self.ttl)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("entries", &self.len())
            .finish()
    }
}
