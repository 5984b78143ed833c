//! # Registry Cache
//!
//! Owns the current [`TenantRegistry`] snapshot and refreshes it from a
//! [`MappingStore`] when it ages past its TTL.
//!
//! ## Failure Policy
//!
//! | Situation | Served snapshot |
//! |-----------|-----------------|
//! | Snapshot younger than TTL | cached snapshot, no store call |
//! | Refresh succeeds | new snapshot, swapped in whole |
//! | Refresh fails, previous snapshot younger than `max_stale` | previous snapshot |
//! | Refresh fails, no usable snapshot | empty snapshot flagged degraded |
//! | Within `retry_backoff` of a failed refresh | fallback, no store call |
//!
//! Malformed documents, and documents deleted between listing and fetching,
//! are skipped one by one. Any other store error or timeout on a listing or
//! fetch fails the whole refresh: a partially read store never becomes a
//! published snapshot.
//!
//! ## Concurrency
//!
//! The snapshot pointer lives behind a `parking_lot::RwLock` and is only
//! ever replaced, never mutated. Refreshes are single-flight: callers that
//! find the snapshot expired queue on an async mutex and re-check freshness
//! once they hold it. No lock is held across a store call.

use crate::models::{LoadReport, MappingDocument, RegistryError, Result, TenantHash};
use crate::snapshot::{SnapshotBuilder, TenantRegistry};
use crate::store::{MappingStore, DOCUMENT_SUFFIX};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Shortest allowed snapshot TTL.
pub const MIN_TTL: Duration = Duration::from_secs(300);

/// Longest allowed snapshot TTL.
pub const MAX_TTL: Duration = Duration::from_secs(600);

/// Settings for [`RegistryCache`].
#[derive(Debug, Clone)]
pub struct RegistryCacheConfig {
    /// Key prefix of mapping documents.
    pub prefix: String,
    /// Snapshot lifetime, clamped to `[MIN_TTL, MAX_TTL]`.
    pub ttl: Duration,
    /// Oldest snapshot that may be served while the store is failing.
    pub max_stale: Duration,
    /// Quiet period after a failed refresh.
    pub retry_backoff: Duration,
    /// Maximum documents read per refresh.
    pub max_documents: usize,
    /// Bound on each store call.
    pub store_timeout: Duration,
}

impl Default for RegistryCacheConfig {
    fn default() -> Self {
        Self {
            prefix: "mappings/".to_string(),
            ttl: MIN_TTL,
            max_stale: Duration::from_secs(3600),
            retry_backoff: Duration::from_secs(30),
            max_documents: 100,
            store_timeout: Duration::from_secs(2),
        }
    }
}

/// Result of [`RegistryCache::load_with_report`].
#[derive(Debug, Clone)]
pub struct RegistryLoad {
    /// Snapshot to use for this request.
    pub snapshot: Arc<TenantRegistry>,
    /// Present when this call attempted a store refresh.
    pub report: Option<LoadReport>,
}

#[derive(Default)]
struct CacheState {
    snapshot: Option<Arc<TenantRegistry>>,
    fetched_at: Option<Instant>,
    last_failure: Option<Instant>,
}

/// TTL cache over the tenant registry.
pub struct RegistryCache {
    store: Arc<dyn MappingStore>,
    config: RegistryCacheConfig,
    ttl: Duration,
    state: RwLock<CacheState>,
    refresh: tokio::sync::Mutex<()>,
}

impl RegistryCache {
    /// Creates a cache; nothing is loaded until the first [`load`](Self::load).
    pub fn new(store: Arc<dyn MappingStore>, config: RegistryCacheConfig) -> Self {
        let ttl = config.ttl.clamp(MIN_TTL, MAX_TTL);
        if ttl != config.ttl {
            warn!("Registry TTL {:?} outside [{:?}, {:?}], using {:?}", config.ttl, MIN_TTL, MAX_TTL, ttl);
        }
        Self {
            store,
            config,
            ttl,
            state: RwLock::new(CacheState::default()),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    /// Effective TTL after clamping.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the snapshot to use for a request.
    pub async fn load(&self) -> Arc<TenantRegistry> {
        self.load_with_report().await.snapshot
    }

    /// Returns the snapshot plus a report when a refresh was attempted.
    pub async fn load_with_report(&self) -> RegistryLoad {
        if let Some(snapshot) = self.fresh_snapshot(Instant::now()) {
            return RegistryLoad { snapshot, report: None };
        }

        let _guard = self.refresh.lock().await;

        let now = Instant::now();
        if let Some(snapshot) = self.fresh_snapshot(now) {
            return RegistryLoad { snapshot, report: None };
        }
        if self.in_backoff(now) {
            debug!("Registry refresh suppressed by backoff");
            let (snapshot, _) = self.fallback(now, "refresh backoff");
            return RegistryLoad { snapshot, report: None };
        }

        match self.fetch().await {
            Ok((registry, skipped)) => {
                let tenants = registry.tenant_count();
                let snapshot = Arc::new(registry);
                {
                    let mut state = self.state.write();
                    state.snapshot = Some(Arc::clone(&snapshot));
                    state.fetched_at = Some(Instant::now());
                    state.last_failure = None;
                }
                info!("Registry loaded: {} tenants, {} documents skipped", tenants, skipped);
                RegistryLoad {
                    snapshot,
                    report: Some(LoadReport::Loaded { tenants, skipped }),
                }
            }
            Err(err) => {
                self.state.write().last_failure = Some(Instant::now());
                let (snapshot, report) = self.fallback(Instant::now(), &err.to_string());
                RegistryLoad {
                    snapshot,
                    report: Some(report),
                }
            }
        }
    }

    /// Forces the next [`load`](Self::load) to refresh from the store.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.fetched_at = None;
        state.last_failure = None;
    }

    fn fresh_snapshot(&self, now: Instant) -> Option<Arc<TenantRegistry>> {
        let state = self.state.read();
        match (&state.snapshot, state.fetched_at) {
            (Some(snapshot), Some(at)) if now.saturating_duration_since(at) < self.ttl => {
                Some(Arc::clone(snapshot))
            }
            _ => None,
        }
    }

    fn in_backoff(&self, now: Instant) -> bool {
        self.state
            .read()
            .last_failure
            .is_some_and(|at| now.saturating_duration_since(at) < self.config.retry_backoff)
    }

    fn fallback(&self, now: Instant, error: &str) -> (Arc<TenantRegistry>, LoadReport) {
        let state = self.state.read();
        if let (Some(snapshot), Some(at)) = (&state.snapshot, state.fetched_at) {
            let age = now.saturating_duration_since(at);
            if age < self.config.max_stale {
                warn!("Registry refresh failed ({}), serving snapshot aged {:?}", error, age);
                return (
                    Arc::clone(snapshot),
                    LoadReport::ServedStale {
                        error: error.to_string(),
                        age,
                    },
                );
            }
        }
        warn!("Registry refresh failed ({}), serving degraded empty registry", error);
        (
            Arc::new(TenantRegistry::degraded(Utc::now())),
            LoadReport::Degraded {
                error: error.to_string(),
            },
        )
    }

    async fn fetch(&self) -> Result<(TenantRegistry, usize)> {
        let timeout = self.config.store_timeout;
        let prefix = self.config.prefix.as_str();

        let mut keys = tokio::time::timeout(timeout, self.store.list(prefix, self.config.max_documents))
            .await
            .map_err(|_| RegistryError::Timeout(timeout))??;
        keys.sort();
        keys.truncate(self.config.max_documents);

        let mut builder = SnapshotBuilder::new();
        let mut skipped = 0;
        for key in keys {
            let bytes = match tokio::time::timeout(timeout, self.store.get(&key)).await {
                Err(_) => return Err(RegistryError::Timeout(timeout)),
                Ok(Err(RegistryError::NotFound(key))) => {
                    warn!("Mapping document '{}' vanished between list and get, skipping", key);
                    skipped += 1;
                    continue;
                }
                Ok(result) => result?,
            };

            if let Err(err) = Self::ingest(&mut builder, prefix, &key, &bytes) {
                warn!("Skipping mapping document: {}", err);
                skipped += 1;
            }
        }
        Ok((builder.build(Utc::now()), skipped))
    }

    fn ingest(builder: &mut SnapshotBuilder, prefix: &str, key: &str, bytes: &[u8]) -> Result<()> {
        let malformed = |reason: String| RegistryError::MalformedDocument {
            key: key.to_string(),
            reason,
        };
        let stem = key
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(DOCUMENT_SUFFIX))
            .ok_or_else(|| malformed("unexpected key layout".to_string()))?;
        let hash = TenantHash::parse(stem).map_err(|err| malformed(err.to_string()))?;
        let doc: MappingDocument =
            serde_json::from_slice(bytes).map_err(|err| malformed(err.to_string()))?;
        builder.insert(hash, &doc)
    }
}
