//! Verification key cache.
//!
//! The key is fetched from the secret store at most once per TTL. A failed
//! or empty fetch is never papered over with an older key: the credential
//! method fails closed and the other resolution methods carry on.

use crate::error::CredentialRejection;
use crate::secret::SecretStore;
use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default key lifetime in the cache.
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(300);

/// Default bound on a single secret-store fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(2);

struct CachedKey {
    key: Arc<DecodingKey>,
    fetched_at: Instant,
}

/// Caches the HMAC verification key fetched from a [`SecretStore`].
pub struct KeyCache {
    store: Arc<dyn SecretStore>,
    secret_name: String,
    ttl: Duration,
    fetch_timeout: Duration,
    cached: RwLock<Option<CachedKey>>,
}

impl KeyCache {
    pub fn new(store: Arc<dyn SecretStore>, secret_name: impl Into<String>) -> Self {
        Self {
            store,
            secret_name: secret_name.into(),
            ttl: DEFAULT_KEY_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cached: RwLock::new(None),
        }
    }

    /// Sets how long a fetched key is reused.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the bound on a single fetch.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Returns the current key, fetching it when the cached one has expired.
    pub async fn decoding_key(&self) -> Result<Arc<DecodingKey>, CredentialRejection> {
        if let Some(cached) = self.cached.read().as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.key));
            }
        }

        let fetched = tokio::time::timeout(self.fetch_timeout, self.store.get_secret(&self.secret_name)).await;
        let secret = match fetched {
            Ok(Ok(secret)) => secret,
            Ok(Err(err)) => {
                warn!(secret = %self.secret_name, error = %err, "verification key fetch failed");
                self.clear();
                return Err(CredentialRejection::KeyUnavailable);
            }
            Err(_) => {
                warn!(secret = %self.secret_name, "verification key fetch timed out");
                self.clear();
                return Err(CredentialRejection::KeyUnavailable);
            }
        };

        let secret = secret.trim();
        if secret.is_empty() {
            warn!(secret = %self.secret_name, "verification key is empty");
            self.clear();
            return Err(CredentialRejection::KeyUnavailable);
        }

        let key = Arc::new(DecodingKey::from_secret(secret.as_bytes()));
        *self.cached.write() = Some(CachedKey {
            key: Arc::clone(&key),
            fetched_at: Instant::now(),
        });
        debug!(secret = %self.secret_name, "verification key refreshed");
        Ok(key)
    }

    /// Drops the cached key so the next call fetches again.
    pub fn invalidate(&self) {
        self.clear();
    }

    fn clear(&self) {
        *self.cached.write() = None;
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("secret_name", &self.secret_name)
            .field("ttl", &self.ttl)
            .field("cached", &self.cached.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::StaticSecretStore;

    #[tokio::test]
    async fn test_key_is_cached_within_ttl() {
        let store = Arc::new(StaticSecretStore::with_secret("key", "s3cret"));
        let cache = KeyCache::new(store.clone(), "key");

        let first = cache.decoding_key().await.unwrap();
        store.remove("key");
        let second = cache.decoding_key().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_expired_key_is_refetched_and_failure_is_not_masked() {
        let store = Arc::new(StaticSecretStore::with_secret("key", "s3cret"));
        let cache = KeyCache::new(store.clone(), "key").with_ttl(Duration::ZERO);

        assert!(cache.decoding_key().await.is_ok());
        store.remove("key");
        assert_eq!(cache.decoding_key().await.err().unwrap(), CredentialRejection::KeyUnavailable);
    }

    #[tokio::test]
    async fn test_empty_secret_is_unavailable() {
        let store = Arc::new(StaticSecretStore::with_secret("key", "   "));
        let cache = KeyCache::new(store, "key");
        assert_eq!(cache.decoding_key().await.err().unwrap(), CredentialRejection::KeyUnavailable);
    }
}
