//! # Mapping Stores
//!
//! The registry reads tenant mapping documents through the [`MappingStore`]
//! trait. Two implementations ship with the crate:
//!
//! | Store | Backing | Use |
//! |-------|---------|-----|
//! | [`SledMappingStore`] | Sled embedded database | CLI and single-node deployments |
//! | [`MemoryMappingStore`] | `BTreeMap` behind a lock | tests, fault injection |
//!
//! ## Key Layout
//!
//! Documents live under `<prefix><tenant_hash>.json`, e.g.
//! `mappings/medical789hash.json`. Listing is lexicographic and bounded by a
//! caller-supplied limit so a huge store cannot blow up load cost.
//!
//! ## Security Notes
//!
//! - Store implementations must not interpret document contents; parsing
//!   and validation happen in the registry cache.
//! - The sled database file should be readable only by the gate process.

use crate::models::{MappingDocument, RegistryError, Result, TenantHash};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;

/// Suffix of every mapping document key.
pub const DOCUMENT_SUFFIX: &str = ".json";

/// Builds the store key for a tenant's mapping document.
#[must_use]
pub fn document_key(prefix: &str, hash: &TenantHash) -> String {
    format!("{prefix}{hash}{DOCUMENT_SUFFIX}")
}

/// Read access to tenant mapping documents.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Lists up to `limit` keys starting with `prefix`, in key order.
    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;

    /// Fetches the raw bytes of one document.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// In-memory mapping store.
///
/// Supports simulating an outage with [`set_available`](Self::set_available).
#[derive(Debug, Default)]
pub struct MemoryMappingStore {
    documents: RwLock<BTreeMap<String, Vec<u8>>>,
    unavailable: RwLock<bool>,
}

impl MemoryMappingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw bytes under a key.
    pub fn put_raw(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.documents.write().insert(key.into(), bytes.into());
    }

    /// Serializes and stores a mapping document for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Serialization`] if the document cannot be
    /// encoded.
    pub fn put_document(&self, prefix: &str, hash: &TenantHash, doc: &MappingDocument) -> Result<()> {
        let bytes = serde_json::to_vec(doc)?;
        self.put_raw(document_key(prefix, hash), bytes);
        Ok(())
    }

    /// Removes a document.
    pub fn remove(&self, key: &str) {
        self.documents.write().remove(key);
    }

    /// Toggles simulated availability.
    pub fn set_available(&self, available: bool) {
        *self.unavailable.write() = !available;
    }

    fn check_available(&self) -> Result<()> {
        if *self.unavailable.read() {
            Err(RegistryError::Store("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        self.check_available()?;
        Ok(self
            .documents
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.check_available()?;
        self.documents
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }
}

/// Tree name for mapping documents.
const MAPPING_TREE: &str = "mappings";

/// Sled-backed mapping store.
///
/// # Example
///
/// ```rust
/// use gate_registry::store::SledMappingStore;
/// use gate_registry::{MappingDocument, TenantHash};
///
/// let store = SledMappingStore::temporary().unwrap();
/// let hash = TenantHash::parse("medical789hash").unwrap();
/// store
///     .put_document("mappings/", &hash, &MappingDocument {
///         host: Some("healthcare.ai".into()),
///         ..Default::default()
///     })
///     .unwrap();
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Clone)]
pub struct SledMappingStore {
    db: sled::Db,
    mappings: sled::Tree,
}

impl SledMappingStore {
    /// Opens or creates a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Database`] if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let mappings = db.open_tree(MAPPING_TREE)?;
        Ok(Self { db, mappings })
    }

    /// Creates a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Database`] if sled fails to initialize.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let mappings = db.open_tree(MAPPING_TREE)?;
        Ok(Self { db, mappings })
    }

    /// Serializes and stores a mapping document, overwriting any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database write fails.
    pub fn put_document(&self, prefix: &str, hash: &TenantHash, doc: &MappingDocument) -> Result<()> {
        let bytes = serde_json::to_vec(doc)?;
        self.mappings.insert(document_key(prefix, hash).as_bytes(), bytes)?;
        Ok(())
    }

    /// Removes a tenant's mapping document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Database`] if the delete fails.
    pub fn remove_document(&self, prefix: &str, hash: &TenantHash) -> Result<bool> {
        Ok(self
            .mappings
            .remove(document_key(prefix, hash).as_bytes())?
            .is_some())
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns true if no documents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Flushes pending writes to disk.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Database`] if the flush fails.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// Sled reads block, so each call runs on the blocking pool. A caller's
/// timeout then bounds the wait even when a scan is slow; the scan itself
/// finishes in the background.
#[async_trait]
impl MappingStore for SledMappingStore {
    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let tree = self.mappings.clone();
        let prefix = prefix.to_string();
        run_blocking(move || {
            let mut keys = Vec::new();
            for entry in tree.scan_prefix(prefix.as_bytes()).keys().take(limit) {
                let key = entry?;
                match std::str::from_utf8(&key) {
                    Ok(key) => keys.push(key.to_string()),
                    Err(_) => continue,
                }
            }
            Ok(keys)
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let tree = self.mappings.clone();
        let key = key.to_string();
        run_blocking(move || {
            tree.get(key.as_bytes())?
                .map(|bytes| bytes.to_vec())
                .ok_or(RegistryError::NotFound(key))
        })
        .await
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| RegistryError::Store(format!("store task failed: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(raw: &str) -> TenantHash {
        TenantHash::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_list_is_prefixed_and_bounded() {
        let store = MemoryMappingStore::new();
        store.put_raw("mappings/aaaaaaaaaa.json", "{}");
        store.put_raw("mappings/bbbbbbbbbb.json", "{}");
        store.put_raw("mappings/cccccccccc.json", "{}");
        store.put_raw("other/dddddddddd.json", "{}");

        let keys = store.list("mappings/", 2).await.unwrap();
        assert_eq!(keys, vec!["mappings/aaaaaaaaaa.json", "mappings/bbbbbbbbbb.json"]);
    }

    #[tokio::test]
    async fn test_memory_store_outage() {
        let store = MemoryMappingStore::new();
        store.set_available(false);
        assert!(store.list("mappings/", 10).await.is_err());
        store.set_available(true);
        assert!(store.list("mappings/", 10).await.is_ok());
    }

    #[tokio::test]
    async fn test_sled_store_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SledMappingStore::open(dir.path().join("mappings.db")).unwrap();
        let tenant = hash("medical789hash");
        let doc = MappingDocument {
            host: Some("healthcare.ai".into()),
            ..Default::default()
        };
        store.put_document("mappings/", &tenant, &doc).unwrap();

        let keys = store.list("mappings/", 100).await.unwrap();
        assert_eq!(keys, vec!["mappings/medical789hash.json"]);

        let bytes = store.get(&keys[0]).await.unwrap();
        let loaded: MappingDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(loaded, doc);

        assert!(store.remove_document("mappings/", &tenant).unwrap());
        assert!(store.is_empty());
        assert!(matches!(store.get(&keys[0]).await, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sled_reads_run_off_the_runtime_thread() {
        let store = SledMappingStore::temporary().unwrap();
        for idx in 0..20 {
            store
                .put_document(
                    "mappings/",
                    &hash(&format!("tenant{idx:04}hash")),
                    &MappingDocument::default(),
                )
                .unwrap();
        }

        // Single-threaded runtime: the timer still runs while sled works.
        let keys = tokio::time::timeout(std::time::Duration::from_secs(5), store.list("mappings/", 10))
            .await
            .expect("list should finish")
            .unwrap();
        assert_eq!(keys.len(), 10);

        let missing = store.get("mappings/zzzzgonehash.json").await;
        assert!(matches!(missing, Err(RegistryError::NotFound(key)) if key == "mappings/zzzzgonehash.json"));
    }
}
