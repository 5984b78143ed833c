//! # Integration Tests for the Registry
//!
//! Exercises the full path from stored documents to request lookups.
//!
//! ## Test Categories
//!
//! 1. **Lookups**: request strings resolve through the same normalization
//!    as stored documents
//! 2. **Persistence**: sled-backed stores feed the cache
//! 3. **Replacement**: refreshes swap snapshots whole

use crate::cache::{RegistryCache, RegistryCacheConfig};
use crate::models::{MappingDocument, TenantHash};
use crate::normalize::{match_path_prefix, normalize_host, normalize_origin};
use crate::store::{MemoryMappingStore, SledMappingStore};
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn hash(raw: &str) -> TenantHash {
    TenantHash::parse(raw).unwrap()
}

fn doc(host: Option<&str>, origin: Option<&str>, path: Option<&str>) -> MappingDocument {
    MappingDocument {
        host: host.map(str::to_string),
        origin: origin.map(str::to_string),
        path: path.map(str::to_string),
        tenant_id: None,
    }
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[tokio::test]
async fn test_request_variants_hit_stored_keys() {
    let store = Arc::new(MemoryMappingStore::new());
    store
        .put_document(
            "mappings/",
            &hash("medical789hash"),
            &doc(
                Some("healthcare.ai"),
                Some("https://portal.healthcare.ai"),
                Some("/healthcare/portal"),
            ),
        )
        .unwrap();

    let cache = RegistryCache::new(store, RegistryCacheConfig::default());
    let registry = cache.load().await;
    let expected = hash("medical789hash");

    let host = normalize_host(Some("HEALTHCARE.ai:443"));
    assert_eq!(registry.lookup_host(&host), Some(&expected));

    let origin = normalize_origin(Some("https://Portal.Healthcare.AI/app"), true);
    assert_eq!(registry.lookup_origin(&origin), Some(&expected));

    let prefix = match_path_prefix(Some("/healthcare//portal/patient/1"), registry.path_prefixes()).unwrap();
    assert_eq!(prefix, "/healthcare/portal");
    assert_eq!(registry.lookup_path(&prefix), Some(&expected));
}

#[tokio::test]
async fn test_traversal_never_reaches_other_prefix() {
    let store = Arc::new(MemoryMappingStore::new());
    store
        .put_document("mappings/", &hash("tenantAAAAAA"), &doc(None, None, Some("/a")))
        .unwrap();
    store
        .put_document("mappings/", &hash("tenantBBBBBB"), &doc(None, None, Some("/b")))
        .unwrap();

    let cache = RegistryCache::new(store, RegistryCacheConfig::default());
    let registry = cache.load().await;

    assert!(match_path_prefix(Some("/a/../b/secret"), registry.path_prefixes()).is_none());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[tokio::test]
async fn test_sled_store_feeds_cache() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("mappings.db");

    {
        let store = SledMappingStore::open(&path).unwrap();
        store
            .put_document("mappings/", &hash("tenant456hash"), &doc(Some("other.example.com"), None, None))
            .unwrap();
        store.flush().unwrap();
    }

    let store = Arc::new(SledMappingStore::open(&path).unwrap());
    let cache = RegistryCache::new(store, RegistryCacheConfig::default());
    let registry = cache.load().await;

    assert_eq!(registry.lookup_host("other.example.com"), Some(&hash("tenant456hash")));
}

// =============================================================================
// Replacement Tests
// =============================================================================

#[tokio::test]
async fn test_refresh_replaces_snapshot_whole() {
    let store = Arc::new(MemoryMappingStore::new());
    store
        .put_document("mappings/", &hash("tenantAAAAAA"), &doc(Some("a.example.com"), None, None))
        .unwrap();

    let cache = RegistryCache::new(store.clone(), RegistryCacheConfig::default());
    let before = cache.load().await;

    store.remove("mappings/tenantAAAAAA.json");
    store
        .put_document("mappings/", &hash("tenantBBBBBB"), &doc(Some("b.example.com"), None, None))
        .unwrap();
    cache.invalidate();
    let after = cache.load().await;

    // The old snapshot is unchanged for anyone still holding it.
    assert!(before.lookup_host("a.example.com").is_some());
    assert!(before.lookup_host("b.example.com").is_none());

    assert!(after.lookup_host("a.example.com").is_none());
    assert!(after.lookup_host("b.example.com").is_some());
}

#[tokio::test]
async fn test_concurrent_loads_share_one_refresh() {
    let store = Arc::new(MemoryMappingStore::new());
    store
        .put_document("mappings/", &hash("tenantAAAAAA"), &doc(Some("a.example.com"), None, None))
        .unwrap();
    let cache = Arc::new(RegistryCache::new(store, RegistryCacheConfig::default()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.load_with_report().await })
        })
        .collect();

    let mut refreshes = 0;
    for handle in handles {
        if handle.await.unwrap().report.is_some() {
            refreshes += 1;
        }
    }
    assert_eq!(refreshes, 1);
}
