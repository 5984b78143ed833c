//! # Registry Snapshots
//!
//! A [`TenantRegistry`] is an immutable, point-in-time copy of the
//! host / origin / path to tenant mapping. Snapshots are assembled by a
//! [`SnapshotBuilder`] and published whole; nothing mutates one after
//! [`SnapshotBuilder::build`] returns.
//!
//! ## Invariants
//!
//! - Every index value is also present in `known_hashes`.
//! - Index keys are already in canonical form (see [`crate::normalize`]).
//! - One document contributes at most one entry per index.
//! - When two documents claim the same key, the first one inserted keeps it.

use crate::models::{MappingDocument, RegistryError, Result, TenantHash};
use crate::normalize::{canonical_path, normalize_host, normalize_origin};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Immutable tenant mapping snapshot.
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    host_index: HashMap<String, TenantHash>,
    origin_index: HashMap<String, TenantHash>,
    path_index: HashMap<String, TenantHash>,
    known_hashes: HashSet<TenantHash>,
    tenant_ids: HashMap<TenantHash, String>,
    loaded_at: DateTime<Utc>,
    degraded: bool,
}

impl TenantRegistry {
    /// An empty snapshot flagged as degraded, served when no load succeeded.
    #[must_use]
    pub fn degraded(loaded_at: DateTime<Utc>) -> Self {
        Self {
            host_index: HashMap::new(),
            origin_index: HashMap::new(),
            path_index: HashMap::new(),
            known_hashes: HashSet::new(),
            tenant_ids: HashMap::new(),
            loaded_at,
            degraded: true,
        }
    }

    /// Looks up a tenant by canonical host.
    #[must_use]
    pub fn lookup_host(&self, host: &str) -> Option<&TenantHash> {
        self.host_index.get(host)
    }

    /// Looks up a tenant by canonical origin.
    #[must_use]
    pub fn lookup_origin(&self, origin: &str) -> Option<&TenantHash> {
        self.origin_index.get(origin)
    }

    /// Looks up a tenant by canonical path prefix.
    #[must_use]
    pub fn lookup_path(&self, prefix: &str) -> Option<&TenantHash> {
        self.path_index.get(prefix)
    }

    /// All registered path prefixes.
    pub fn path_prefixes(&self) -> impl Iterator<Item = &str> {
        self.path_index.keys().map(String::as_str)
    }

    /// Returns true if the hash belongs to a registered tenant.
    #[must_use]
    pub fn is_known(&self, hash: &TenantHash) -> bool {
        self.known_hashes.contains(hash)
    }

    /// Internal tenant id for a hash, if the mapping document carried one.
    #[must_use]
    pub fn tenant_id(&self, hash: &TenantHash) -> Option<&str> {
        self.tenant_ids.get(hash).map(String::as_str)
    }

    /// Number of registered tenants.
    #[must_use]
    pub fn tenant_count(&self) -> usize {
        self.known_hashes.len()
    }

    /// When this snapshot was built.
    #[must_use]
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// True for the empty fallback snapshot.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// Assembles a [`TenantRegistry`] from mapping documents.
///
/// # Example
///
/// ```rust
/// use gate_registry::{MappingDocument, SnapshotBuilder, TenantHash};
///
/// let mut builder = SnapshotBuilder::new();
/// let hash = TenantHash::parse("medical789hash").unwrap();
/// builder
///     .insert(hash.clone(), &MappingDocument {
///         host: Some("Healthcare.AI".into()),
///         ..Default::default()
///     })
///     .unwrap();
///
/// let registry = builder.build(chrono::Utc::now());
/// assert_eq!(registry.lookup_host("healthcare.ai"), Some(&hash));
/// ```
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    host_index: HashMap<String, TenantHash>,
    origin_index: HashMap<String, TenantHash>,
    path_index: HashMap<String, TenantHash>,
    known_hashes: HashSet<TenantHash>,
    tenant_ids: HashMap<TenantHash, String>,
}

impl SnapshotBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one tenant's mapping document.
    ///
    /// The document is validated as a whole before anything is indexed, so
    /// a rejected document leaves the builder untouched. Origins are always
    /// accepted over `http` or `https` here; scheme policy applies to
    /// requests, not to registry contents.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MalformedDocument`] if any present field
    /// does not normalize.
    pub fn insert(&mut self, hash: TenantHash, doc: &MappingDocument) -> Result<()> {
        let malformed = |reason: &str| RegistryError::MalformedDocument {
            key: hash.to_string(),
            reason: reason.to_string(),
        };

        let host = match doc.host.as_deref() {
            Some(raw) => {
                let host = normalize_host(Some(raw));
                if host.is_empty() {
                    return Err(malformed("host does not normalize"));
                }
                Some(host)
            }
            None => None,
        };
        let origin = match doc.origin.as_deref() {
            Some(raw) => {
                let origin = normalize_origin(Some(raw), false);
                if origin.is_empty() {
                    return Err(malformed("origin does not normalize"));
                }
                Some(origin)
            }
            None => None,
        };
        let path = match doc.path.as_deref() {
            Some(raw) => Some(canonical_path(Some(raw)).ok_or_else(|| malformed("invalid path"))?),
            None => None,
        };

        if let Some(host) = host {
            Self::claim(&mut self.host_index, "host", host, &hash);
        }
        if let Some(origin) = origin {
            Self::claim(&mut self.origin_index, "origin", origin, &hash);
        }
        if let Some(path) = path {
            Self::claim(&mut self.path_index, "path", path, &hash);
        }
        if let Some(tenant_id) = doc.tenant_id.as_deref().filter(|id| !id.trim().is_empty()) {
            self.tenant_ids.insert(hash.clone(), tenant_id.to_string());
        }
        self.known_hashes.insert(hash);
        Ok(())
    }

    fn claim(index: &mut HashMap<String, TenantHash>, kind: &str, key: String, hash: &TenantHash) {
        match index.get(&key) {
            Some(owner) if owner != hash => {
                warn!(
                    "Registry {} '{}' already claimed by {}, ignoring claim from {}",
                    kind, key, owner, hash
                );
            }
            Some(_) => {}
            None => {
                index.insert(key, hash.clone());
            }
        }
    }

    /// Number of tenants added so far.
    #[must_use]
    pub fn tenant_count(&self) -> usize {
        self.known_hashes.len()
    }

    /// Publishes the snapshot.
    #[must_use]
    pub fn build(self, loaded_at: DateTime<Utc>) -> TenantRegistry {
        TenantRegistry {
            host_index: self.host_index,
            origin_index: self.origin_index,
            path_index: self.path_index,
            known_hashes: self.known_hashes,
            tenant_ids: self.tenant_ids,
            loaded_at,
            degraded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(raw: &str) -> TenantHash {
        TenantHash::parse(raw).unwrap()
    }

    #[test]
    fn test_insert_normalizes_every_index() {
        let mut builder = SnapshotBuilder::new();
        builder
            .insert(
                hash("medical789hash"),
                &MappingDocument {
                    host: Some("HealthCare.AI:443".into()),
                    origin: Some("https://Portal.Healthcare.ai/login".into()),
                    path: Some("//healthcare//portal/".into()),
                    tenant_id: Some("tenant-0042".into()),
                },
            )
            .unwrap();
        let registry = builder.build(Utc::now());

        let expected = hash("medical789hash");
        assert_eq!(registry.lookup_host("healthcare.ai"), Some(&expected));
        assert_eq!(registry.lookup_origin("https://portal.healthcare.ai"), Some(&expected));
        assert_eq!(registry.lookup_path("/healthcare/portal"), Some(&expected));
        assert_eq!(registry.tenant_id(&expected), Some("tenant-0042"));
        assert!(registry.is_known(&expected));
        assert!(!registry.is_degraded());
    }

    #[test]
    fn test_malformed_document_leaves_builder_untouched() {
        let mut builder = SnapshotBuilder::new();
        let result = builder.insert(
            hash("tenant123hash"),
            &MappingDocument {
                host: Some("good.example.com".into()),
                path: Some("/../escape".into()),
                ..Default::default()
            },
        );
        assert!(result.is_err());
        assert_eq!(builder.tenant_count(), 0);

        let registry = builder.build(Utc::now());
        assert!(registry.lookup_host("good.example.com").is_none());
    }

    #[test]
    fn test_first_claim_wins() {
        let mut builder = SnapshotBuilder::new();
        let doc = MappingDocument {
            host: Some("shared.example.com".into()),
            ..Default::default()
        };
        builder.insert(hash("tenantAAAAAA"), &doc).unwrap();
        builder.insert(hash("tenantBBBBBB"), &doc).unwrap();

        let registry = builder.build(Utc::now());
        assert_eq!(registry.lookup_host("shared.example.com"), Some(&hash("tenantAAAAAA")));
        assert_eq!(registry.tenant_count(), 2);
    }

    #[test]
    fn test_degraded_snapshot_is_empty() {
        let registry = TenantRegistry::degraded(Utc::now());
        assert!(registry.is_degraded());
        assert_eq!(registry.tenant_count(), 0);
        assert_eq!(registry.path_prefixes().count(), 0);
    }
}
