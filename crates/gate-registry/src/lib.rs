//! # Gate Registry - Tenant Mapping Snapshots
//!
//! The registry answers one question for the resolver: which tenant, if
//! any, owns this host, origin or path? It is built from per-tenant mapping
//! documents and served as immutable snapshots.
//!
//! ## Purpose
//!
//! 1. **Normalization** - Host, origin and path strings are canonicalized
//!    and validated before they are used as keys, both when documents are
//!    loaded and when requests are looked up.
//!
//! 2. **Snapshots** - A [`TenantRegistry`] is read-only once published and
//!    replaced whole on refresh.
//!
//! 3. **Cached loading** - [`RegistryCache`] refreshes snapshots on a TTL and
//!    degrades to a stale or empty snapshot when the store fails, never to
//!    an error.
//!
//! 4. **Stores** - [`MappingStore`] abstracts the document source; a sled
//!    implementation persists mappings across restarts.
//!
//! ## Threat Model
//!
//! | Threat | Description | Defense |
//! |--------|-------------|---------|
//! | Host spoofing | Case, port or IDN variants of a mapped host | Canonical keys |
//! | Path traversal | `..` segments escaping a tenant prefix | Segment checks pre/post normalization |
//! | Tenant enumeration | Probing arbitrary hash strings | [`TenantHash`] shape check |
//! | Poisoned documents | One broken document aborting the load | Per-document skip |
//! | Store outage | Registry unavailable | Bounded stale reuse, then degraded snapshot |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   list/get   ┌───────────────┐  build  ┌────────────────┐
//! │ MappingStore │─────────────▶│ RegistryCache │────────▶│ TenantRegistry │
//! │ (sled / mem) │              │  TTL, backoff │         │  (immutable)   │
//! └──────────────┘              └───────┬───────┘         └────────────────┘
//!                                       │ normalize
//!                                       ▼
//!                               ┌───────────────┐
//!                               │  normalize.rs │
//!                               └───────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use gate_registry::{MappingDocument, MemoryMappingStore, RegistryCache, RegistryCacheConfig, TenantHash};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(MemoryMappingStore::new());
//! let tenant = TenantHash::parse("medical789hash").unwrap();
//! store.put_document("mappings/", &tenant, &MappingDocument {
//!     host: Some("healthcare.ai".into()),
//!     ..Default::default()
//! }).unwrap();
//!
//! let cache = RegistryCache::new(store, RegistryCacheConfig::default());
//! let registry = cache.load().await;
//! assert_eq!(registry.lookup_host("healthcare.ai"), Some(&tenant));
//! # }
//! ```

pub mod cache;
pub mod models;
pub mod normalize;
pub mod snapshot;
pub mod store;

pub use cache::{RegistryCache, RegistryCacheConfig, RegistryLoad};
pub use models::{LoadReport, MappingDocument, RegistryError, Result, TenantHash};
pub use snapshot::{SnapshotBuilder, TenantRegistry};
pub use store::{MappingStore, MemoryMappingStore, SledMappingStore};

#[cfg(test)]
mod tests;
