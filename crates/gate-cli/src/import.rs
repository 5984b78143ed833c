//! Bulk import of mapping documents into the sled store.

use anyhow::{bail, Context};
use gate_core::{MappingDocument, SledMappingStore, TenantHash};
use gate_registry::normalize::{canonical_path, normalize_host, normalize_origin};
use gate_registry::{SnapshotBuilder, TenantRegistry};
use std::path::Path;

/// Reads every `<tenant hash>.json` file in `dir`.
///
/// All documents are checked together before anything is written, so a
/// malformed file or a colliding host, origin or path aborts the whole
/// import.
pub fn read_documents(dir: &Path) -> anyhow::Result<Vec<(TenantHash, MappingDocument)>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut builder = SnapshotBuilder::new();
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("{} has no usable file name", path.display()))?;
        let hash = TenantHash::parse(stem).with_context(|| format!("{}", path.display()))?;
        let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let doc: MappingDocument =
            serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;

        builder.insert(hash.clone(), &doc)?;
        documents.push((hash, doc));
    }

    let registry = builder.build(chrono::Utc::now());
    for (hash, doc) in &documents {
        if let Some(kind) = lost_claim(&registry, hash, doc) {
            bail!("{kind} of {hash} is already claimed by another tenant in this import");
        }
    }
    Ok(documents)
}

/// The first field of `doc` whose index entry belongs to a different tenant.
fn lost_claim(registry: &TenantRegistry, hash: &TenantHash, doc: &MappingDocument) -> Option<&'static str> {
    let owns = |owner: Option<&TenantHash>| owner == Some(hash);

    if let Some(host) = doc.host.as_deref() {
        if !owns(registry.lookup_host(&normalize_host(Some(host)))) {
            return Some("host");
        }
    }
    if let Some(origin) = doc.origin.as_deref() {
        if !owns(registry.lookup_origin(&normalize_origin(Some(origin), false))) {
            return Some("origin");
        }
    }
    if let Some(path) = doc.path.as_deref() {
        let owner = canonical_path(Some(path)).and_then(|p| registry.lookup_path(&p).cloned());
        if owner.as_ref() != Some(hash) {
            return Some("path");
        }
    }
    None
}

/// Writes documents under `prefix` and flushes. Returns the count written.
pub fn write_documents(
    store: &SledMappingStore,
    prefix: &str,
    documents: &[(TenantHash, MappingDocument)],
) -> anyhow::Result<usize> {
    for (hash, doc) in documents {
        store.put_document(prefix, hash, doc)?;
    }
    store.flush()?;
    Ok(documents.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) {
        std::fs::write(dir.path().join(name), body).unwrap();
    }

    #[test]
    fn test_import_reads_json_documents() {
        let dir = TempDir::new().unwrap();
        write(&dir, "medical789hash.json", r#"{"host": "healthcare.ai", "path": "/healthcare/portal"}"#);
        write(&dir, "tenant456hash.json", r#"{"origin": "https://other.example.com"}"#);
        write(&dir, "README.txt", "ignored");

        let documents = read_documents(dir.path()).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].0.as_str(), "medical789hash");
        assert_eq!(documents[0].1.host.as_deref(), Some("healthcare.ai"));

        let store = SledMappingStore::temporary().unwrap();
        assert_eq!(write_documents(&store, "mappings/", &documents).unwrap(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_import_rejects_bad_file_name() {
        let dir = TempDir::new().unwrap();
        write(&dir, "short.json", r#"{"host": "healthcare.ai"}"#);
        assert!(read_documents(dir.path()).is_err());
    }

    #[test]
    fn test_import_rejects_colliding_hosts() {
        let dir = TempDir::new().unwrap();
        write(&dir, "medical789hash.json", r#"{"host": "healthcare.ai"}"#);
        write(&dir, "tenant456hash.json", r#"{"host": "HEALTHCARE.AI"}"#);
        assert!(read_documents(dir.path()).is_err());
    }

    #[test]
    fn test_import_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        write(&dir, "medical789hash.json", "{ not json");
        assert!(read_documents(dir.path()).is_err());
    }
}
