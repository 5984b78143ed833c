//! # Core Data Models for the Tenant Registry
//!
//! Fundamental types shared by every tenant-resolution component. Each type
//! is shaped so that invalid input cannot be represented once parsed.
//!
//! ## Threat Model
//!
//! The types in this module help defend against:
//!
//! - **Tenant enumeration**: [`TenantHash`] only accepts a fixed
//!   alphanumeric shape, so probing with arbitrary strings never reaches a
//!   registry lookup.
//! - **Log injection**: errors never echo the rejected raw value.
//! - **Ambiguous loads**: [`LoadReport`] forces callers to distinguish a
//!   fresh load from a stale or degraded fallback.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Minimum accepted tenant hash length.
pub const TENANT_HASH_MIN_LEN: usize = 10;

/// Maximum accepted tenant hash length.
pub const TENANT_HASH_MAX_LEN: usize = 20;

/// Errors raised by registry, store and normalization code.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Input did not match the tenant hash shape.
    #[error("invalid tenant hash ({length} chars)")]
    InvalidTenantHash {
        /// Length of the rejected input, the value itself is never echoed.
        length: usize,
    },

    /// The mapping store reported a failure.
    #[error("mapping store error: {0}")]
    Store(String),

    /// A listed key had no document by the time it was fetched.
    #[error("no document at '{0}'")]
    NotFound(String),

    /// The mapping store did not answer in time.
    #[error("mapping store timed out after {0:?}")]
    Timeout(Duration),

    /// A single mapping document could not be used.
    #[error("malformed mapping document '{key}': {reason}")]
    MalformedDocument {
        /// Store key of the document.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Sled database error.
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// The public, non-guessable identifier of a tenant.
///
/// Always 10 to 20 ASCII alphanumeric characters. Construct with
/// [`TenantHash::parse`]; deserialization goes through the same check.
///
/// # Example
///
/// ```rust
/// use gate_registry::TenantHash;
///
/// assert!(TenantHash::parse("tenant123hash").is_ok());
/// assert!(TenantHash::parse("../etc/passwd").is_err());
/// assert!(TenantHash::parse("short").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantHash(String);

impl TenantHash {
    /// Parses and validates a tenant hash.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidTenantHash`] when the length is
    /// outside `[10, 20]` or any character is not ASCII alphanumeric.
    pub fn parse(raw: &str) -> Result<Self> {
        let length = raw.len();
        let shape_ok = (TENANT_HASH_MIN_LEN..=TENANT_HASH_MAX_LEN).contains(&length)
            && raw.bytes().all(|b| b.is_ascii_alphanumeric());

        if shape_ok {
            Ok(Self(raw.to_string()))
        } else {
            Err(RegistryError::InvalidTenantHash { length })
        }
    }

    /// Returns the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantHash {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TenantHash> for String {
    fn from(value: TenantHash) -> Self {
        value.0
    }
}

impl AsRef<str> for TenantHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A mapping document as stored in the mapping store.
///
/// Documents are keyed by tenant hash (`<prefix><hash>.json`); every field
/// is optional and each one contributes at most one index entry.
///
/// ```json
/// { "host": "healthcare.ai", "origin": "https://portal.healthcare.ai",
///   "path": "/healthcare/portal", "tenantId": "tenant-0042" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDocument {
    /// Host name that maps to the tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Browser origin that maps to the tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// URL path prefix that maps to the tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Internal tenant identifier, never accepted from requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// What happened during one registry load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadReport {
    /// A fresh snapshot was built and published.
    Loaded {
        /// Tenants in the new snapshot.
        tenants: usize,
        /// Documents skipped as malformed.
        skipped: usize,
    },

    /// The store failed and the previous snapshot is served past its TTL.
    ServedStale {
        /// Store failure description.
        error: String,
        /// Age of the snapshot being served.
        age: Duration,
    },

    /// The store failed and no usable snapshot exists.
    Degraded {
        /// Store failure description.
        error: String,
    },
}

impl LoadReport {
    /// Returns true when the load did not produce a fresh snapshot.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Loaded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_hash_bounds() {
        assert!(TenantHash::parse("abcdefghij").is_ok());
        assert!(TenantHash::parse("abcdefghijklmnopqrst").is_ok());
        assert!(TenantHash::parse("abcdefghi").is_err());
        assert!(TenantHash::parse("abcdefghijklmnopqrstu").is_err());
    }

    #[test]
    fn test_tenant_hash_rejects_symbols() {
        for raw in ["tenant-123-hash", "tenant 123hash", "tenant123hash\n", "ténant123hash"] {
            assert!(TenantHash::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_tenant_hash_error_hides_value() {
        let err = TenantHash::parse("<script>alert(1)</script>").unwrap_err();
        assert!(!err.to_string().contains("script"));
    }

    #[test]
    fn test_tenant_hash_deserialize_validates() {
        let ok: std::result::Result<TenantHash, _> = serde_json::from_str("\"medical789hash\"");
        assert!(ok.is_ok());

        let bad: std::result::Result<TenantHash, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_mapping_document_camel_case() {
        let doc: MappingDocument =
            serde_json::from_str(r#"{"host":"a.example.com","tenantId":"t-1"}"#).unwrap();
        assert_eq!(doc.host.as_deref(), Some("a.example.com"));
        assert_eq!(doc.tenant_id.as_deref(), Some("t-1"));
        assert!(doc.origin.is_none());
    }

    #[test]
    fn test_mapping_document_rejects_wrong_types() {
        let doc: std::result::Result<MappingDocument, _> = serde_json::from_str(r#"{"host":42}"#);
        assert!(doc.is_err());
    }
}
