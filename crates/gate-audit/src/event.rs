//! Audit event taxonomy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Tenant label for events that could not be attributed.
pub const UNKNOWN_TENANT: &str = "unknown";

/// Default audit retention.
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Longest retention a configuration may ask for (about a century).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A request resolved to a tenant.
    ResolutionSucceeded,
    /// No method produced a tenant; the request was denied.
    ResolutionFailed,
    /// The source was over its failure threshold.
    RateLimited,
    /// A credential was presented and rejected.
    CredentialRejected,
    /// Input looked like an attack (header injection, path traversal).
    SuspiciousInput,
    /// A registry snapshot was loaded from the store.
    RegistryLoaded,
    /// The store failed and an older snapshot was reused.
    RegistryServedStale,
    /// The store failed and no usable snapshot existed.
    RegistryDegraded,
}

impl EventType {
    /// Severity for this event type.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::ResolutionSucceeded | Self::RegistryLoaded => Severity::Info,
            Self::ResolutionFailed | Self::CredentialRejected | Self::RegistryServedStale => Severity::Medium,
            Self::RateLimited | Self::SuspiciousInput => Severity::High,
            Self::RegistryDegraded => Severity::Critical,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ResolutionSucceeded => "resolution_succeeded",
            Self::ResolutionFailed => "resolution_failed",
            Self::RateLimited => "rate_limited",
            Self::CredentialRejected => "credential_rejected",
            Self::SuspiciousInput => "suspicious_input",
            Self::RegistryLoaded => "registry_loaded",
            Self::RegistryServedStale => "registry_served_stale",
            Self::RegistryDegraded => "registry_degraded",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// A persisted audit record. The context has already been redacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    /// Tenant hash, or [`UNKNOWN_TENANT`].
    pub tenant: String,
    pub event_type: EventType,
    pub severity: Severity,
    pub redacted_context: Value,
    pub timestamp: DateTime<Utc>,
    /// Emitting component.
    pub source: String,
    /// When the record may be purged.
    pub expires_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Builds an event stamped now. `context` must already be redacted.
    pub fn new(
        event_type: EventType,
        tenant: Option<&str>,
        redacted_context: Value,
        source: impl Into<String>,
        retention_days: u32,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            event_id: Uuid::new_v4(),
            tenant: tenant
                .filter(|t| !t.is_empty())
                .unwrap_or(UNKNOWN_TENANT)
                .to_string(),
            event_type,
            severity: event_type.severity(),
            redacted_context,
            timestamp,
            source: source.into(),
            expires_at: expiry(timestamp, retention_days),
        }
    }
}

/// `timestamp + retention_days`, saturating at the latest representable time.
fn expiry(timestamp: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    timestamp
        .checked_add_signed(Duration::days(i64::from(retention_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
