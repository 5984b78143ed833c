//! Resolution outcome types.

use chrono::{DateTime, Utc};
use gate_credential::CredentialRejection;
use gate_registry::TenantHash;
use serde::Serialize;
use uuid::Uuid;

/// Status code of every denial.
pub const DENIED_STATUS: u16 = 403;

/// Caller-visible error text of every denial.
pub const DENIED_MESSAGE: &str = "Access denied";

/// Resolution method, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    Credential,
    Host,
    Origin,
    Path,
    LegacyParam,
}

impl SourceMethod {
    /// All methods, highest precedence first.
    pub const PRECEDENCE: [Self; 5] = [
        Self::Credential,
        Self::Host,
        Self::Origin,
        Self::Path,
        Self::LegacyParam,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::Host => "host",
            Self::Origin => "origin",
            Self::Path => "path",
            Self::LegacyParam => "legacy_param",
        }
    }
}

/// A successfully resolved tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTenant {
    pub tenant_hash: TenantHash,
    /// Internal id from the mapping document, when it has one.
    pub tenant_id: Option<String>,
    pub source_method: SourceMethod,
    /// The canonical value that matched: host, origin, path prefix, tenant
    /// hash, or the credential's location.
    pub matched_value: String,
    pub session_id: Option<String>,
    pub purpose: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Why a single method produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFailure {
    /// The request did not carry this signal.
    Absent,
    /// The signal failed syntax or safety checks.
    Malformed(&'static str),
    /// Well-formed but not mapped to any tenant.
    NoMatch,
    /// The credential was rejected.
    Rejected(CredentialRejection),
    /// The registry is degraded; nothing can be looked up.
    Unavailable,
}

impl MethodFailure {
    /// Stable code for audit context.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Malformed(code) => code,
            Self::NoMatch => "no_match",
            Self::Rejected(rejection) => rejection.code(),
            Self::Unavailable => "unavailable",
        }
    }
}

/// Internal denial reason. Never shown to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The source is over its failure threshold.
    RateLimited,
    /// A credential was presented and rejected, and nothing else matched.
    InvalidCredential,
    /// The registry was degraded and nothing else matched.
    RegistryUnavailable,
    /// No method matched.
    NoMatch,
}

impl DenialReason {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::InvalidCredential => "invalid_credential",
            Self::RegistryUnavailable => "registry_unavailable",
            Self::NoMatch => "no_match",
        }
    }

    /// Picks the reason for a set of per-method failures.
    pub fn from_failures(failures: &[(SourceMethod, MethodFailure)]) -> Self {
        if failures.iter().any(|(_, f)| matches!(f, MethodFailure::Rejected(_))) {
            Self::InvalidCredential
        } else if failures.iter().any(|(_, f)| matches!(f, MethodFailure::Unavailable)) {
            Self::RegistryUnavailable
        } else {
            Self::NoMatch
        }
    }
}

/// A denied resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// Correlates the caller response with the audit event.
    pub failure_id: Uuid,
    pub reason: DenialReason,
    /// What each attempted method reported.
    pub failures: Vec<(SourceMethod, MethodFailure)>,
}

impl Denial {
    pub fn new(reason: DenialReason, failures: Vec<(SourceMethod, MethodFailure)>) -> Self {
        Self {
            failure_id: Uuid::new_v4(),
            reason,
            failures,
        }
    }
}

/// Result of [`TenantGate::resolve`](crate::TenantGate::resolve).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved(ResolvedTenant),
    Denied(Denial),
}

impl ResolutionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    pub fn tenant(&self) -> Option<&ResolvedTenant> {
        match self {
            Self::Resolved(tenant) => Some(tenant),
            Self::Denied(_) => None,
        }
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Self::Resolved(_) => None,
            Self::Denied(denial) => Some(denial),
        }
    }

    /// The shape returned to the caller. Denials carry no reason.
    pub fn to_response(&self) -> CallerResponse {
        match self {
            Self::Resolved(tenant) => CallerResponse::Resolved(ResolvedResponse {
                tenant_identity: tenant.tenant_hash.to_string(),
                tenant_id: tenant.tenant_id.clone(),
                source_method: tenant.source_method,
                matched_value: tenant.matched_value.clone(),
                session_id: tenant.session_id.clone(),
                purpose: tenant.purpose.clone(),
                expires_at: tenant.expires_at,
            }),
            Self::Denied(denial) => CallerResponse::Denied(DeniedResponse {
                error: DENIED_MESSAGE,
                failure_id: denial.failure_id.to_string(),
                status_code: DENIED_STATUS,
            }),
        }
    }
}

/// Caller-visible success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedResponse {
    pub tenant_identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub source_method: SourceMethod,
    pub matched_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Caller-visible denial body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeniedResponse {
    pub error: &'static str,
    pub failure_id: String,
    pub status_code: u16,
}

/// Either caller-visible body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CallerResponse {
    Resolved(ResolvedResponse),
    Denied(DeniedResponse),
}
