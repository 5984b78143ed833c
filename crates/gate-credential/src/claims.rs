//! Credential claim sets.
//!
//! [`RawClaims`] is what a signed token may carry, every field optional so
//! that a missing claim is reported as such instead of as a decode error.
//! [`CredentialClaims`] is the validated form handed to the resolver.

use chrono::{DateTime, Utc};
use gate_registry::TenantHash;
use serde::{Deserialize, Serialize};

/// `aud` may be a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// Single audience.
    One(String),
    /// Several audiences.
    Many(Vec<String>),
}

impl Audience {
    /// Iterates the audience values.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

/// Claims as found in the token, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawClaims {
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// What the credential may be used for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Tenant hash.
    #[serde(rename = "tenantId", alias = "tid", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Session identifier.
    #[serde(rename = "sessionId", alias = "sid", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Token identifier.
    #[serde(alias = "tokenId", default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Issued-at, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// A fully validated credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialClaims {
    /// Issuer, equal to the configured issuer.
    pub issuer: String,
    /// The allow-listed audience the token was accepted for.
    pub audience: String,
    /// Allow-listed purpose.
    pub purpose: String,
    /// Tenant the credential is bound to.
    pub tenant: TenantHash,
    /// Session identifier, when the issuer set one.
    pub session_id: Option<String>,
    /// Token identifier.
    pub token_id: String,
    /// Issued-at.
    pub issued_at: Option<DateTime<Utc>>,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
}

/// Converts epoch seconds, rejecting out-of-range values.
pub(crate) fn epoch_to_utc(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}
