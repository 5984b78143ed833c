//! Credential minting for development and tests.
//!
//! Production credentials come from the identity service. This issuer signs
//! tokens with the same claim layout so local setups and test suites can
//! exercise the credential path end to end.

use crate::claims::{Audience, RawClaims};
use chrono::Utc;
use gate_registry::TenantHash;
use jsonwebtoken::{EncodingKey, Header};
use std::time::Duration;

/// Default credential lifetime.
pub const DEFAULT_CREDENTIAL_TTL: Duration = Duration::from_secs(900);

/// What to put in a minted credential.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub tenant: TenantHash,
    pub audience: String,
    pub purpose: String,
    pub session_id: Option<String>,
    pub ttl: Duration,
}

impl MintRequest {
    pub fn new(tenant: TenantHash, audience: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            tenant,
            audience: audience.into(),
            purpose: purpose.into(),
            session_id: None,
            ttl: DEFAULT_CREDENTIAL_TTL,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Signs HS256 credentials.
pub struct CredentialIssuer {
    issuer: String,
    key: EncodingKey,
}

impl CredentialIssuer {
    pub fn new(issuer: impl Into<String>, secret: &str) -> Self {
        Self {
            issuer: issuer.into(),
            key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a credential with a fresh token id.
    pub fn mint(&self, request: &MintRequest) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(request.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = RawClaims {
            iss: Some(self.issuer.clone()),
            aud: Some(Audience::One(request.audience.clone())),
            purpose: Some(request.purpose.clone()),
            tenant_id: Some(request.tenant.to_string()),
            session_id: request.session_id.clone(),
            jti: Some(uuid::Uuid::new_v4().to_string()),
            iat: Some(now),
            exp: Some(now.saturating_add(ttl)),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.key)
    }
}

impl std::fmt::Debug for CredentialIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialIssuer").field("issuer", &self.issuer).finish_non_exhaustive()
    }
}
