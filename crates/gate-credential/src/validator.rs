//! Bearer credential validation.
//!
//! # Checks
//!
//! A credential is accepted only when every one of these holds:
//!
//! 1. It is a three-segment compact JWS of bounded length.
//! 2. The header names HS256 and the signature verifies against the cached
//!    key.
//! 3. `exp` is present and not further in the past than the leeway, and
//!    `iat` (when present) is not further in the future than the leeway.
//! 4. `iss` equals the configured issuer.
//! 5. `aud` contains an allow-listed audience and `purpose` is allow-listed.
//! 6. `tenantId` is a well-formed tenant hash and `jti` is present.
//! 7. The `jti` is not revoked. A revocation lookup that fails rejects.

use crate::claims::{epoch_to_utc, CredentialClaims, RawClaims};
use crate::error::CredentialRejection;
use crate::key_cache::KeyCache;
use crate::secret::RevocationList;
use chrono::Utc;
use gate_registry::TenantHash;
use jsonwebtoken::{Algorithm, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest credential string considered for decoding.
pub const MAX_CREDENTIAL_LEN: usize = 8192;

/// Default clock-skew allowance.
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(60);

/// Validation settings.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Required `iss`.
    pub issuer: String,
    /// Accepted `aud` values.
    pub audiences: Vec<String>,
    /// Accepted `purpose` values.
    pub purposes: Vec<String>,
    /// Clock-skew allowance for `exp` and `iat`.
    pub leeway: Duration,
}

impl ValidatorConfig {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audiences: vec!["streaming".into(), "api".into(), "widget".into()],
            purposes: vec!["stream".into(), "api".into(), "embed".into()],
            leeway: DEFAULT_LEEWAY,
        }
    }
}

/// Validates bearer credentials against a cached key and fixed policy.
pub struct CredentialValidator {
    config: ValidatorConfig,
    keys: KeyCache,
    revocations: Option<Arc<dyn RevocationList>>,
}

impl CredentialValidator {
    pub fn new(config: ValidatorConfig, keys: KeyCache) -> Self {
        Self {
            config,
            keys,
            revocations: None,
        }
    }

    /// Consults `revocations` for every otherwise valid credential.
    pub fn with_revocations(mut self, revocations: Arc<dyn RevocationList>) -> Self {
        self.revocations = Some(revocations);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Drops the cached verification key.
    pub fn invalidate_key(&self) {
        self.keys.invalidate();
    }

    /// Validates `raw` and returns its claims.
    pub async fn validate(&self, raw: &str) -> Result<CredentialClaims, CredentialRejection> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > MAX_CREDENTIAL_LEN || raw.split('.').count() != 3 {
            return Err(CredentialRejection::Malformed);
        }

        let key = self.keys.decoding_key().await?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.config.leeway.as_secs();
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = jsonwebtoken::decode::<RawClaims>(raw, &key, &validation).map_err(|err| {
            debug!(error = %err, "credential failed decoding");
            CredentialRejection::from(err)
        })?;

        let claims = self.check_claims(data.claims)?;
        self.check_revocation(&claims.token_id).await?;
        Ok(claims)
    }

    fn check_claims(&self, raw: RawClaims) -> Result<CredentialClaims, CredentialRejection> {
        let leeway = i64::try_from(self.config.leeway.as_secs()).unwrap_or(i64::MAX);
        let now = Utc::now().timestamp();

        if let Some(iat) = raw.iat {
            if iat > now.saturating_add(leeway) {
                return Err(CredentialRejection::NotYetValid);
            }
        }

        let issuer = non_empty(raw.iss).ok_or(CredentialRejection::MissingClaim("iss"))?;
        if issuer != self.config.issuer {
            return Err(CredentialRejection::WrongIssuer);
        }

        let audiences = raw.aud.ok_or(CredentialRejection::MissingClaim("aud"))?;
        let mut offered = audiences.iter().peekable();
        if offered.peek().is_none() {
            return Err(CredentialRejection::MissingClaim("aud"));
        }
        let audience = offered
            .find(|aud| self.config.audiences.iter().any(|allowed| allowed.as_str() == *aud))
            .map(str::to_string)
            .ok_or(CredentialRejection::WrongAudience)?;

        let purpose = non_empty(raw.purpose).ok_or(CredentialRejection::MissingClaim("purpose"))?;
        if !self.config.purposes.contains(&purpose) {
            return Err(CredentialRejection::WrongPurpose);
        }

        let tenant = non_empty(raw.tenant_id).ok_or(CredentialRejection::MissingClaim("tenantId"))?;
        let tenant = TenantHash::parse(&tenant).map_err(|_| CredentialRejection::InvalidTenant)?;

        let token_id = non_empty(raw.jti).ok_or(CredentialRejection::MissingClaim("jti"))?;

        let expires_at = raw
            .exp
            .and_then(epoch_to_utc)
            .ok_or(CredentialRejection::MissingClaim("exp"))?;

        Ok(CredentialClaims {
            issuer,
            audience,
            purpose,
            tenant,
            session_id: non_empty(raw.session_id),
            token_id,
            issued_at: raw.iat.and_then(epoch_to_utc),
            expires_at,
        })
    }

    async fn check_revocation(&self, token_id: &str) -> Result<(), CredentialRejection> {
        let Some(list) = &self.revocations else {
            return Ok(());
        };
        match list.is_revoked(token_id).await {
            Ok(false) => Ok(()),
            Ok(true) => Err(CredentialRejection::Revoked),
            Err(err) => {
                warn!(error = %err, "revocation lookup failed; rejecting credential");
                Err(CredentialRejection::Revoked)
            }
        }
    }
}

impl std::fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("config", &self.config)
            .field("keys", &self.keys)
            .field("revocations", &self.revocations.is_some())
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
