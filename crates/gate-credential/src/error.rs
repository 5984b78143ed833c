//! Rejection reasons for bearer credentials.

use thiserror::Error;

/// Why a credential was not accepted.
///
/// # Security Notes
///
/// These reasons are for logs and audit only. Callers of the resolver never
/// see them: an expired credential and an unknown tenant must look the same
/// from the outside.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialRejection {
    /// Not a structurally valid signed token.
    #[error("malformed credential")]
    Malformed,

    /// Signature did not verify, or the token named another algorithm.
    #[error("signature verification failed")]
    BadSignature,

    /// `exp` is further in the past than the allowed clock skew.
    #[error("credential expired")]
    Expired,

    /// `iat` or `nbf` lies in the future beyond the allowed clock skew.
    #[error("credential not yet valid")]
    NotYetValid,

    /// A required claim is absent or empty.
    #[error("missing required claim '{0}'")]
    MissingClaim(&'static str),

    /// `iss` does not match this environment's issuer.
    #[error("unexpected issuer")]
    WrongIssuer,

    /// `aud` is not in the audience allow-list.
    #[error("audience not allowed")]
    WrongAudience,

    /// `purpose` is not in the purpose allow-list.
    #[error("purpose not allowed")]
    WrongPurpose,

    /// `tenantId` is not a well-formed tenant hash, or is not registered.
    #[error("invalid tenant in credential")]
    InvalidTenant,

    /// The token id has been revoked.
    #[error("credential revoked")]
    Revoked,

    /// The verification key could not be obtained.
    #[error("verification key unavailable")]
    KeyUnavailable,
}

impl CredentialRejection {
    /// Stable snake_case reason code for audit records and metrics.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::MissingClaim(_) => "missing_claim",
            Self::WrongIssuer => "wrong_issuer",
            Self::WrongAudience => "wrong_audience",
            Self::WrongPurpose => "wrong_purpose",
            Self::InvalidTenant => "invalid_tenant",
            Self::Revoked => "revoked",
            Self::KeyUnavailable => "key_unavailable",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for CredentialRejection {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::BadSignature
            }
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::MissingRequiredClaim(claim) if claim == "exp" => Self::MissingClaim("exp"),
            ErrorKind::InvalidIssuer => Self::WrongIssuer,
            ErrorKind::InvalidAudience => Self::WrongAudience,
            _ => Self::Malformed,
        }
    }
}
