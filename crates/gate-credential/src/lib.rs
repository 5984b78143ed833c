//! # Gate Credential - Bearer Credential Validation
//!
//! Validates the signed bearer credentials that carry a tenant binding,
//! the highest-precedence resolution method.
//!
//! ## Threat Model
//!
//! | Threat | Defense |
//! |--------|---------|
//! | Forged token | HS256 signature against a key held only in the secret store |
//! | Algorithm substitution | Only HS256 is accepted |
//! | Replay after expiry | `exp` required, 60 s leeway |
//! | Cross-environment reuse | Exact issuer match |
//! | Token for another product surface | Audience and purpose allow-lists |
//! | Stolen token | Revocation list consulted by `jti` |
//! | Secret store outage | Method fails closed, no stale key |
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use gate_credential::{CredentialIssuer, CredentialValidator, KeyCache, MintRequest, StaticSecretStore, ValidatorConfig};
//! use gate_registry::TenantHash;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(StaticSecretStore::with_secret("tenant-gate/verification-key", "dev-secret"));
//! let validator = CredentialValidator::new(
//!     ValidatorConfig::new("env-issuer"),
//!     KeyCache::new(store, "tenant-gate/verification-key"),
//! );
//!
//! let token = CredentialIssuer::new("env-issuer", "dev-secret")
//!     .mint(&MintRequest::new(TenantHash::parse("tenant123hash").unwrap(), "streaming", "stream"))
//!     .unwrap();
//!
//! let claims = validator.validate(&token).await.unwrap();
//! assert_eq!(claims.tenant.as_str(), "tenant123hash");
//! # }
//! ```

pub mod claims;
pub mod error;
pub mod issuer;
pub mod key_cache;
pub mod secret;
pub mod validator;

pub use claims::{Audience, CredentialClaims, RawClaims};
pub use error::CredentialRejection;
pub use issuer::{CredentialIssuer, MintRequest};
pub use key_cache::KeyCache;
pub use secret::{EnvSecretStore, MemoryRevocationList, RevocationList, SecretError, SecretStore, StaticSecretStore};
pub use validator::{CredentialValidator, ValidatorConfig};
