//! Configuration types for the tenant gate.

use crate::error::GateError;
use crate::Result;
use gate_audit::{AuditConfig, MAX_RETENTION_DAYS};
use gate_credential::ValidatorConfig;
use gate_limiter::RateLimitConfig;
use gate_registry::cache::{MAX_TTL, MIN_TTL};
use gate_registry::RegistryCacheConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the tenant gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Mapping store and snapshot cache.
    pub registry: RegistryConfig,

    /// Bearer credential policy.
    pub credential: CredentialConfig,

    /// Failure rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Audit retention and redaction bounds.
    pub audit: AuditConfig,

    /// Where request signals are read from.
    pub request: RequestConfig,

    /// Global settings.
    pub global: GlobalConfig,
}

impl GateConfig {
    /// Parses a TOML document. Missing sections take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| GateError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Serializes to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GateError::Config(e.to_string()))
    }

    /// Rejects settings that would weaken or break resolution.
    pub fn validate(&self) -> Result<()> {
        let ttl = Duration::from_secs(self.registry.ttl_secs);
        if ttl < MIN_TTL || ttl > MAX_TTL {
            return Err(GateError::Config(format!(
                "registry.ttl_secs must be within [{}, {}], got {}",
                MIN_TTL.as_secs(),
                MAX_TTL.as_secs(),
                self.registry.ttl_secs
            )));
        }
        if self.registry.max_documents == 0 {
            return Err(GateError::Config("registry.max_documents must be positive".into()));
        }
        if self.registry.store_timeout_ms == 0 {
            return Err(GateError::Config("registry.store_timeout_ms must be positive".into()));
        }
        if self.credential.issuer.trim().is_empty() {
            return Err(GateError::Config("credential.issuer must not be empty".into()));
        }
        if self.credential.audiences.iter().all(|a| a.trim().is_empty()) {
            return Err(GateError::Config("credential.audiences must not be empty".into()));
        }
        if self.credential.purposes.iter().all(|p| p.trim().is_empty()) {
            return Err(GateError::Config("credential.purposes must not be empty".into()));
        }
        if self.credential.secret_name.trim().is_empty() {
            return Err(GateError::Config("credential.secret_name must not be empty".into()));
        }
        if self.rate_limit.threshold == 0 {
            return Err(GateError::Config("rate_limit.threshold must be positive".into()));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(GateError::Config("rate_limit.window_secs must be positive".into()));
        }
        if self.audit.retention_days == 0 || self.audit.retention_days > MAX_RETENTION_DAYS {
            return Err(GateError::Config(format!(
                "audit.retention_days must be within [1, {}], got {}",
                MAX_RETENTION_DAYS, self.audit.retention_days
            )));
        }
        for (field, value) in [
            ("request.token_header", &self.request.token_header),
            ("request.token_query_param", &self.request.token_query_param),
            ("request.legacy_param", &self.request.legacy_param),
        ] {
            if value.trim().is_empty() {
                return Err(GateError::Config(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Mapping store and snapshot cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path to the sled mapping database.
    pub db_path: PathBuf,

    /// Key prefix of mapping documents.
    pub prefix: String,

    /// Snapshot lifetime, 300 to 600 seconds.
    pub ttl_secs: u64,

    /// Oldest snapshot served while the store is failing.
    pub max_stale_secs: u64,

    /// Quiet period after a failed refresh.
    pub retry_backoff_secs: u64,

    /// Most documents read per refresh.
    pub max_documents: usize,

    /// Bound on each store call.
    pub store_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./tenant_gate_mappings.db"),
            prefix: "mappings/".to_string(),
            ttl_secs: 300,
            max_stale_secs: 3600,
            retry_backoff_secs: 30,
            max_documents: 100,
            store_timeout_ms: 2000,
        }
    }
}

impl RegistryConfig {
    pub fn cache_config(&self) -> RegistryCacheConfig {
        RegistryCacheConfig {
            prefix: self.prefix.clone(),
            ttl: Duration::from_secs(self.ttl_secs),
            max_stale: Duration::from_secs(self.max_stale_secs),
            retry_backoff: Duration::from_secs(self.retry_backoff_secs),
            max_documents: self.max_documents,
            store_timeout: self.store_timeout(),
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Bearer credential policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Required `iss`; differs per environment.
    pub issuer: String,

    /// Accepted `aud` values.
    pub audiences: Vec<String>,

    /// Accepted `purpose` values.
    pub purposes: Vec<String>,

    /// Secret store name of the verification key.
    pub secret_name: String,

    /// How long a fetched key is reused.
    pub key_ttl_secs: u64,

    /// Clock-skew allowance for `exp` and `iat`.
    pub leeway_secs: u64,

    /// Also require the credential's tenant to be in the registry.
    pub require_known_tenant: bool,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            issuer: "tenant-gate".to_string(),
            audiences: vec!["streaming".into(), "api".into(), "widget".into()],
            purposes: vec!["stream".into(), "api".into(), "embed".into()],
            secret_name: "tenant-gate/verification-key".to_string(),
            key_ttl_secs: 300,
            leeway_secs: 60,
            require_known_tenant: false,
        }
    }
}

impl CredentialConfig {
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            issuer: self.issuer.clone(),
            audiences: self.audiences.clone(),
            purposes: self.purposes.clone(),
            leeway: Duration::from_secs(self.leeway_secs),
        }
    }

    pub fn key_ttl(&self) -> Duration {
        Duration::from_secs(self.key_ttl_secs)
    }
}

/// Names of the request fields signals are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Header carrying a bare credential.
    pub token_header: String,

    /// Query parameter carrying a credential.
    pub token_query_param: String,

    /// Legacy query parameter carrying a tenant hash.
    pub legacy_param: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            token_header: "x-tenant-token".to_string(),
            token_query_param: "token".to_string(),
            legacy_param: "t".to_string(),
        }
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Global gate settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Deployment environment.
    pub environment: Environment,
}

impl GlobalConfig {
    /// Production only accepts `https` origins.
    pub fn require_https_origins(&self) -> bool {
        self.environment == Environment::Production
    }
}
