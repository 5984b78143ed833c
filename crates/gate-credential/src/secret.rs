//! Secret and revocation sources.
//!
//! The verification key never lives in configuration. It is fetched by name
//! from a [`SecretStore`] and cached by [`crate::KeyCache`].

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Failure to fetch a secret or consult the revocation list.
#[derive(Debug, Clone, Error)]
pub enum SecretError {
    /// No secret under that name.
    #[error("secret '{0}' not found")]
    NotFound(String),

    /// The backing service failed.
    #[error("secret backend error: {0}")]
    Backend(String),
}

/// Named secret lookup.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the secret value stored under `name`.
    async fn get_secret(&self, name: &str) -> Result<String, SecretError>;
}

/// Fixed in-memory secrets, for tests and embedded use.
#[derive(Debug, Default)]
pub struct StaticSecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl StaticSecretStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding a single secret.
    pub fn with_secret(name: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(name, value);
        store
    }

    /// Sets or rotates a secret.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.secrets.write().insert(name.into(), value.into());
    }

    /// Removes a secret.
    pub fn remove(&self, name: &str) {
        self.secrets.write().remove(name);
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        self.secrets
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(name.to_string()))
    }
}

/// Reads secrets from environment variables.
///
/// `tenant-gate/verification-key` is read from
/// `TENANT_GATE_VERIFICATION_KEY`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    /// Environment variable consulted for `name`.
    pub fn variable_name(name: &str) -> String {
        name.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        let var = Self::variable_name(name);
        std::env::var(&var).map_err(|_| SecretError::NotFound(name.to_string()))
    }
}

/// Revoked token identifiers.
#[async_trait]
pub trait RevocationList: Send + Sync {
    /// Whether the token id has been revoked.
    async fn is_revoked(&self, token_id: &str) -> Result<bool, SecretError>;
}

/// In-memory revocation list.
#[derive(Debug, Default)]
pub struct MemoryRevocationList {
    revoked: RwLock<HashSet<String>>,
}

impl MemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revokes a token id.
    pub fn revoke(&self, token_id: impl Into<String>) {
        self.revoked.write().insert(token_id.into());
    }

    pub fn len(&self) -> usize {
        self.revoked.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.read().is_empty()
    }
}

#[async_trait]
impl RevocationList for MemoryRevocationList {
    async fn is_revoked(&self, token_id: &str) -> Result<bool, SecretError> {
        Ok(self.revoked.read().contains(token_id))
    }
}
