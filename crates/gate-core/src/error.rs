//! Error types for the tenant gate.

use thiserror::Error;

/// Errors raised while building or configuring a gate.
///
/// Resolution itself never returns an error: every failure becomes a
/// denial.
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration is unreadable or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mapping store could not be opened.
    #[error("Registry error: {0}")]
    Registry(#[from] gate_registry::RegistryError),

    /// Audit pipeline could not be initialised.
    #[error("Audit error: {0}")]
    Audit(#[from] gate_audit::AuditError),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
