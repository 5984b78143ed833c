//! Audit error types.

use thiserror::Error;

/// Failures inside the audit pipeline.
///
/// None of these reach a resolution caller: the auditor logs them and
/// carries on.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A built-in pattern failed to compile.
    #[error("invalid redaction pattern '{name}': {source}")]
    Pattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },

    /// The sink rejected or could not persist the event.
    #[error("audit sink failure: {0}")]
    Sink(String),

    /// Event could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
