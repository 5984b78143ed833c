//! Redact-then-append audit emitter.

use crate::error::Result;
use crate::event::{AuditEvent, EventType, DEFAULT_RETENTION_DAYS};
use crate::redact::{Redactor, DEFAULT_MAX_STRING_LEN};
use crate::sink::AuditSink;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Component name stamped on events.
pub const DEFAULT_SOURCE: &str = "tenant-gate";

/// Audit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Days until an event may be purged.
    pub retention_days: u32,
    /// Longest string kept in event context.
    pub max_string_len: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            max_string_len: DEFAULT_MAX_STRING_LEN,
        }
    }
}

/// Redacts context and hands events to a sink.
///
/// # Security Notes
///
/// - Context is redacted before the event exists; no unredacted value ever
///   reaches a sink.
/// - A sink failure is logged and swallowed. Auditing never changes a
///   resolution outcome.
pub struct Auditor {
    redactor: Redactor,
    sink: Arc<dyn AuditSink>,
    retention_days: u32,
    source: String,
}

impl Auditor {
    pub fn new(sink: Arc<dyn AuditSink>, config: &AuditConfig) -> Result<Self> {
        Ok(Self {
            redactor: Redactor::with_max_string_len(config.max_string_len)?,
            sink,
            retention_days: config.retention_days,
            source: DEFAULT_SOURCE.to_string(),
        })
    }

    /// Overrides the component name stamped on events.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Redacts `context`, builds the event and appends it.
    ///
    /// Returns the event as handed to the sink, whether or not the sink
    /// accepted it.
    pub fn emit(&self, event_type: EventType, tenant: Option<&str>, context: &Value) -> AuditEvent {
        let redacted = self.redactor.redact(context);
        let event = AuditEvent::new(event_type, tenant, redacted, self.source.clone(), self.retention_days);
        if let Err(err) = self.sink.append(&event) {
            warn!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                error = %err,
                "audit sink append failed"
            );
        }
        event
    }
}

impl std::fmt::Debug for Auditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auditor")
            .field("retention_days", &self.retention_days)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
