//! # Gate Audit - Redacted Security Events
//!
//! Every resolution outcome and registry state change becomes an audit
//! event. Events carry request context for forensics, so the context is
//! redacted before it is recorded.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`PatternSet`] | Email, card, government ID and phone patterns |
//! | [`Redactor`] | Key masking, pattern scrubbing, size bounds |
//! | [`EventType`] | Closed taxonomy with fixed severities |
//! | [`Auditor`] | Redact, stamp, append; sink failures swallowed |
//! | [`AuditSink`] / [`MetricsSink`] | Destinations |
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use gate_audit::{AuditConfig, Auditor, EventType, MemoryAuditSink};
//! use serde_json::json;
//!
//! let sink = Arc::new(MemoryAuditSink::new());
//! let auditor = Auditor::new(sink.clone(), &AuditConfig::default())?;
//!
//! auditor.emit(EventType::ResolutionFailed, None, &json!({"patient_name": "Jane Doe"}));
//! assert_eq!(sink.events()[0].redacted_context["patient_name"], "[REDACTED_NAME]");
//! # Ok::<(), gate_audit::AuditError>(())
//! ```
//!
//! ## Security Notes
//!
//! - Redaction happens before an [`AuditEvent`] is constructed
//! - Source addresses are recorded only as [`pseudonymize`]d digests
//! - Strings are capped at 200 characters and nesting at 6 levels

mod auditor;
mod error;
mod event;
mod patterns;
mod redact;
mod sink;

pub use auditor::{AuditConfig, Auditor, DEFAULT_SOURCE};
pub use error::{AuditError, Result};
pub use event::{AuditEvent, EventType, Severity, DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS, UNKNOWN_TENANT};
pub use patterns::{classify_key, PatternSet, PiiKind, ValuePattern, CONTENT_KEYS, NAME_KEYS, SECRET_KEYS};
pub use redact::{pseudonymize, Redactor, DEFAULT_MAX_STRING_LEN, DEPTH_MARKER, MAX_DEPTH, MAX_ENTRIES, TRUNCATION_MARKER};
pub use sink::{AuditSink, MemoryAuditSink, MemoryMetrics, MetricRecord, MetricsSink, NoopMetrics, TracingAuditSink};
