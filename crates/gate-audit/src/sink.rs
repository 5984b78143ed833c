//! Audit and metrics sinks.

use crate::error::{AuditError, Result};
use crate::event::{AuditEvent, EventType, Severity};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: &AuditEvent) -> Result<()>;
}

/// Best-effort counters.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str, dimensions: &[(&str, &str)]);
}

/// Writes events to the `tenant_gate::audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn append(&self, event: &AuditEvent) -> Result<()> {
        let context = serde_json::to_string(&event.redacted_context)?;
        match event.severity {
            Severity::Info | Severity::Low => info!(
                target: "tenant_gate::audit",
                event_id = %event.event_id,
                tenant = %event.tenant,
                event_type = %event.event_type,
                context = %context,
                "audit"
            ),
            Severity::Medium | Severity::High => warn!(
                target: "tenant_gate::audit",
                event_id = %event.event_id,
                tenant = %event.tenant,
                event_type = %event.event_type,
                context = %context,
                "audit"
            ),
            Severity::Critical => error!(
                target: "tenant_gate::audit",
                event_id = %event.event_id,
                tenant = %event.tenant,
                event_type = %event.event_type,
                context = %context,
                "audit"
            ),
        }
        Ok(())
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
    failing: AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent append fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn events_of(&self, event_type: EventType) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, event: &AuditEvent) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::Sink("memory sink set to fail".into()));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Discards all metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _name: &str, _dimensions: &[(&str, &str)]) {}
}

/// One recorded increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    pub name: String,
    pub dimensions: Vec<(String, String)>,
}

/// Records increments in memory.
#[derive(Debug, Default)]
pub struct MemoryMetrics {
    records: Mutex<Vec<MetricRecord>>,
}

impl MemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments recorded under `name`.
    pub fn count(&self, name: &str) -> usize {
        self.records.lock().iter().filter(|r| r.name == name).count()
    }

    /// Increments under `name` carrying dimension `key=value`.
    pub fn count_with(&self, name: &str, key: &str, value: &str) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.name == name && r.dimensions.iter().any(|(k, v)| k == key && v == value))
            .count()
    }

    pub fn records(&self) -> Vec<MetricRecord> {
        self.records.lock().clone()
    }
}

impl MetricsSink for MemoryMetrics {
    fn increment(&self, name: &str, dimensions: &[(&str, &str)]) {
        self.records.lock().push(MetricRecord {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        });
    }
}
