//! # Tenant Gate Core
//!
//! Fail-closed tenant resolution for a shared request-handling backend.
//! Orchestrates the registry, credential validator, rate limiter and audit
//! pipeline behind one facade.
//!
//! ## Threat Coverage
//!
//! | Layer | Component | Threats Blocked |
//! |-------|-----------|-----------------|
//! | Credential | `gate-credential` | Forged, expired, cross-environment and revoked tokens |
//! | Network | `gate-registry` | Host spoofing, origin spoofing, path traversal |
//! | Volume | `gate-limiter` | Tenant enumeration, credential brute force |
//! | Forensics | `gate-audit` | PII leakage into audit and logs |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TENANT GATE                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   RequestContext ──▶ RateLimiter ──▶ credential ─┐              │
//! │                                        host ─────┤              │
//! │                                        origin ───┼──▶ Outcome   │
//! │                                        path ─────┤      │       │
//! │                                        legacy t ─┘      ▼       │
//! │                                                      Auditor    │
//! │                                                                 │
//! │   RegistryCache (TTL snapshot)    KeyCache (TTL key)            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gate_core::{GateConfig, RequestContext, TenantGate};
//!
//! let gate = TenantGate::new(GateConfig::load("tenant-gate.toml")?)?;
//!
//! let request = RequestContext::builder()
//!     .header("Authorization", auth_header)
//!     .host(host_header)
//!     .path(uri_path)
//!     .source_addr(peer_addr)
//!     .build();
//!
//! match gate.resolve(&request).await {
//!     ResolutionOutcome::Resolved(tenant) => serve(tenant),
//!     denied => respond(denied.to_response()),
//! }
//! ```
//!
//! ## Security Notes
//!
//! - Precedence is fixed: credential, host, origin, path, legacy parameter
//! - A rate-limited source is denied before any method runs
//! - Every denial carries a fresh failure id and produces one audit event
//! - Callers never learn why a request was denied

mod config;
mod context;
mod error;
mod gate;
mod outcome;

pub use config::{
    CredentialConfig, Environment, GateConfig, GlobalConfig, RegistryConfig, RequestConfig,
};
pub use context::{
    has_injection_chars, CredentialSource, ExtractedCredential, RequestContext, RequestContextBuilder,
};
pub use error::GateError;
pub use gate::{TenantGate, TenantGateBuilder, DENIED_METRIC, SUCCEEDED_METRIC};
pub use outcome::{
    CallerResponse, Denial, DenialReason, DeniedResponse, MethodFailure, ResolutionOutcome, ResolvedResponse,
    ResolvedTenant, SourceMethod, DENIED_MESSAGE, DENIED_STATUS,
};

// Re-export component types for convenience
pub use gate_audit::{AuditConfig, AuditEvent, AuditSink, EventType, MemoryAuditSink, MemoryMetrics, MetricsSink};
pub use gate_credential::{CredentialRejection, EnvSecretStore, SecretStore, StaticSecretStore};
pub use gate_limiter::RateLimitConfig;
pub use gate_registry::{MappingDocument, MappingStore, MemoryMappingStore, SledMappingStore, TenantHash};

/// Core result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
