//! The tenant resolution facade.
//!
//! [`TenantGate`] owns every cache and collaborator and runs the precedence
//! procedure for each request.

use crate::config::GateConfig;
use crate::context::{has_injection_chars, ExtractedCredential, RequestContext};
use crate::error::GateError;
use crate::outcome::{Denial, DenialReason, MethodFailure, ResolutionOutcome, ResolvedTenant, SourceMethod};
use crate::Result;

use gate_audit::{pseudonymize, AuditSink, Auditor, EventType, MetricsSink, NoopMetrics, TracingAuditSink};
use gate_credential::{
    CredentialRejection, CredentialValidator, EnvSecretStore, KeyCache, RevocationList, SecretStore,
};
use gate_limiter::{source_bucket, RateLimiter};
use gate_registry::normalize::{canonical_path, is_traversal_attempt, match_path_prefix, normalize_host, normalize_origin};
use gate_registry::{LoadReport, MappingStore, RegistryCache, SledMappingStore, TenantHash, TenantRegistry};

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Metric incremented on every successful resolution.
pub const SUCCEEDED_METRIC: &str = "tenant_resolution_succeeded";

/// Metric incremented on every denial.
pub const DENIED_METRIC: &str = "tenant_resolution_denied";

/// The tenant resolution facade.
///
/// # Security Model
///
/// Resolution order is credential, host, origin, path, legacy parameter.
/// The first method that produces a tenant wins, so a valid credential is
/// never overridden by a disagreeing network signal.
///
/// The gate is fail-closed: a malformed signal, a rejected credential, a
/// degraded registry and an unknown tenant all end in the same generic
/// denial. Reasons go to logs and audit, never to the caller.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use gate_core::{GateConfig, RequestContext, TenantGate};
/// use gate_credential::StaticSecretStore;
/// use gate_registry::{MappingDocument, MemoryMappingStore, TenantHash};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), gate_core::GateError> {
/// let store = Arc::new(MemoryMappingStore::new());
/// store.put_document("mappings/", &TenantHash::parse("medical789hash")?, &MappingDocument {
///     host: Some("healthcare.ai".into()),
///     ..Default::default()
/// })?;
///
/// let gate = TenantGate::builder(GateConfig::default())
///     .mapping_store(store)
///     .secret_store(Arc::new(StaticSecretStore::new()))
///     .build()?;
///
/// let outcome = gate.resolve(&RequestContext::builder().host("healthcare.ai").build()).await;
/// assert_eq!(outcome.tenant().unwrap().tenant_hash.as_str(), "medical789hash");
/// # Ok(())
/// # }
/// ```
pub struct TenantGate {
    config: GateConfig,
    registry: RegistryCache,
    validator: CredentialValidator,
    limiter: RateLimiter,
    auditor: Auditor,
    metrics: Arc<dyn MetricsSink>,
}

impl TenantGate {
    /// Builds a gate over the sled store at `config.registry.db_path`,
    /// environment secrets and tracing audit.
    pub fn new(config: GateConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: GateConfig) -> TenantGateBuilder {
        TenantGateBuilder::new(config)
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Forces the next resolution to reload the registry.
    pub fn invalidate_registry(&self) {
        self.registry.invalidate();
    }

    /// Resolves the tenant for `request`.
    pub async fn resolve(&self, request: &RequestContext) -> ResolutionOutcome {
        let source = source_bucket(request.source_addr());

        if self.limiter.is_limited(&source) {
            let denial = Denial::new(DenialReason::RateLimited, Vec::new());
            warn!(
                failure_id = %denial.failure_id,
                source = %pseudonymize(&source),
                "Tenant resolution denied: source rate limited"
            );
            self.auditor
                .emit(EventType::RateLimited, None, &self.denial_context(request, &source, &denial));
            self.metrics
                .increment(DENIED_METRIC, &[("reason", DenialReason::RateLimited.code())]);
            return ResolutionOutcome::Denied(denial);
        }

        let load = self.registry.load_with_report().await;
        if let Some(report) = &load.report {
            self.audit_registry_load(report);
        }
        let registry = load.snapshot;

        let mut failures = Vec::with_capacity(SourceMethod::PRECEDENCE.len());
        for method in SourceMethod::PRECEDENCE {
            let attempt = match method {
                SourceMethod::Credential => self.try_credential(request, &source, &registry).await,
                SourceMethod::Host => self.try_host(request, &source, &registry),
                SourceMethod::Origin => self.try_origin(request, &source, &registry),
                SourceMethod::Path => self.try_path(request, &source, &registry),
                SourceMethod::LegacyParam => self.try_legacy(request, &registry),
            };
            match attempt {
                Ok(resolved) => return self.succeed(request, &source, resolved),
                Err(failure) => {
                    debug!(method = method.as_str(), failure = failure.code(), "Resolution method failed");
                    failures.push((method, failure));
                }
            }
        }

        self.deny(request, &source, failures)
    }

    // =========================================================================
    // Methods
    // =========================================================================

    async fn try_credential(
        &self,
        request: &RequestContext,
        source: &str,
        registry: &TenantRegistry,
    ) -> std::result::Result<ResolvedTenant, MethodFailure> {
        let (credential_source, token) = match request.credential(&self.config.request) {
            ExtractedCredential::Absent => return Err(MethodFailure::Absent),
            ExtractedCredential::Injected { source: location } => {
                self.suspicious(request, source, "header_injection", location.as_str());
                return Err(MethodFailure::Malformed("header_injection"));
            }
            ExtractedCredential::Present { source, token } => (source, token),
        };

        let claims = match self.validator.validate(token).await {
            Ok(claims) => claims,
            Err(rejection) => {
                self.credential_rejected(request, source, &rejection, credential_source.as_str());
                return Err(MethodFailure::Rejected(rejection));
            }
        };

        if self.config.credential.require_known_tenant
            && (registry.is_degraded() || !registry.is_known(&claims.tenant))
        {
            let rejection = CredentialRejection::InvalidTenant;
            self.credential_rejected(request, source, &rejection, credential_source.as_str());
            return Err(MethodFailure::Rejected(rejection));
        }

        Ok(ResolvedTenant {
            tenant_id: registry.tenant_id(&claims.tenant).map(str::to_string),
            tenant_hash: claims.tenant,
            source_method: SourceMethod::Credential,
            matched_value: credential_source.as_str().to_string(),
            session_id: claims.session_id,
            purpose: Some(claims.purpose),
            expires_at: Some(claims.expires_at),
        })
    }

    fn try_host(
        &self,
        request: &RequestContext,
        source: &str,
        registry: &TenantRegistry,
    ) -> std::result::Result<ResolvedTenant, MethodFailure> {
        let raw = request.host().ok_or(MethodFailure::Absent)?;
        if has_injection_chars(raw) {
            self.suspicious(request, source, "header_injection", "host");
            return Err(MethodFailure::Malformed("header_injection"));
        }
        let host = normalize_host(Some(raw));
        if host.is_empty() {
            return Err(MethodFailure::Malformed("invalid_host"));
        }
        if registry.is_degraded() {
            return Err(MethodFailure::Unavailable);
        }
        let tenant = registry.lookup_host(&host).ok_or(MethodFailure::NoMatch)?;
        Ok(self.network_match(registry, tenant, SourceMethod::Host, host))
    }

    fn try_origin(
        &self,
        request: &RequestContext,
        source: &str,
        registry: &TenantRegistry,
    ) -> std::result::Result<ResolvedTenant, MethodFailure> {
        let raw = request.origin().ok_or(MethodFailure::Absent)?;
        if has_injection_chars(raw) {
            self.suspicious(request, source, "header_injection", "origin");
            return Err(MethodFailure::Malformed("header_injection"));
        }
        let origin = normalize_origin(Some(raw), self.config.global.require_https_origins());
        if origin.is_empty() {
            return Err(MethodFailure::Malformed("invalid_origin"));
        }
        if registry.is_degraded() {
            return Err(MethodFailure::Unavailable);
        }
        let tenant = registry.lookup_origin(&origin).ok_or(MethodFailure::NoMatch)?;
        Ok(self.network_match(registry, tenant, SourceMethod::Origin, origin))
    }

    fn try_path(
        &self,
        request: &RequestContext,
        source: &str,
        registry: &TenantRegistry,
    ) -> std::result::Result<ResolvedTenant, MethodFailure> {
        let raw = request.path().ok_or(MethodFailure::Absent)?;
        if is_traversal_attempt(raw) {
            self.suspicious(request, source, "path_traversal", "path");
            return Err(MethodFailure::Malformed("path_traversal"));
        }
        if canonical_path(Some(raw)).is_none() {
            return Err(MethodFailure::Malformed("invalid_path"));
        }
        if registry.is_degraded() {
            return Err(MethodFailure::Unavailable);
        }
        let prefix = match_path_prefix(Some(raw), registry.path_prefixes()).ok_or(MethodFailure::NoMatch)?;
        let tenant = registry.lookup_path(&prefix).ok_or(MethodFailure::NoMatch)?;
        Ok(self.network_match(registry, tenant, SourceMethod::Path, prefix))
    }

    fn try_legacy(
        &self,
        request: &RequestContext,
        registry: &TenantRegistry,
    ) -> std::result::Result<ResolvedTenant, MethodFailure> {
        let raw = request
            .query_param(&self.config.request.legacy_param)
            .ok_or(MethodFailure::Absent)?;
        let hash = TenantHash::parse(raw.trim()).map_err(|_| MethodFailure::Malformed("invalid_tenant_hash"))?;
        if registry.is_degraded() {
            return Err(MethodFailure::Unavailable);
        }
        if !registry.is_known(&hash) {
            return Err(MethodFailure::NoMatch);
        }
        let matched = hash.to_string();
        Ok(self.network_match(registry, &hash, SourceMethod::LegacyParam, matched))
    }

    fn network_match(
        &self,
        registry: &TenantRegistry,
        tenant: &TenantHash,
        method: SourceMethod,
        matched_value: String,
    ) -> ResolvedTenant {
        ResolvedTenant {
            tenant_hash: tenant.clone(),
            tenant_id: registry.tenant_id(tenant).map(str::to_string),
            source_method: method,
            matched_value,
            session_id: None,
            purpose: None,
            expires_at: None,
        }
    }

    // =========================================================================
    // Outcomes
    // =========================================================================

    fn succeed(&self, request: &RequestContext, source: &str, resolved: ResolvedTenant) -> ResolutionOutcome {
        info!(
            tenant = %resolved.tenant_hash,
            method = resolved.source_method.as_str(),
            "Tenant resolved"
        );
        let context = json!({
            "method": resolved.source_method.as_str(),
            "matched_value": resolved.matched_value,
            "correlation_id": request.correlation_id(),
            "source": pseudonymize(source),
        });
        self.auditor.emit(
            EventType::ResolutionSucceeded,
            Some(resolved.tenant_hash.as_str()),
            &context,
        );
        self.metrics
            .increment(SUCCEEDED_METRIC, &[("method", resolved.source_method.as_str())]);
        ResolutionOutcome::Resolved(resolved)
    }

    fn deny(
        &self,
        request: &RequestContext,
        source: &str,
        failures: Vec<(SourceMethod, MethodFailure)>,
    ) -> ResolutionOutcome {
        let reason = DenialReason::from_failures(&failures);
        let denial = Denial::new(reason, failures);
        let recent_failures = self.limiter.record_failure(source);

        warn!(
            failure_id = %denial.failure_id,
            reason = reason.code(),
            source = %pseudonymize(source),
            recent_failures,
            "Tenant resolution denied"
        );
        self.auditor
            .emit(EventType::ResolutionFailed, None, &self.denial_context(request, source, &denial));
        self.metrics.increment(DENIED_METRIC, &[("reason", reason.code())]);
        ResolutionOutcome::Denied(denial)
    }

    fn denial_context(&self, request: &RequestContext, source: &str, denial: &Denial) -> Value {
        let methods: Map<String, Value> = denial
            .failures
            .iter()
            .map(|(method, failure)| (method.as_str().to_string(), Value::from(failure.code())))
            .collect();
        json!({
            "failure_id": denial.failure_id.to_string(),
            "reason": denial.reason.code(),
            "correlation_id": request.correlation_id(),
            "source": pseudonymize(source),
            "user_agent": request.user_agent(),
            "path": request.path(),
            "host": request.host(),
            "origin": request.origin(),
            "methods": methods,
        })
    }

    // =========================================================================
    // Audit helpers
    // =========================================================================

    fn credential_rejected(
        &self,
        request: &RequestContext,
        source: &str,
        rejection: &CredentialRejection,
        location: &str,
    ) {
        debug!(reason = rejection.code(), location, "Credential rejected");
        let context = json!({
            "reason": rejection.code(),
            "location": location,
            "correlation_id": request.correlation_id(),
            "source": pseudonymize(source),
        });
        self.auditor.emit(EventType::CredentialRejected, None, &context);
    }

    fn suspicious(&self, request: &RequestContext, source: &str, kind: &str, field: &str) {
        warn!(kind, field, source = %pseudonymize(source), "Suspicious request input");
        let context = json!({
            "kind": kind,
            "field": field,
            "correlation_id": request.correlation_id(),
            "source": pseudonymize(source),
            "user_agent": request.user_agent(),
        });
        self.auditor.emit(EventType::SuspiciousInput, None, &context);
    }

    fn audit_registry_load(&self, report: &LoadReport) {
        let (event_type, context) = match report {
            LoadReport::Loaded { tenants, skipped } => (
                EventType::RegistryLoaded,
                json!({"tenants": tenants, "skipped": skipped}),
            ),
            LoadReport::ServedStale { error, age } => (
                EventType::RegistryServedStale,
                json!({"error": error, "age_secs": age.as_secs()}),
            ),
            LoadReport::Degraded { error } => (EventType::RegistryDegraded, json!({"error": error})),
        };
        self.auditor.emit(event_type, None, &context);
    }
}

impl std::fmt::Debug for TenantGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantGate")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TenantGate`].
///
/// Collaborators not supplied default to: the sled store at
/// `registry.db_path`, [`EnvSecretStore`], no revocation list,
/// [`TracingAuditSink`] and [`NoopMetrics`].
pub struct TenantGateBuilder {
    config: GateConfig,
    mapping_store: Option<Arc<dyn MappingStore>>,
    secret_store: Option<Arc<dyn SecretStore>>,
    revocations: Option<Arc<dyn RevocationList>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl TenantGateBuilder {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            mapping_store: None,
            secret_store: None,
            revocations: None,
            audit_sink: None,
            metrics: None,
        }
    }

    pub fn mapping_store(mut self, store: Arc<dyn MappingStore>) -> Self {
        self.mapping_store = Some(store);
        self
    }

    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(store);
        self
    }

    pub fn revocations(mut self, revocations: Arc<dyn RevocationList>) -> Self {
        self.revocations = Some(revocations);
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validates the configuration and assembles the gate.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid
    /// - The default sled store cannot be opened
    /// - Redaction patterns fail to compile
    pub fn build(self) -> Result<TenantGate> {
        let config = self.config;
        config.validate()?;

        let mapping_store: Arc<dyn MappingStore> = match self.mapping_store {
            Some(store) => store,
            None => Arc::new(SledMappingStore::open(&config.registry.db_path)?),
        };
        let secret_store: Arc<dyn SecretStore> = self.secret_store.unwrap_or_else(|| Arc::new(EnvSecretStore));
        let audit_sink: Arc<dyn AuditSink> = self.audit_sink.unwrap_or_else(|| Arc::new(TracingAuditSink));
        let metrics: Arc<dyn MetricsSink> = self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics));

        let registry = RegistryCache::new(mapping_store, config.registry.cache_config());

        let keys = KeyCache::new(secret_store, config.credential.secret_name.clone())
            .with_ttl(config.credential.key_ttl())
            .with_fetch_timeout(config.registry.store_timeout());
        let mut validator = CredentialValidator::new(config.credential.validator_config(), keys);
        if let Some(revocations) = self.revocations {
            validator = validator.with_revocations(revocations);
        }

        let limiter = RateLimiter::new(config.rate_limit.clone());
        let auditor = Auditor::new(audit_sink, &config.audit).map_err(GateError::from)?;

        info!(
            environment = ?config.global.environment,
            issuer = %config.credential.issuer,
            "Tenant gate initialized"
        );

        Ok(TenantGate {
            config,
            registry,
            validator,
            limiter,
            auditor,
            metrics,
        })
    }
}
