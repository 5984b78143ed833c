//! # Tenant Gate Integration Tests
//!
//! End-to-end resolution through the public API, over a sled-backed
//! mapping store.
//!
//! ## Coverage
//!
//! | Behaviour | Test |
//! |-----------|------|
//! | Credential beats host | `test_credential_overrides_host` |
//! | Host mapping | `test_host_resolution` |
//! | Origin mapping | `test_origin_resolution` |
//! | Path prefix mapping | `test_path_prefix_resolution` |
//! | Legacy `t` parameter | `test_legacy_param_resolution` |
//! | Generic denial | `test_no_match_denied_with_one_audit_event` |
//! | Expired credential | `test_expired_credential_never_succeeds` |
//! | Rate limiting | `test_repeated_failures_rate_limit_source` |

use gate_core::{
    EventType, GateConfig, MappingDocument, MemoryAuditSink, MemoryMetrics, RequestContext, ResolutionOutcome,
    SledMappingStore, SourceMethod, StaticSecretStore, TenantGate, TenantHash,
};
use gate_credential::{CredentialIssuer, MintRequest};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const SECRET: &str = "integration-secret";

/// Creates a test configuration with a temporary database.
fn test_config(temp_dir: &TempDir) -> GateConfig {
    let mut config = GateConfig::default();
    config.registry.db_path = temp_dir.path().join("mappings.db");
    config.credential.issuer = "env-issuer".to_string();
    config
}

fn hash(raw: &str) -> TenantHash {
    TenantHash::parse(raw).unwrap()
}

/// Seeds the mapping database used by every test.
fn seed(config: &GateConfig) {
    let store = SledMappingStore::open(&config.registry.db_path).unwrap();
    let prefix = &config.registry.prefix;
    store
        .put_document(
            prefix,
            &hash("tenant456hash"),
            &MappingDocument {
                host: Some("other.example.com".into()),
                ..Default::default()
            },
        )
        .unwrap();
    store
        .put_document(
            prefix,
            &hash("medical789hash"),
            &MappingDocument {
                host: Some("healthcare.ai".into()),
                origin: Some("https://portal.healthcare.ai".into()),
                path: Some("/healthcare/portal".into()),
                tenant_id: None,
            },
        )
        .unwrap();
    store
        .put_document(
            prefix,
            &hash("legacy000hash"),
            &MappingDocument {
                path: Some("/legacy".into()),
                ..Default::default()
            },
        )
        .unwrap();
    store.flush().unwrap();
}

struct Fixture {
    _dir: TempDir,
    gate: TenantGate,
    audit: Arc<MemoryAuditSink>,
    metrics: Arc<MemoryMetrics>,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config);

    let audit = Arc::new(MemoryAuditSink::new());
    let metrics = Arc::new(MemoryMetrics::new());
    let gate = TenantGate::builder(config)
        .secret_store(Arc::new(StaticSecretStore::with_secret(
            "tenant-gate/verification-key",
            SECRET,
        )))
        .audit_sink(audit.clone())
        .metrics(metrics.clone())
        .build()
        .unwrap();

    Fixture {
        _dir: dir,
        gate,
        audit,
        metrics,
    }
}

fn stream_token(tenant: &str) -> String {
    CredentialIssuer::new("env-issuer", SECRET)
        .mint(&MintRequest::new(hash(tenant), "streaming", "stream").with_session("sess-1"))
        .unwrap()
}

// =============================================================================
// RESOLUTION SCENARIOS
// =============================================================================

#[tokio::test]
async fn test_credential_overrides_host() {
    let f = fixture();
    let request = RequestContext::builder()
        .bearer(stream_token("tenant123hash"))
        .host("other.example.com")
        .build();

    let outcome = f.gate.resolve(&request).await;
    let tenant = outcome.tenant().expect("credential should resolve");
    assert_eq!(tenant.tenant_hash.as_str(), "tenant123hash");
    assert_eq!(tenant.source_method, SourceMethod::Credential);
    assert_eq!(tenant.purpose.as_deref(), Some("stream"));
    assert_eq!(tenant.session_id.as_deref(), Some("sess-1"));
    assert!(tenant.expires_at.is_some());

    let body = serde_json::to_value(outcome.to_response()).unwrap();
    assert_eq!(body["tenantIdentity"], "tenant123hash");
    assert_eq!(body["sourceMethod"], "credential");
}

#[tokio::test]
async fn test_host_resolution() {
    let f = fixture();
    let outcome = f.gate.resolve(&RequestContext::builder().host("healthcare.ai").build()).await;

    let tenant = outcome.tenant().unwrap();
    assert_eq!(tenant.tenant_hash.as_str(), "medical789hash");
    assert_eq!(tenant.source_method, SourceMethod::Host);
}

#[tokio::test]
async fn test_origin_resolution() {
    let f = fixture();
    let request = RequestContext::builder()
        .origin("https://Portal.Healthcare.AI")
        .build();
    let outcome = f.gate.resolve(&request).await;

    let tenant = outcome.tenant().unwrap();
    assert_eq!(tenant.source_method, SourceMethod::Origin);
    assert_eq!(tenant.matched_value, "https://portal.healthcare.ai");
}

#[tokio::test]
async fn test_path_prefix_resolution() {
    let f = fixture();
    let request = RequestContext::builder().path("/healthcare/portal/patient/1").build();
    let outcome = f.gate.resolve(&request).await;

    let tenant = outcome.tenant().unwrap();
    assert_eq!(tenant.source_method, SourceMethod::Path);
    assert_eq!(tenant.matched_value, "/healthcare/portal");
    assert_eq!(tenant.tenant_hash.as_str(), "medical789hash");
}

#[tokio::test]
async fn test_legacy_param_resolution() {
    let f = fixture();
    let request = RequestContext::builder().query_param("t", "legacy000hash").build();
    let outcome = f.gate.resolve(&request).await;

    let tenant = outcome.tenant().unwrap();
    assert_eq!(tenant.source_method, SourceMethod::LegacyParam);
    assert_eq!(tenant.matched_value, "legacy000hash");
}

#[tokio::test]
async fn test_host_beats_path() {
    let f = fixture();
    let request = RequestContext::builder()
        .host("other.example.com")
        .path("/healthcare/portal")
        .build();
    let outcome = f.gate.resolve(&request).await;
    assert_eq!(outcome.tenant().unwrap().tenant_hash.as_str(), "tenant456hash");
}

// =============================================================================
// DENIAL SCENARIOS
// =============================================================================

#[tokio::test]
async fn test_no_match_denied_with_one_audit_event() {
    let f = fixture();
    let request = RequestContext::builder()
        .host("unknown.example.org")
        .path("/nowhere")
        .query_param("t", "notarealtenant")
        .build();

    let outcome = f.gate.resolve(&request).await;
    let denial = outcome.denial().expect("should be denied");
    let body = serde_json::to_value(outcome.to_response()).unwrap();

    assert_eq!(
        body,
        json!({"error": "Access denied", "failureId": denial.failure_id.to_string(), "statusCode": 403})
    );
    assert!(!denial.failure_id.to_string().is_empty());
    assert_eq!(f.audit.events_of(EventType::ResolutionFailed).len(), 1);
    assert_eq!(f.metrics.count("tenant_resolution_denied"), 1);
}

#[tokio::test]
async fn test_failure_ids_are_unique() {
    let f = fixture();
    let request = RequestContext::builder().host("unknown.example.org").build();
    let a = f.gate.resolve(&request).await;
    let b = f.gate.resolve(&request).await;
    assert_ne!(a.denial().unwrap().failure_id, b.denial().unwrap().failure_id);
}

#[tokio::test]
async fn test_expired_credential_never_succeeds() {
    let f = fixture();
    let now = chrono::Utc::now().timestamp();
    let expired = jsonwebtoken::encode(
        &Header::default(),
        &json!({
            "iss": "env-issuer",
            "aud": "streaming",
            "purpose": "stream",
            "tenantId": "tenant123hash",
            "jti": "expired-1",
            "iat": now - 3600,
            "exp": now - 61,
        }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let outcome = f.gate.resolve(&RequestContext::builder().bearer(&expired).build()).await;
    assert!(!outcome.is_resolved());
    assert_eq!(f.audit.events_of(EventType::CredentialRejected).len(), 1);
}

#[tokio::test]
async fn test_rejected_credential_falls_through_to_host() {
    let f = fixture();
    let forged = CredentialIssuer::new("env-issuer", "wrong-secret")
        .mint(&MintRequest::new(hash("tenant123hash"), "streaming", "stream"))
        .unwrap();
    let request = RequestContext::builder()
        .bearer(forged)
        .host("healthcare.ai")
        .build();

    let outcome = f.gate.resolve(&request).await;
    let tenant = outcome.tenant().unwrap();
    assert_eq!(tenant.tenant_hash.as_str(), "medical789hash");
    assert_eq!(tenant.source_method, SourceMethod::Host);
}

#[tokio::test]
async fn test_repeated_failures_rate_limit_source() {
    let f = fixture();
    let probe = RequestContext::builder()
        .host("unknown.example.org")
        .source_addr("192.0.2.10")
        .build();
    for _ in 0..10 {
        assert!(f.gate.resolve(&probe).await.is_denied());
    }

    let valid = RequestContext::builder()
        .host("healthcare.ai")
        .source_addr("192.0.2.10")
        .build();
    match f.gate.resolve(&valid).await {
        ResolutionOutcome::Denied(denial) => assert_eq!(denial.reason.code(), "rate_limited"),
        other => panic!("expected rate limit, got {other:?}"),
    }

    let other_source = RequestContext::builder()
        .host("healthcare.ai")
        .source_addr("192.0.2.11")
        .build();
    assert!(f.gate.resolve(&other_source).await.is_resolved());
    assert_eq!(f.audit.events_of(EventType::RateLimited).len(), 1);
}
