//! Structural redaction of audit context.
//!
//! Walks a JSON value and returns a copy that is safe to persist: sensitive
//! keys are masked whole, remaining strings are pattern-scrubbed and
//! length-capped, and nesting and collection sizes are bounded.

use crate::error::Result;
use crate::patterns::{classify_key, PatternSet};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Default cap on string length, in characters, after redaction.
pub const DEFAULT_MAX_STRING_LEN: usize = 200;

/// Deepest nesting kept. Anything below is replaced with [`DEPTH_MARKER`].
pub const MAX_DEPTH: usize = 6;

/// Most entries kept per object or array.
pub const MAX_ENTRIES: usize = 50;

/// Longest object key kept.
pub const MAX_KEY_LEN: usize = 64;

pub const DEPTH_MARKER: &str = "[DEPTH_LIMIT]";
pub const TRUNCATION_MARKER: &str = "…[truncated]";

/// Redacts audit context values.
#[derive(Debug, Clone)]
pub struct Redactor {
    patterns: PatternSet,
    max_string_len: usize,
}

impl Redactor {
    pub fn new() -> Result<Self> {
        Self::with_max_string_len(DEFAULT_MAX_STRING_LEN)
    }

    /// `max_string_len` is clamped so the truncation marker always fits.
    pub fn with_max_string_len(max_string_len: usize) -> Result<Self> {
        let floor = TRUNCATION_MARKER.chars().count() + 1;
        Ok(Self {
            patterns: PatternSet::new()?,
            max_string_len: max_string_len.max(floor),
        })
    }

    pub fn max_string_len(&self) -> usize {
        self.max_string_len
    }

    /// Returns a redacted copy of `value`.
    pub fn redact(&self, value: &Value) -> Value {
        self.redact_at(value, 0)
    }

    /// Scrubs and caps a single string.
    pub fn redact_str(&self, value: &str) -> String {
        self.truncate(self.patterns.redact(value))
    }

    fn redact_at(&self, value: &Value, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            return Value::String(DEPTH_MARKER.to_string());
        }
        match value {
            Value::Null | Value::Bool(_) => value.clone(),
            Value::Number(n) => {
                let rendered = n.to_string();
                let scrubbed = self.patterns.redact(&rendered);
                if scrubbed == rendered {
                    value.clone()
                } else {
                    Value::String(scrubbed)
                }
            }
            Value::String(s) => Value::String(self.redact_str(s)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .take(MAX_ENTRIES)
                    .map(|item| self.redact_at(item, depth + 1))
                    .collect(),
            ),
            Value::Object(fields) => {
                let mut out = Map::new();
                for (key, field) in fields.iter().take(MAX_ENTRIES) {
                    let safe_key = self.redact_key(key);
                    let redacted = match classify_key(key) {
                        Some(kind) if !field.is_null() => Value::String(kind.marker().to_string()),
                        _ => self.redact_at(field, depth + 1),
                    };
                    out.insert(safe_key, redacted);
                }
                Value::Object(out)
            }
        }
    }

    fn redact_key(&self, key: &str) -> String {
        let scrubbed = self.patterns.redact(key);
        if scrubbed.chars().count() > MAX_KEY_LEN {
            scrubbed.chars().take(MAX_KEY_LEN).collect()
        } else {
            scrubbed
        }
    }

    fn truncate(&self, value: String) -> String {
        if value.chars().count() <= self.max_string_len {
            return value;
        }
        let keep = self.max_string_len - TRUNCATION_MARKER.chars().count();
        let mut out: String = value.chars().take(keep).collect();
        out.push_str(TRUNCATION_MARKER);
        out
    }
}

/// Stable pseudonym for a network address: the first 16 hex characters of
/// its SHA-256 digest.
pub fn pseudonymize(address: &str) -> String {
    let digest = Sha256::digest(address.trim().as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn redactor() -> Redactor {
        Redactor::new().unwrap()
    }

    fn max_depth(value: &Value) -> usize {
        match value {
            Value::Array(items) => 1 + items.iter().map(max_depth).max().unwrap_or(0),
            Value::Object(fields) => 1 + fields.values().map(max_depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    #[test]
    fn test_sensitive_keys_masked() {
        let out = redactor().redact(&json!({
            "prompt": "my symptoms are...",
            "patient_name": "Jane Doe",
            "Authorization": "Bearer abc.def.ghi",
            "failure_id": "f-1",
            "nested": {"firstName": "Jane", "message": ["a", "b"]},
        }));
        assert_eq!(out["prompt"], "[REDACTED_CONTENT]");
        assert_eq!(out["patient_name"], "[REDACTED_NAME]");
        assert_eq!(out["Authorization"], "[REDACTED_SECRET]");
        assert_eq!(out["failure_id"], "f-1");
        assert_eq!(out["nested"]["firstName"], "[REDACTED_NAME]");
        assert_eq!(out["nested"]["message"], "[REDACTED_CONTENT]");
    }

    #[test]
    fn test_null_sensitive_field_kept_null() {
        let out = redactor().redact(&json!({"token": null}));
        assert!(out["token"].is_null());
    }

    #[test]
    fn test_free_text_scrubbed() {
        let out = redactor().redact(&json!({"note": "reach me at a.b@c.io or 555-123-4567"}));
        assert_eq!(out["note"], "reach me at [REDACTED_EMAIL] or [REDACTED_PHONE]");
    }

    #[test]
    fn test_numeric_card_scrubbed() {
        let out = redactor().redact(&json!({"n": 4111111111111111u64, "count": 3}));
        assert_eq!(out["n"], "[REDACTED_CARD]");
        assert_eq!(out["count"], 3);
    }

    #[test]
    fn test_long_strings_truncated() {
        let out = redactor().redact(&json!({"ua": "x".repeat(1000)}));
        let ua = out["ua"].as_str().unwrap();
        assert_eq!(ua.chars().count(), DEFAULT_MAX_STRING_LEN);
        assert!(ua.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_depth_bounded() {
        let mut value = json!("leaf");
        for _ in 0..20 {
            value = json!({ "k": value });
        }
        let out = redactor().redact(&value);
        assert!(max_depth(&out) <= MAX_DEPTH + 1);
        assert!(out.to_string().contains(DEPTH_MARKER));
    }

    #[test]
    fn test_collections_bounded() {
        let items: Vec<u32> = (0..500).collect();
        let fields: Map<String, Value> = (0..500).map(|i| (format!("k{i}"), json!(i))).collect();
        let out = redactor().redact(&json!({"items": items, "fields": fields}));
        assert_eq!(out["items"].as_array().unwrap().len(), MAX_ENTRIES);
        assert_eq!(out["fields"].as_object().unwrap().len(), MAX_ENTRIES);
    }

    #[test]
    fn test_pseudonymize_is_stable() {
        let a = pseudonymize("203.0.113.7");
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, pseudonymize(" 203.0.113.7 "));
        assert_ne!(a, pseudonymize("203.0.113.8"));
    }
}
