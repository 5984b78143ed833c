//! # PII Pattern Tables
//!
//! Value patterns find personal data inside free-form strings. Key sets
//! mark object fields whose whole value is sensitive regardless of what it
//! looks like.
//!
//! | Kind | Matched by | Marker |
//! |------|------------|--------|
//! | Email | value pattern | `[REDACTED_EMAIL]` |
//! | Card | value pattern, 13-19 digits | `[REDACTED_CARD]` |
//! | GovId | value pattern, `NNN-NN-NNNN` | `[REDACTED_GOV_ID]` |
//! | Phone | value pattern, NANP shapes | `[REDACTED_PHONE]` |
//! | Content | key name | `[REDACTED_CONTENT]` |
//! | Name | key name | `[REDACTED_NAME]` |
//! | Secret | key name | `[REDACTED_SECRET]` |
//!
//! Value patterns run in table order. Cards run before phones so a card
//! number is never half-consumed as a phone number.

use crate::error::{AuditError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category of personal or sensitive data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiKind {
    Email,
    Card,
    GovId,
    Phone,
    Content,
    Name,
    Secret,
}

impl PiiKind {
    /// Replacement written in place of the sensitive data.
    #[must_use]
    pub const fn marker(&self) -> &'static str {
        match self {
            Self::Email => "[REDACTED_EMAIL]",
            Self::Card => "[REDACTED_CARD]",
            Self::GovId => "[REDACTED_GOV_ID]",
            Self::Phone => "[REDACTED_PHONE]",
            Self::Content => "[REDACTED_CONTENT]",
            Self::Name => "[REDACTED_NAME]",
            Self::Secret => "[REDACTED_SECRET]",
        }
    }
}

/// Field names whose values are conversational content.
pub const CONTENT_KEYS: &[&str] = &[
    "message",
    "messages",
    "prompt",
    "response",
    "conversation",
    "transcript",
    "content",
    "query",
    "body",
];

/// Field names whose values are personal names.
pub const NAME_KEYS: &[&str] = &[
    "name",
    "first_name",
    "last_name",
    "full_name",
    "patient_name",
    "display_name",
    "firstname",
    "lastname",
    "given_name",
    "family_name",
];

/// Field names whose values are credentials.
pub const SECRET_KEYS: &[&str] = &[
    "token",
    "authorization",
    "password",
    "secret",
    "credential",
    "api_key",
    "apikey",
    "cookie",
];

/// Classifies an object key, case- and separator-insensitively.
///
/// `firstName`, `First-Name` and `first_name` all map to the same set.
pub fn classify_key(key: &str) -> Option<PiiKind> {
    let folded = fold_key(key);
    let folded = folded.as_str();
    if SECRET_KEYS.iter().any(|k| fold_key(k) == folded) {
        Some(PiiKind::Secret)
    } else if CONTENT_KEYS.iter().any(|k| fold_key(k) == folded) {
        Some(PiiKind::Content)
    } else if NAME_KEYS.iter().any(|k| fold_key(k) == folded) {
        Some(PiiKind::Name)
    } else {
        None
    }
}

fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Compiled value pattern.
#[derive(Debug, Clone)]
pub struct ValuePattern {
    pub kind: PiiKind,
    pub regex: Regex,
}

/// Value patterns in application order.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<ValuePattern>,
}

impl PatternSet {
    /// Compiles the built-in pattern table.
    pub fn new() -> Result<Self> {
        let table: [(&'static str, PiiKind, &str); 4] = [
            (
                "email",
                PiiKind::Email,
                r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b",
            ),
            ("card", PiiKind::Card, r"\b\d(?:[ -]?\d){12,18}\b"),
            ("gov_id", PiiKind::GovId, r"\b\d{3}-\d{2}-\d{4}\b"),
            (
                "phone",
                PiiKind::Phone,
                r"(?:\+?\b1[-. ]?)?(?:\(\d{3}\)|\b\d{3})[-. ]?\d{3}[-. ]?\d{4}\b",
            ),
        ];

        let patterns = table
            .into_iter()
            .map(|(name, kind, pattern)| {
                Regex::new(pattern)
                    .map(|regex| ValuePattern { kind, regex })
                    .map_err(|source| AuditError::Pattern { name, source })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Replaces every match in `value` with its kind's marker.
    pub fn redact(&self, value: &str) -> String {
        let mut out = value.to_string();
        for pattern in &self.patterns {
            if pattern.regex.is_match(&out) {
                out = pattern.regex.replace_all(&out, pattern.kind.marker()).into_owned();
            }
        }
        out
    }

    /// Kinds whose pattern matches `value`.
    pub fn detect(&self, value: &str) -> Vec<PiiKind> {
        self.patterns
            .iter()
            .filter(|p| p.regex.is_match(value))
            .map(|p| p.kind)
            .collect()
    }

    pub fn patterns(&self) -> &[ValuePattern] {
        &self.patterns
    }
}
