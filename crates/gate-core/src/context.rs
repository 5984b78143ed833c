//! Request context handed to the resolver.

use crate::config::RequestConfig;
use std::collections::HashMap;
use std::fmt;

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialSource {
    /// `Authorization: Bearer <token>`.
    AuthorizationHeader,
    /// The configured token header.
    TokenHeader,
    /// The configured query parameter.
    QueryParam,
}

impl CredentialSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationHeader => "authorization_header",
            Self::TokenHeader => "token_header",
            Self::QueryParam => "query_param",
        }
    }
}

/// Outcome of looking for a bearer credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractedCredential<'a> {
    /// No credential anywhere.
    Absent,
    /// The first credential found, in preference order.
    Present { source: CredentialSource, token: &'a str },
    /// The first candidate carried CR, LF or NUL.
    Injected { source: CredentialSource },
}

/// Whether a raw header value carries line-break or NUL characters.
pub fn has_injection_chars(value: &str) -> bool {
    value.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0))
}

/// Everything the resolver may look at for one request.
///
/// Header names are case-insensitive. The `Debug` output never includes
/// header values or query parameters, which may carry credentials.
#[derive(Clone, Default)]
pub struct RequestContext {
    headers: HashMap<String, String>,
    path: Option<String>,
    query: HashMap<String, String>,
    source_addr: Option<String>,
    user_agent: Option<String>,
    correlation_id: Option<String>,
}

impl RequestContext {
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn host(&self) -> Option<&str> {
        self.header("host")
    }

    /// `Origin`, falling back to `Referer`.
    pub fn origin(&self) -> Option<&str> {
        self.header("origin").or_else(|| self.header("referer"))
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn source_addr(&self) -> Option<&str> {
        self.source_addr.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref().or_else(|| self.header("user-agent"))
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id
            .as_deref()
            .or_else(|| self.header("x-correlation-id"))
            .or_else(|| self.header("x-request-id"))
    }

    /// Finds the bearer credential.
    ///
    /// Preference order: `Authorization: Bearer`, the token header, the
    /// token query parameter. The first non-empty candidate decides; a
    /// candidate with injection characters is reported, not skipped.
    pub fn credential(&self, config: &RequestConfig) -> ExtractedCredential<'_> {
        if let Some(raw) = self.header("authorization") {
            if has_injection_chars(raw) {
                return ExtractedCredential::Injected {
                    source: CredentialSource::AuthorizationHeader,
                };
            }
            if let Some(token) = bearer_token(raw) {
                return ExtractedCredential::Present {
                    source: CredentialSource::AuthorizationHeader,
                    token,
                };
            }
        }

        let candidates = [
            (CredentialSource::TokenHeader, self.header(&config.token_header)),
            (CredentialSource::QueryParam, self.query_param(&config.token_query_param)),
        ];
        for (source, raw) in candidates {
            let Some(raw) = raw else { continue };
            if has_injection_chars(raw) {
                return ExtractedCredential::Injected { source };
            }
            let token = raw.trim();
            if !token.is_empty() {
                return ExtractedCredential::Present { source, token };
            }
        }

        ExtractedCredential::Absent
    }
}

fn bearer_token(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header_names: Vec<&str> = self.headers.keys().map(String::as_str).collect();
        header_names.sort_unstable();
        let mut query_names: Vec<&str> = self.query.keys().map(String::as_str).collect();
        query_names.sort_unstable();
        f.debug_struct("RequestContext")
            .field("headers", &header_names)
            .field("path", &self.path)
            .field("query", &query_names)
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RequestContext`].
#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    inner: RequestContext,
}

impl RequestContextBuilder {
    /// Adds a header. A repeated name replaces the earlier value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.inner
            .headers
            .insert(name.as_ref().trim().to_ascii_lowercase(), value.into());
        self
    }

    pub fn host(self, host: impl Into<String>) -> Self {
        self.header("host", host)
    }

    pub fn origin(self, origin: impl Into<String>) -> Self {
        self.header("origin", origin)
    }

    pub fn bearer(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header("authorization", value)
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inner.path = Some(path.into());
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.query.insert(name.into(), value.into());
        self
    }

    pub fn source_addr(mut self, addr: impl Into<String>) -> Self {
        self.inner.source_addr = Some(addr.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.inner.user_agent = Some(user_agent.into());
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.inner.correlation_id = Some(id.into());
        self
    }

    pub fn build(self) -> RequestContext {
        self.inner
    }
}
