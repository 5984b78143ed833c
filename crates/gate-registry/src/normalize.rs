//! # Host, Origin and Path Normalization
//!
//! Canonicalizes raw request strings before they are used as registry keys.
//! Two spellings of the same host, origin or path must produce the same key,
//! and anything that cannot be canonicalized safely is rejected outright.
//!
//! ## Threat Model
//!
//! | Threat | Example | Defense |
//! |--------|---------|---------|
//! | Case / port games | `Example.COM:443` | lowercase, strip port |
//! | Homograph hosts | `exаmple.com` (Cyrillic а) | IDNA to ASCII, charset check |
//! | Header smuggling | `a.com\r\nX-Evil: 1` | charset check |
//! | Path traversal | `/t/../other`, `%2e%2e` | segment check before and after normalization |
//! | Oversized input | 64KB host header | length bounds |
//!
//! All functions are pure. `None` and malformed input produce an empty string
//! or `false`, never a panic.
//!
//! ## Example
//!
//! ```rust
//! use gate_registry::normalize::{normalize_host, normalize_origin, validate_path};
//!
//! assert_eq!(normalize_host(Some("HTTPS://Healthcare.AI:8443/x")), "healthcare.ai");
//! assert_eq!(normalize_origin(Some("https://App.Example.com/page?q=1"), true), "https://app.example.com");
//! assert!(validate_path(Some("/healthcare/portal/patient/1"), &["/healthcare/portal"]));
//! assert!(!validate_path(Some("/healthcare/portal/../admin"), &["/healthcare"]));
//! ```

use url::{Host, Url};

/// Minimum accepted host length.
pub const MIN_HOST_LEN: usize = 3;

/// Maximum accepted host length.
pub const MAX_HOST_LEN: usize = 255;

/// Maximum accepted path length.
pub const MAX_PATH_LEN: usize = 1000;

/// Raw origin/host input is bounded before any parsing work is done.
const MAX_RAW_LEN: usize = 2048;

const MAX_LABEL_LEN: usize = 63;

/// Canonicalizes a host header value.
///
/// Strips scheme, userinfo, path, query, fragment and port, converts
/// internationalized names to ASCII and lowercases. Returns an empty string
/// when the result is not a plausible DNS name or IPv4 address.
///
/// Idempotent: `normalize_host(Some(&normalize_host(x))) == normalize_host(x)`.
#[must_use]
pub fn normalize_host(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > MAX_RAW_LEN {
        return String::new();
    }

    let without_scheme = match raw.find("://") {
        Some(idx) => &raw[idx + 3..],
        None => raw,
    };
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = match authority.rfind('@') {
        Some(idx) => &authority[idx + 1..],
        None => authority,
    };

    // IPv6 literals never identify a tenant.
    if host_port.starts_with('[') {
        return String::new();
    }
    let host = match host_port.split_once(':') {
        Some((host, port)) => {
            if port.contains(':') || !port.bytes().all(|b| b.is_ascii_digit()) {
                return String::new();
            }
            host
        }
        None => host_port,
    };

    let host = host.trim_end_matches('.');
    if host.is_empty() {
        return String::new();
    }

    let ascii = match Host::parse(host) {
        Ok(Host::Domain(domain)) => domain,
        Ok(Host::Ipv4(addr)) => addr.to_string(),
        Ok(Host::Ipv6(_)) | Err(_) => return String::new(),
    };
    let ascii = ascii.trim_end_matches('.').to_ascii_lowercase();

    if is_valid_host(&ascii) {
        ascii
    } else {
        String::new()
    }
}

fn is_valid_host(host: &str) -> bool {
    (MIN_HOST_LEN..=MAX_HOST_LEN).contains(&host.len())
        && host
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-')
        && host
            .split('.')
            .all(|label| !label.is_empty() && label.len() <= MAX_LABEL_LEN)
}

/// Canonicalizes an `Origin` (or `Referer`) header value.
///
/// Returns `"<scheme>://<normalized host>"`, dropping port, path, query and
/// fragment. Only `http` and `https` are accepted; with `require_https`
/// (production) plain `http` is rejected too. Returns an empty string on
/// any failure.
#[must_use]
pub fn normalize_origin(raw: Option<&str>, require_https: bool) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > MAX_RAW_LEN {
        return String::new();
    }

    let Ok(url) = Url::parse(raw) else {
        return String::new();
    };
    let scheme = url.scheme();
    match scheme {
        "https" => {}
        "http" if !require_https => {}
        _ => return String::new(),
    }

    let host = normalize_host(url.host_str());
    if host.is_empty() {
        return String::new();
    }
    format!("{scheme}://{host}")
}

/// Returns true if the raw path contains a parent-directory segment in any
/// spelling (`..`, percent-encoded, or backslash separated).
#[must_use]
pub fn is_traversal_attempt(raw: &str) -> bool {
    let lowered = raw.to_ascii_lowercase();
    if lowered.contains("%2e") || lowered.contains("%2f") || lowered.contains("%5c") {
        return true;
    }
    lowered.split(['/', '\\']).any(|segment| segment == "..")
}

/// Canonicalizes a URL path.
///
/// Collapses duplicate slashes and `.` segments and guarantees a leading
/// `/`. Returns `None` for paths over [`MAX_PATH_LEN`] characters, paths with
/// any parent-directory segment, or characters outside `[A-Za-z0-9/_-]`
/// after normalization.
#[must_use]
pub fn canonical_path(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.is_empty() || raw.chars().count() > MAX_PATH_LEN {
        return None;
    }
    if is_traversal_attempt(raw) {
        return None;
    }

    let segments: Vec<&str> = raw
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if segments.iter().any(|segment| *segment == "..") {
        return None;
    }

    let normalized = format!("/{}", segments.join("/"));
    let charset_ok = normalized
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'_' | b'-'));
    charset_ok.then_some(normalized)
}

fn is_segment_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Returns the longest allowed prefix that the canonical form of `raw`
/// starts with, on a segment boundary.
///
/// `/healthcare/portal` matches `/healthcare/portal/patient/1` but not
/// `/healthcare/portalx`.
#[must_use]
pub fn match_path_prefix<I>(raw: Option<&str>, allowed_prefixes: I) -> Option<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let path = canonical_path(raw)?;

    allowed_prefixes
        .into_iter()
        .filter_map(|prefix| canonical_path(Some(prefix.as_ref())))
        .filter(|prefix| is_segment_prefix(&path, prefix))
        .max_by_key(String::len)
}

/// Validates a request path against a list of allowed prefixes.
///
/// Paths containing a parent-directory segment are rejected regardless of
/// the prefix list.
#[must_use]
pub fn validate_path<I>(raw: Option<&str>, allowed_prefixes: I) -> bool
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    match_path_prefix(raw, allowed_prefixes).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Host
    // =========================================================================

    #[test]
    fn test_host_strips_scheme_port_and_path() {
        assert_eq!(normalize_host(Some("https://Example.com:8443/a/b?c#d")), "example.com");
        assert_eq!(normalize_host(Some("example.com:80")), "example.com");
        assert_eq!(normalize_host(Some("user:pw@example.com")), "example.com");
        assert_eq!(normalize_host(Some("  EXAMPLE.com.  ")), "example.com");
    }

    #[test]
    fn test_host_rejects_bad_input() {
        assert_eq!(normalize_host(None), "");
        assert_eq!(normalize_host(Some("")), "");
        assert_eq!(normalize_host(Some("ab")), "");
        assert_eq!(normalize_host(Some("exa mple.com")), "");
        assert_eq!(normalize_host(Some("a.com\r\nX-Injected: 1")), "");
        assert_eq!(normalize_host(Some("under_score.com")), "");
        assert_eq!(normalize_host(Some("[::1]:8080")), "");
        assert_eq!(normalize_host(Some("example.com:80:80")), "");
        assert_eq!(normalize_host(Some("example.com:http")), "");
        assert_eq!(normalize_host(Some("a..b.com")), "");
    }

    #[test]
    fn test_host_length_bounds() {
        let label = "a".repeat(60);
        let long = format!("{label}.{label}.{label}.{label}.{label}.com");
        assert!(long.len() > MAX_HOST_LEN);
        assert_eq!(normalize_host(Some(&long)), "");

        let too_long_label = format!("{}.com", "a".repeat(64));
        assert_eq!(normalize_host(Some(&too_long_label)), "");
    }

    #[test]
    fn test_host_idna() {
        assert_eq!(normalize_host(Some("bücher.example")), "xn--bcher-kva.example");
        assert_eq!(normalize_host(Some("xn--bcher-kva.example")), "xn--bcher-kva.example");
    }

    #[test]
    fn test_host_ipv4() {
        assert_eq!(normalize_host(Some("10.0.0.1:8080")), "10.0.0.1");
    }

    #[test]
    fn test_host_idempotent_examples() {
        for raw in ["HTTPS://A.B.C:1/x", "bücher.example", "10.0.0.1", "x", "healthcare.ai."] {
            let once = normalize_host(Some(raw));
            assert_eq!(normalize_host(Some(&once)), once, "not idempotent for {raw:?}");
        }
    }

    // =========================================================================
    // Origin
    // =========================================================================

    #[test]
    fn test_origin_strips_path_and_port() {
        assert_eq!(
            normalize_origin(Some("https://Portal.Healthcare.ai:443/login?next=/x#top"), true),
            "https://portal.healthcare.ai"
        );
    }

    #[test]
    fn test_origin_https_enforcement() {
        assert_eq!(normalize_origin(Some("http://app.example.com"), true), "");
        assert_eq!(
            normalize_origin(Some("http://app.example.com"), false),
            "http://app.example.com"
        );
    }

    #[test]
    fn test_origin_rejects_other_schemes() {
        assert_eq!(normalize_origin(Some("javascript:alert(1)"), false), "");
        assert_eq!(normalize_origin(Some("file:///etc/passwd"), false), "");
        assert_eq!(normalize_origin(Some("null"), false), "");
        assert_eq!(normalize_origin(None, false), "");
    }

    // =========================================================================
    // Path
    // =========================================================================

    #[test]
    fn test_canonical_path_collapses() {
        assert_eq!(canonical_path(Some("//a///b/./c/")).as_deref(), Some("/a/b/c"));
        assert_eq!(canonical_path(Some("a/b")).as_deref(), Some("/a/b"));
        assert_eq!(canonical_path(Some("/")).as_deref(), Some("/"));
    }

    #[test]
    fn test_canonical_path_rejects() {
        assert!(canonical_path(None).is_none());
        assert!(canonical_path(Some("")).is_none());
        assert!(canonical_path(Some("/a/../b")).is_none());
        assert!(canonical_path(Some("/a/%2e%2e/b")).is_none());
        assert!(canonical_path(Some("/a/..\\b")).is_none());
        assert!(canonical_path(Some("/a/b.json")).is_none());
        assert!(canonical_path(Some("/a/b?x=1")).is_none());
        assert!(canonical_path(Some("/a b")).is_none());
        assert!(canonical_path(Some(&format!("/{}", "a".repeat(MAX_PATH_LEN)))).is_none());
    }

    #[test]
    fn test_path_prefix_segment_boundary() {
        let prefixes = ["/healthcare/portal"];
        assert!(validate_path(Some("/healthcare/portal"), prefixes));
        assert!(validate_path(Some("/healthcare/portal/patient/1"), prefixes));
        assert!(!validate_path(Some("/healthcare/portalx"), prefixes));
        assert!(!validate_path(Some("/other"), prefixes));
    }

    #[test]
    fn test_path_longest_prefix_wins() {
        let prefixes = vec!["/health".to_string(), "/health/portal".to_string()];
        assert_eq!(
            match_path_prefix(Some("/health/portal/x"), &prefixes).as_deref(),
            Some("/health/portal")
        );
        assert_eq!(match_path_prefix(Some("/health/other"), &prefixes).as_deref(), Some("/health"));
    }

    #[test]
    fn test_traversal_rejected_even_with_root_prefix() {
        assert!(!validate_path(Some("/../../etc/passwd"), ["/"]));
        assert!(!validate_path(Some("/a/.."), ["/", "/a"]));
    }
}
