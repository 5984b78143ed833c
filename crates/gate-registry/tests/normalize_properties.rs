//! Property tests for request-string normalization.

use gate_registry::normalize::{canonical_path, normalize_host, validate_path};
use proptest::prelude::*;

proptest! {
    #[test]
    fn host_normalization_is_idempotent(raw in ".{0,80}") {
        let once = normalize_host(Some(&raw));
        prop_assert_eq!(normalize_host(Some(&once)), once);
    }

    #[test]
    fn host_like_inputs_are_idempotent(raw in "(https?://)?[A-Za-z0-9.-]{1,40}(:[0-9]{1,5})?(/[a-z]{0,10})?") {
        let once = normalize_host(Some(&raw));
        prop_assert_eq!(normalize_host(Some(&once)), once);
    }

    #[test]
    fn normalized_hosts_use_restricted_charset(raw in ".{0,80}") {
        let host = normalize_host(Some(&raw));
        prop_assert!(host.is_empty() || (3..=255).contains(&host.len()));
        prop_assert!(host.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-'));
    }

    #[test]
    fn traversal_always_rejected(
        head in "(/[a-z0-9_-]{1,8}){0,4}",
        tail in "(/[a-z0-9_-]{1,8}){0,4}",
        prefixes in proptest::collection::vec("(/[a-z0-9_-]{1,8}){0,3}", 0..4),
    ) {
        let path = format!("{head}/..{tail}");
        let mut allowed = prefixes;
        allowed.push("/".to_string());
        prop_assert!(!validate_path(Some(&path), &allowed));
    }

    #[test]
    fn canonical_paths_are_stable(raw in "(/{1,2}[a-zA-Z0-9_-]{0,8}){0,6}") {
        if let Some(once) = canonical_path(Some(&raw)) {
            prop_assert_eq!(canonical_path(Some(&once)), Some(once.clone()));
            prop_assert!(once.starts_with('/'));
            prop_assert!(!once.contains("//"));
        }
    }
}
