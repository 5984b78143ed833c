//! Sliding-window rate limiter keyed by request source.

use crate::window::FailureWindow;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Bucket used when the source is missing or blank.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Longest source id kept as a bucket key.
pub const MAX_SOURCE_LEN: usize = 64;

/// Expired buckets are swept after this many recorded failures.
pub const SWEEP_INTERVAL: u64 = 256;

/// Rate limit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sliding window length in seconds.
    pub window_secs: u64,
    /// Failures within the window at which a source is limited.
    pub threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 300,
            threshold: 10,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Maps a raw source address to its bucket key.
///
/// Blank or missing sources share the [`UNKNOWN_SOURCE`] bucket. Keys are
/// lowercased and capped at [`MAX_SOURCE_LEN`] characters so hostile input
/// cannot inflate per-bucket memory.
pub fn source_bucket(source: Option<&str>) -> String {
    match source.map(str::trim) {
        Some(s) if !s.is_empty() => s.chars().take(MAX_SOURCE_LEN).collect::<String>().to_lowercase(),
        _ => UNKNOWN_SOURCE.to_string(),
    }
}

/// Counts resolution failures per source and limits noisy sources.
///
/// # Security Notes
///
/// - A source is limited when its failure count in the window reaches the
///   threshold. Successes never reset the count.
/// - Shared across concurrent requests; all state lives in a [`DashMap`] and
///   no shard lock is held while another is taken.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, FailureWindow>,
    recorded: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            recorded: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether `source` has reached the failure threshold.
    pub fn is_limited(&self, source: &str) -> bool {
        self.is_limited_at(source, Instant::now())
    }

    /// [`is_limited`](Self::is_limited) at a fixed instant.
    pub fn is_limited_at(&self, source: &str, now: Instant) -> bool {
        let count = self.count_at(source, now);
        let limited = count >= self.config.threshold;
        if limited {
            debug!(source, count, "source is rate limited");
        }
        limited
    }

    /// Records one failure for `source` and returns the count in the window.
    pub fn record_failure(&self, source: &str) -> usize {
        self.record_failure_at(source, Instant::now())
    }

    /// [`record_failure`](Self::record_failure) at a fixed instant.
    pub fn record_failure_at(&self, source: &str, now: Instant) -> usize {
        let window = self.config.window();
        let count = {
            let mut entry = self
                .windows
                .entry(source.to_string())
                .or_insert_with(|| FailureWindow::new(self.config.threshold));
            entry.record(window, now);
            entry.count(window, now)
        };

        if count == self.config.threshold {
            warn!(source, threshold = self.config.threshold, "source reached failure threshold");
        }

        let recorded = self.recorded.fetch_add(1, Ordering::Relaxed) + 1;
        if recorded % SWEEP_INTERVAL == 0 {
            self.sweep_at(now);
        }
        count
    }

    /// Failures recorded for `source` in the current window.
    pub fn count_at(&self, source: &str, now: Instant) -> usize {
        let window = self.config.window();
        let count = match self.windows.get_mut(source) {
            Some(mut entry) => entry.count(window, now),
            None => return 0,
        };
        if count == 0 {
            self.windows.remove_if(source, |_, w| w.is_empty());
        }
        count
    }

    /// Clears the history for `source`.
    pub fn reset(&self, source: &str) {
        self.windows.remove(source);
    }

    /// Removes buckets whose failures have all aged out.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// [`sweep`](Self::sweep) at a fixed instant. Returns buckets removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let window = self.config.window();
        let before = self.windows.len();
        self.windows.retain(|_, w| {
            w.prune(window, now);
            !w.is_empty()
        });
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(removed, "swept expired rate limit buckets");
        }
        removed
    }

    /// Number of sources currently tracked.
    pub fn tracked_sources(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(threshold: usize) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window_secs: 300,
            threshold,
        })
    }

    #[test]
    fn test_limited_at_threshold() {
        let limiter = limiter(3);
        let now = Instant::now();
        for _ in 0..2 {
            limiter.record_failure_at("10.0.0.1", now);
        }
        assert!(!limiter.is_limited_at("10.0.0.1", now));

        limiter.record_failure_at("10.0.0.1", now);
        assert!(limiter.is_limited_at("10.0.0.1", now));
        assert!(!limiter.is_limited_at("10.0.0.2", now));
    }

    #[test]
    fn test_window_expiry_lifts_limit() {
        let limiter = limiter(2);
        let start = Instant::now();
        limiter.record_failure_at("src", start);
        limiter.record_failure_at("src", start + Duration::from_secs(10));
        assert!(limiter.is_limited_at("src", start + Duration::from_secs(20)));

        assert!(!limiter.is_limited_at("src", start + Duration::from_secs(305)));
        assert!(!limiter.is_limited_at("src", start + Duration::from_secs(400)));
        assert_eq!(limiter.tracked_sources(), 0);
    }

    #[test]
    fn test_reset_clears_source() {
        let limiter = limiter(1);
        limiter.record_failure("src");
        assert!(limiter.is_limited("src"));
        limiter.reset("src");
        assert!(!limiter.is_limited("src"));
    }

    #[test]
    fn test_sweep_removes_expired_buckets() {
        let limiter = limiter(5);
        let start = Instant::now();
        limiter.record_failure_at("old", start);
        limiter.record_failure_at("new", start + Duration::from_secs(250));

        assert_eq!(limiter.sweep_at(start + Duration::from_secs(320)), 1);
        assert_eq!(limiter.tracked_sources(), 1);
    }

    #[test]
    fn test_periodic_sweep() {
        let limiter = limiter(1);
        let start = Instant::now();
        for i in 0..(SWEEP_INTERVAL - 1) {
            limiter.record_failure_at(&format!("src-{i}"), start);
        }
        assert_eq!(limiter.tracked_sources(), (SWEEP_INTERVAL - 1) as usize);

        limiter.record_failure_at("late", start + Duration::from_secs(600));
        assert_eq!(limiter.tracked_sources(), 1);
    }

    #[test]
    fn test_source_bucket() {
        assert_eq!(source_bucket(None), UNKNOWN_SOURCE);
        assert_eq!(source_bucket(Some("   ")), UNKNOWN_SOURCE);
        assert_eq!(source_bucket(Some(" 2001:DB8::1 ")), "2001:db8::1");
        assert_eq!(source_bucket(Some(&"a".repeat(500))).len(), MAX_SOURCE_LEN);
    }
}
