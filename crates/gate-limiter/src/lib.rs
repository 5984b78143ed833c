//! # Gate Limiter - Failure Rate Limiting
//!
//! Counts failed tenant resolutions per request source and stops a source
//! once it has failed too often within a sliding window.
//!
//! ## Threat Model
//!
//! | Threat | Defense |
//! |--------|---------|
//! | Tenant hash enumeration | Failures counted per source, limit after threshold |
//! | Credential brute force | Same counter; a limited source is denied before validation |
//! | Memory exhaustion via many sources | Bounded windows, capped keys, periodic sweep |
//!
//! ## Quick Start
//!
//! ```rust
//! use gate_limiter::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig { window_secs: 300, threshold: 2 });
//! limiter.record_failure("203.0.113.7");
//! limiter.record_failure("203.0.113.7");
//! assert!(limiter.is_limited("203.0.113.7"));
//! ```
//!
//! ## Security Notes
//!
//! - The check runs before any resolution method
//! - A limited request does not extend its own window

mod limiter;
mod window;

pub use limiter::{source_bucket, RateLimitConfig, RateLimiter, MAX_SOURCE_LEN, SWEEP_INTERVAL, UNKNOWN_SOURCE};
pub use window::FailureWindow;
