//! Per-source failure window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Failure timestamps for one source, oldest first.
///
/// # Security Notes
///
/// The window never holds more than `capacity` entries. Once a source is at
/// the threshold, further failures replace the oldest entry instead of
/// growing the buffer, so a flood costs constant memory per source.
#[derive(Debug, Clone)]
pub struct FailureWindow {
    failures: VecDeque<Instant>,
    capacity: usize,
}

impl FailureWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            failures: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Drops entries at or before `now - window`.
    pub fn prune(&mut self, window: Duration, now: Instant) {
        while let Some(oldest) = self.failures.front() {
            if now.saturating_duration_since(*oldest) >= window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records one failure at `now`, keeping the newest `capacity` entries.
    pub fn record(&mut self, window: Duration, now: Instant) {
        self.prune(window, now);
        if self.failures.len() == self.capacity {
            self.failures.pop_front();
        }
        self.failures.push_back(now);
    }

    /// Failures inside the window ending at `now`.
    pub fn count(&mut self, window: Duration, now: Instant) -> usize {
        self.prune(window, now);
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Timestamp of the most recent failure.
    pub fn newest(&self) -> Option<Instant> {
        self.failures.back().copied()
    }
}
