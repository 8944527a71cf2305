//! Consecutive-failure health tracking.
//!
//! Atomics only, so the health flag is readable at any time without
//! blocking on in-flight fetches.

use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
pub struct HealthTracker {
    failures: AtomicU32,
    threshold: u32,
}

impl HealthTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            failures: AtomicU32::new(0),
            threshold,
        }
    }

    /// Any successful upstream call resets the service to healthy.
    pub fn record_success(&self) {
        self.failures.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Invariant: healthy exactly while failures stay below threshold.
    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures() < self.threshold
    }
}
