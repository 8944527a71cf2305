//! Minimum-spacing rate limiter for outbound upstream calls.
//!
//! This is a pacing aid, not a mutual-exclusion lock: the stamp lock
//! is released before the sleep, so two fetches running concurrently
//! may both observe a stale stamp and proceed without waiting. The
//! upstream tolerates that burst; sequential callers are what matter
//! here and they are spaced at least `min_interval` apart.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct RateState {
    last_request: Option<Instant>,
    last_request_utc: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<RateState>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            state: Mutex::new(RateState::default()),
            min_interval,
        }
    }

    /// Wait until at least `min_interval` has passed since the start
    /// of the previous call, then stamp the current time.
    pub async fn wait_turn(&self) {
        let wait = {
            let state = self.state.lock().await;
            state
                .last_request
                .and_then(|last| self.min_interval.checked_sub(last.elapsed()))
        };

        if let Some(remaining) = wait {
            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }
        }

        let mut state = self.state.lock().await;
        state.last_request = Some(Instant::now());
        state.last_request_utc = Some(Utc::now());
    }

    /// Wall-clock time of the most recent network call, for health
    /// snapshots. The lock is only held for the read itself.
    pub async fn last_request_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.last_request_utc
    }
}
