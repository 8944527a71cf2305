//! OpenF1 API client with response caching, request pacing and health
//! tracking.
//!
//! Every logical fetch runs the same pipeline: consult the cache,
//! wait for a rate-limiter turn, hit the network, then update health
//! and cache. Ordinary upstream failures never surface as errors —
//! callers always get back *some* record list (possibly a stale cached
//! one, possibly empty) and consult [`OpenF1Client::health_snapshot`]
//! separately for liveness.

pub mod cache;
pub mod health;
pub mod rate_limit;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use common::config::ServiceConfig;
use common::{Driver, HealthStatus, Interval, Lap, PitStop, Position, Session, Stint};

use crate::cache::{cache_key, ResponseCache};
use crate::health::HealthTracker;
use crate::rate_limit::RateLimiter;
use crate::transport::{HttpBackend, ReqwestBackend};

/// Outcome of one logical fetch.
///
/// `degraded` marks records served from a stale cache entry (or an
/// empty list) after an upstream failure, so callers that care can
/// tell fallback apart from genuine emptiness.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub records: Vec<Value>,
    pub degraded: bool,
}

impl Fetched {
    fn fresh(records: Vec<Value>) -> Self {
        Self {
            records,
            degraded: false,
        }
    }

    fn degraded(records: Vec<Value>) -> Self {
        Self {
            records,
            degraded: true,
        }
    }
}

/// Async client for the OpenF1 telemetry API.
pub struct OpenF1Client {
    backend: Arc<dyn HttpBackend>,
    cache: ResponseCache,
    limiter: RateLimiter,
    health: HealthTracker,
    config: ServiceConfig,
}

impl OpenF1Client {
    pub fn new(config: ServiceConfig) -> Self {
        let backend = Arc::new(ReqwestBackend::new(&config.http));
        Self::with_backend(config, backend)
    }

    /// Construct with a custom transport; used by tests.
    pub fn with_backend(config: ServiceConfig, backend: Arc<dyn HttpBackend>) -> Self {
        let limiter = RateLimiter::new(Duration::from_millis(
            config.pacing.min_request_interval_ms,
        ));
        let health = HealthTracker::new(config.health.failure_threshold);

        Self {
            backend,
            cache: ResponseCache::new(),
            limiter,
            health,
            config,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// One logical fetch: cache, then rate limiter, then network.
    pub async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Fetched {
        let key = cache_key(endpoint, params);
        let ttl = self.config.cache.ttl_for(endpoint);

        if let Some(entry) = self.cache.get(&key) {
            if entry.is_fresh(ttl) {
                debug!(endpoint, "cache hit");
                return Fetched::fresh(entry.payload);
            }
        }

        self.limiter.wait_turn().await;

        let url = self.url(endpoint);
        match self.backend.get_json(&url, params).await {
            Ok(reply) if reply.status == 200 => {
                let records = normalize_payload(reply.body);
                debug!(endpoint, count = records.len(), "upstream ok");
                self.cache.put(key, records.clone());
                self.health.record_success();
                Fetched::fresh(records)
            }
            Ok(reply) if reply.status == 429 => {
                // Upstream throttling is not a health failure; back off
                // briefly and serve whatever we still have.
                warn!(endpoint, "rate limited by upstream");
                tokio::time::sleep(Duration::from_millis(
                    self.config.pacing.rate_limited_backoff_ms,
                ))
                .await;
                self.stale_or_empty(&key, endpoint)
            }
            Ok(reply) if reply.status == 404 => {
                debug!(endpoint, "no data for this query");
                Fetched::fresh(Vec::new())
            }
            Ok(reply) => {
                error!(endpoint, status = reply.status, "upstream error");
                self.health.record_failure();
                self.stale_or_empty(&key, endpoint)
            }
            Err(e) => {
                error!(endpoint, error = %e, "request failed");
                self.health.record_failure();
                self.stale_or_empty(&key, endpoint)
            }
        }
    }

    fn stale_or_empty(&self, key: &str, endpoint: &str) -> Fetched {
        match self.cache.get(key) {
            Some(entry) => {
                debug!(endpoint, "serving stale cache entry");
                Fetched::degraded(entry.payload)
            }
            None => Fetched::degraded(Vec::new()),
        }
    }

    /// Fetch and deserialize, dropping individually malformed records.
    async fn fetch_typed<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Vec<T> {
        let fetched = self.fetch(endpoint, params).await;
        let mut out = Vec::with_capacity(fetched.records.len());
        for value in fetched.records {
            match serde_json::from_value::<T>(value) {
                Ok(record) => out.push(record),
                Err(e) => warn!(endpoint, error = %e, "skipping malformed record"),
            }
        }
        out
    }

    // ── Stream accessors ──────────────────────────────────────────────

    pub async fn get_drivers(&self, session_key: &str) -> Vec<Driver> {
        self.fetch_typed("drivers", &[("session_key", session_key)])
            .await
    }

    pub async fn get_positions(&self, session_key: &str) -> Vec<Position> {
        self.fetch_typed("position", &[("session_key", session_key)])
            .await
    }

    pub async fn get_intervals(&self, session_key: &str) -> Vec<Interval> {
        self.fetch_typed("intervals", &[("session_key", session_key)])
            .await
    }

    pub async fn get_laps(&self, session_key: &str) -> Vec<Lap> {
        self.fetch_typed("laps", &[("session_key", session_key)])
            .await
    }

    pub async fn get_stints(&self, session_key: &str) -> Vec<Stint> {
        self.fetch_typed("stints", &[("session_key", session_key)])
            .await
    }

    pub async fn get_pit_stops(&self, session_key: &str) -> Vec<PitStop> {
        self.fetch_typed("pit", &[("session_key", session_key)]).await
    }

    // ── Session discovery ─────────────────────────────────────────────

    /// Find the most recent session: try `session_key=latest` first,
    /// then fall back to the current year's sessions sorted by start
    /// date.
    pub async fn get_latest_session(&self) -> Option<Session> {
        let sessions: Vec<Session> = self
            .fetch_typed("sessions", &[("session_key", "latest")])
            .await;
        if let Some(session) = sessions.into_iter().next() {
            debug!(
                session_key = session.session_key,
                name = %session.session_name,
                "found latest session"
            );
            return Some(session);
        }

        let year = Utc::now().year().to_string();
        let mut sessions: Vec<Session> = self
            .fetch_typed("sessions", &[("year", year.as_str())])
            .await;
        sessions.sort_by_key(|s| s.date_start);
        let latest = sessions.pop();
        if let Some(ref session) = latest {
            debug!(
                session_key = session.session_key,
                name = %session.session_name,
                "fallback session from year query"
            );
        }
        latest
    }

    // ── Health ────────────────────────────────────────────────────────

    pub async fn health_snapshot(&self) -> HealthStatus {
        HealthStatus {
            is_healthy: self.health.is_healthy(),
            consecutive_failures: self.health.consecutive_failures(),
            cached_keys: self.cache.len(),
            last_request_at: self.limiter.last_request_at().await,
        }
    }
}

/// Normalize an upstream body into a record list: arrays pass through,
/// a single object becomes a one-element list, anything else is empty.
fn normalize_payload(body: Option<Value>) -> Vec<Value> {
    match body {
        Some(Value::Array(records)) => records,
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![single],
    }
}
