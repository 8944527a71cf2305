//! Service configuration types.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// OpenF1 API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Response cache parameters.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Outbound request pacing.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Health tracking parameters.
    #[serde(default)]
    pub health: HealthConfig,

    /// HTTP client parameters.
    #[serde(default)]
    pub http: HttpConfig,

    /// Snapshot poll loop parameters.
    #[serde(default)]
    pub poll: PollConfig,
}

/// Cache freshness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default TTL applied to every endpoint (seconds).
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_secs: u64,

    /// Per-endpoint TTL overrides, keyed by endpoint name.
    #[serde(default)]
    pub endpoint_ttl_secs: HashMap<String, u64>,
}

impl CacheConfig {
    /// Effective TTL for an endpoint.
    pub fn ttl_for(&self, endpoint: &str) -> Duration {
        let secs = self
            .endpoint_ttl_secs
            .get(endpoint)
            .copied()
            .unwrap_or(self.default_ttl_secs);
        Duration::from_secs(secs)
    }
}

/// Self-imposed pacing on outbound upstream calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Minimum spacing between network calls (milliseconds).
    #[serde(default = "default_min_interval")]
    pub min_request_interval_ms: u64,

    /// Fixed back-off after an upstream 429 (milliseconds).
    #[serde(default = "default_rate_limited_backoff")]
    pub rate_limited_backoff_ms: u64,

    /// Pause between the stream fetches of one aggregation pass
    /// (milliseconds), on top of the rate limiter.
    #[serde(default = "default_stream_pause")]
    pub stream_pause_ms: u64,
}

/// Consecutive-failure threshold before the service reports unhealthy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Total per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connect timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Identifying User-Agent sent on every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Snapshot poll loop settings for the service binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval between aggregation passes (seconds).
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://api.openf1.org/v1".into()
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_min_interval() -> u64 {
    500
}
fn default_rate_limited_backoff() -> u64 {
    5000
}
fn default_stream_pause() -> u64 {
    200
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_request_timeout() -> u64 {
    10
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_user_agent() -> String {
    "pitwall/0.1 (live timing aggregator)".into()
}

fn default_snapshot_interval() -> u64 {
    5
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_cache_ttl(),
            endpoint_ttl_secs: HashMap::new(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_request_interval_ms: default_min_interval(),
            rate_limited_backoff_ms: default_rate_limited_backoff(),
            stream_pause_ms: default_stream_pause(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_secs: default_snapshot_interval(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cache: CacheConfig::default(),
            pacing: PacingConfig::default(),
            health: HealthConfig::default(),
            http: HttpConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_override_beats_default_ttl() {
        let mut cache = CacheConfig::default();
        cache.endpoint_ttl_secs.insert("position".into(), 5);

        assert_eq!(cache.ttl_for("position"), Duration::from_secs(5));
        assert_eq!(cache.ttl_for("laps"), Duration::from_secs(60));
    }
}
