//! Domain types shared across the service.
//!
//! The upstream-facing structs mirror the OpenF1 API payloads. Every
//! non-key field defaults so a sparse record still deserializes; the
//! aggregator treats missing values as "no data yet".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── OpenF1 stream records ─────────────────────────────────────────────

/// A driver as returned by GET /v1/drivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub driver_number: u32,
    #[serde(default)]
    pub broadcast_name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub name_acronym: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub team_colour: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub headshot_url: Option<String>,
}

/// A track-position sample from GET /v1/position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub driver_number: u32,
    pub position: u32,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// A gap/interval sample from GET /v1/intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interval {
    pub driver_number: u32,
    #[serde(default)]
    pub gap_to_leader: Option<f64>,
    #[serde(default)]
    pub interval: Option<f64>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// A completed (or in-progress) lap from GET /v1/laps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lap {
    pub driver_number: u32,
    pub lap_number: u32,
    #[serde(default)]
    pub lap_duration: Option<f64>,
    #[serde(default)]
    pub duration_sector_1: Option<f64>,
    #[serde(default)]
    pub duration_sector_2: Option<f64>,
    #[serde(default)]
    pub duration_sector_3: Option<f64>,
    #[serde(default)]
    pub is_pit_out_lap: bool,
    #[serde(default)]
    pub date_start: Option<DateTime<Utc>>,
}

/// A tyre stint from GET /v1/stints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stint {
    pub driver_number: u32,
    pub stint_number: u32,
    #[serde(default)]
    pub compound: String,
    #[serde(default)]
    pub lap_start: u32,
    #[serde(default)]
    pub lap_end: Option<u32>,
    #[serde(default)]
    pub tyre_age_at_start: u32,
}

/// A pit-stop event from GET /v1/pit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitStop {
    pub driver_number: u32,
    #[serde(default)]
    pub lap_number: u32,
    #[serde(default)]
    pub pit_duration: Option<f64>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// A session as returned by GET /v1/sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_key: i64,
    #[serde(default)]
    pub meeting_key: i64,
    #[serde(default)]
    pub session_name: String,
    #[serde(default)]
    pub session_type: String,
    #[serde(default)]
    pub circuit_short_name: String,
    #[serde(default)]
    pub country_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub date_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub year: i32,
}

// ── Aggregated output ─────────────────────────────────────────────────

/// One driver's fused timing row, rebuilt from scratch each pass.
#[derive(Debug, Clone, Serialize)]
pub struct DriverTiming {
    pub driver: Driver,
    /// Latest known rank; `None` until a position sample arrives.
    pub position: Option<u32>,
    /// Last lap as `m:ss.mmm`, or `--:--.---` with no time yet.
    pub lap_time: String,
    pub sector_1: String,
    pub sector_2: String,
    pub sector_3: String,
    /// Gap to the leader, `+s.mmm` under a minute, `+m:ss.mmm` above.
    pub gap: String,
    /// Interval to the car ahead, same rendering as `gap`.
    pub interval: String,
    pub last_lap: u32,
    pub tyre_compound: String,
    pub tyre_age: u32,
    pub pit_stops: usize,
}

/// One complete aggregation pass.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub timings: Vec<DriverTiming>,
    pub as_of: DateTime<Utc>,
    pub session_key: String,
    pub total_drivers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Externally observable liveness signal for health-check callers.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub consecutive_failures: u32,
    pub cached_keys: usize,
    pub last_request_at: Option<DateTime<Utc>>,
}
