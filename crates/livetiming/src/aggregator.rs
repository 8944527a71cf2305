//! Snapshot aggregation over the OpenF1 streams.
//!
//! One pass fetches the roster plus five time-series streams in a
//! fixed order, keeps the latest record per driver from each, and
//! folds them into an ordered `Vec<DriverTiming>`. Individual stream
//! failures degrade to cached or empty data inside the client; only a
//! missing roster fails the pass, and that is reported in the result
//! rather than returned as an error.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use common::config::ServiceConfig;
use common::{Driver, DriverTiming, Interval, Lap, PitStop, Position, Snapshot, Stint};
use openf1_client::OpenF1Client;

use crate::format::{format_gap, format_lap_time, format_sector_time, tyre_age};

/// Sort key for drivers with no known position; larger than any real
/// rank so they land after the ranked field.
const UNRANKED: u32 = 1000;

pub struct TimingAggregator {
    client: Arc<OpenF1Client>,
    stream_pause: Duration,
}

impl TimingAggregator {
    pub fn new(client: Arc<OpenF1Client>, config: &ServiceConfig) -> Self {
        Self {
            client,
            stream_pause: Duration::from_millis(config.pacing.stream_pause_ms),
        }
    }

    /// Build one complete timing snapshot for a session.
    pub async fn build_snapshot(&self, session_key: &str) -> Snapshot {
        let drivers = self.client.get_drivers(session_key).await;
        if drivers.is_empty() {
            warn!(session_key, "no drivers found for session");
            return Snapshot {
                timings: Vec::new(),
                as_of: Utc::now(),
                session_key: session_key.to_string(),
                total_drivers: 0,
                error: Some("no drivers found".into()),
            };
        }

        // Streams are fetched strictly sequentially, in a fixed order,
        // with a short pause between calls — self-imposed pacing on
        // top of the client's rate limiter.
        self.pause().await;
        let positions = self.client.get_positions(session_key).await;
        self.pause().await;
        let intervals = self.client.get_intervals(session_key).await;
        self.pause().await;
        let laps = self.client.get_laps(session_key).await;
        self.pause().await;
        let stints = self.client.get_stints(session_key).await;
        self.pause().await;
        let pits = self.client.get_pit_stops(session_key).await;

        debug!(
            drivers = drivers.len(),
            positions = positions.len(),
            intervals = intervals.len(),
            laps = laps.len(),
            stints = stints.len(),
            pits = pits.len(),
            "stream fetch complete"
        );

        let mut timings: Vec<DriverTiming> = drivers
            .iter()
            .map(|driver| build_row(driver, &positions, &intervals, &laps, &stints, &pits))
            .collect();
        timings.sort_by_key(|t| t.position.unwrap_or(UNRANKED));

        info!(
            session_key,
            drivers = drivers.len(),
            "built timing snapshot"
        );

        Snapshot {
            timings,
            as_of: Utc::now(),
            session_key: session_key.to_string(),
            total_drivers: drivers.len(),
            error: None,
        }
    }

    async fn pause(&self) {
        if !self.stream_pause.is_zero() {
            tokio::time::sleep(self.stream_pause).await;
        }
    }
}

/// Latest record by a per-record key. Records whose key compares
/// strictly greater replace the running best; equal or absent keys
/// keep the first record encountered, so the pick is stable.
fn latest_by<'a, T, K, F>(items: impl Iterator<Item = &'a T>, key: F) -> Option<&'a T>
where
    K: PartialOrd,
    F: Fn(&T) -> Option<K>,
{
    let mut best: Option<(&'a T, Option<K>)> = None;
    for item in items {
        let k = key(item);
        match &best {
            None => best = Some((item, k)),
            Some((_, best_key)) => {
                let newer = match (&k, best_key) {
                    (Some(new), Some(old)) => new > old,
                    (Some(_), None) => true,
                    _ => false,
                };
                if newer {
                    best = Some((item, k));
                }
            }
        }
    }
    best.map(|(item, _)| item)
}

fn build_row(
    driver: &Driver,
    positions: &[Position],
    intervals: &[Interval],
    laps: &[Lap],
    stints: &[Stint],
    pits: &[PitStop],
) -> DriverTiming {
    let number = driver.driver_number;

    let latest_position = latest_by(
        positions.iter().filter(|p| p.driver_number == number),
        |p| p.date,
    );
    let latest_interval = latest_by(
        intervals.iter().filter(|i| i.driver_number == number),
        |i| i.date,
    );
    let latest_lap = latest_by(laps.iter().filter(|l| l.driver_number == number), |l| {
        Some(l.lap_number)
    });
    let current_stint = latest_by(stints.iter().filter(|s| s.driver_number == number), |s| {
        Some(s.stint_number)
    });
    let pit_stops = pits.iter().filter(|p| p.driver_number == number).count();

    DriverTiming {
        driver: driver.clone(),
        position: latest_position.map(|p| p.position),
        lap_time: format_lap_time(latest_lap.and_then(|l| l.lap_duration)),
        sector_1: format_sector_time(latest_lap.and_then(|l| l.duration_sector_1)),
        sector_2: format_sector_time(latest_lap.and_then(|l| l.duration_sector_2)),
        sector_3: format_sector_time(latest_lap.and_then(|l| l.duration_sector_3)),
        gap: format_gap(latest_interval.and_then(|i| i.gap_to_leader)),
        interval: format_gap(latest_interval.and_then(|i| i.interval)),
        last_lap: latest_lap.map(|l| l.lap_number).unwrap_or(0),
        tyre_compound: current_stint
            .map(|s| s.compound.clone())
            .unwrap_or_else(|| "UNKNOWN".into()),
        tyre_age: match (current_stint, latest_lap) {
            (Some(stint), Some(lap)) => {
                tyre_age(lap.lap_number, stint.lap_start, stint.tyre_age_at_start)
            }
            _ => 0,
        },
        pit_stops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::Error;
    use openf1_client::transport::{BackendReply, HttpBackend};
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Backend that plays back scripted replies per endpoint. An empty
    /// queue means the endpoint must not be hit again.
    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<HashMap<String, VecDeque<Result<BackendReply, ()>>>>,
    }

    impl ScriptedBackend {
        fn ok(&self, endpoint: &str, body: Value) {
            self.push(endpoint, Ok(BackendReply { status: 200, body: Some(body) }));
        }

        fn status(&self, endpoint: &str, status: u16) {
            self.push(endpoint, Ok(BackendReply { status, body: None }));
        }

        fn timeout(&self, endpoint: &str) {
            self.push(endpoint, Err(()));
        }

        fn push(&self, endpoint: &str, reply: Result<BackendReply, ()>) {
            self.replies
                .lock()
                .unwrap()
                .entry(endpoint.to_string())
                .or_default()
                .push_back(reply);
        }
    }

    #[async_trait]
    impl HttpBackend for ScriptedBackend {
        async fn get_json(
            &self,
            url: &str,
            _params: &[(&str, &str)],
        ) -> Result<BackendReply, Error> {
            let endpoint = url.rsplit('/').next().unwrap().to_string();
            let next = self
                .replies
                .lock()
                .unwrap()
                .get_mut(&endpoint)
                .and_then(|queue| queue.pop_front());
            match next {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(())) => Err(Error::Timeout(url.to_string())),
                None => panic!("unexpected network call to {endpoint}"),
            }
        }
    }

    fn test_config() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.base_url = "http://upstream.test/v1".into();
        config.pacing.min_request_interval_ms = 0;
        config.pacing.rate_limited_backoff_ms = 0;
        config.pacing.stream_pause_ms = 0;
        config.health.failure_threshold = 3;
        config
    }

    fn aggregator_with(config: ServiceConfig) -> (TimingAggregator, Arc<ScriptedBackend>, Arc<OpenF1Client>) {
        let backend = Arc::new(ScriptedBackend::default());
        let client = Arc::new(OpenF1Client::with_backend(config.clone(), backend.clone()));
        (TimingAggregator::new(client.clone(), &config), backend, client)
    }

    fn two_drivers() -> Value {
        json!([
            {"driver_number": 1, "name_acronym": "VER", "team_name": "Red Bull Racing"},
            {"driver_number": 44, "name_acronym": "HAM", "team_name": "Ferrari"}
        ])
    }

    fn script_empty_streams(backend: &ScriptedBackend, endpoints: &[&str]) {
        for endpoint in endpoints {
            backend.ok(endpoint, json!([]));
        }
    }

    #[tokio::test]
    async fn empty_roster_reports_error_without_fetching_streams() {
        let (aggregator, backend, _) = aggregator_with(test_config());
        backend.ok("drivers", json!([]));

        let snapshot = aggregator.build_snapshot("9158").await;

        assert!(snapshot.timings.is_empty());
        assert_eq!(snapshot.total_drivers, 0);
        assert_eq!(snapshot.error.as_deref(), Some("no drivers found"));
    }

    #[tokio::test]
    async fn latest_lap_is_rendered_and_missing_lap_gets_placeholder() {
        let (aggregator, backend, _) = aggregator_with(test_config());
        backend.ok("drivers", two_drivers());
        backend.ok(
            "position",
            json!([
                {"driver_number": 1, "position": 1, "date": "2026-03-08T05:10:00+00:00"},
                {"driver_number": 44, "position": 2, "date": "2026-03-08T05:10:00+00:00"}
            ]),
        );
        backend.ok("intervals", json!([]));
        backend.ok(
            "laps",
            json!([
                {"driver_number": 1, "lap_number": 1, "lap_duration": 100.0},
                {"driver_number": 1, "lap_number": 2, "lap_duration": 91.234,
                 "duration_sector_1": 28.1, "duration_sector_2": 31.2, "duration_sector_3": 31.934}
            ]),
        );
        script_empty_streams(&backend, &["stints", "pit"]);

        let snapshot = aggregator.build_snapshot("9158").await;

        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.total_drivers, 2);

        let ver = &snapshot.timings[0];
        assert_eq!(ver.driver.driver_number, 1);
        assert_eq!(ver.lap_time, "1:31.234");
        assert_eq!(ver.sector_1, "28.100");
        assert_eq!(ver.last_lap, 2);

        let ham = &snapshot.timings[1];
        assert_eq!(ham.driver.driver_number, 44);
        assert_eq!(ham.lap_time, "--:--.---");
        assert_eq!(ham.last_lap, 0);
    }

    #[tokio::test]
    async fn unranked_driver_sorts_after_ranked_field() {
        let (aggregator, backend, _) = aggregator_with(test_config());
        backend.ok("drivers", two_drivers());
        backend.ok(
            "position",
            json!([{"driver_number": 44, "position": 1, "date": "2026-03-08T05:10:00+00:00"}]),
        );
        script_empty_streams(&backend, &["intervals", "laps", "stints", "pit"]);

        let snapshot = aggregator.build_snapshot("9158").await;

        assert_eq!(snapshot.timings[0].driver.driver_number, 44);
        assert_eq!(snapshot.timings[1].driver.driver_number, 1);
        assert_eq!(snapshot.timings[1].position, None);
    }

    #[tokio::test]
    async fn fuses_latest_records_per_driver() {
        let (aggregator, backend, _) = aggregator_with(test_config());
        backend.ok(
            "drivers",
            json!([{"driver_number": 1, "name_acronym": "VER"}]),
        );
        // Later sample wins; an equal-timestamp pair keeps the first.
        backend.ok(
            "position",
            json!([
                {"driver_number": 1, "position": 5, "date": "2026-03-08T05:00:00+00:00"},
                {"driver_number": 1, "position": 3, "date": "2026-03-08T05:12:00+00:00"},
                {"driver_number": 1, "position": 9, "date": "2026-03-08T05:12:00+00:00"}
            ]),
        );
        backend.ok(
            "intervals",
            json!([
                {"driver_number": 1, "gap_to_leader": 75.5, "interval": 3.2,
                 "date": "2026-03-08T05:12:00+00:00"}
            ]),
        );
        backend.ok(
            "laps",
            json!([{"driver_number": 1, "lap_number": 15, "lap_duration": 92.5}]),
        );
        backend.ok(
            "stints",
            json!([
                {"driver_number": 1, "stint_number": 1, "compound": "SOFT",
                 "lap_start": 1, "tyre_age_at_start": 0},
                {"driver_number": 1, "stint_number": 2, "compound": "MEDIUM",
                 "lap_start": 10, "tyre_age_at_start": 2}
            ]),
        );
        backend.ok(
            "pit",
            json!([
                {"driver_number": 1, "lap_number": 9, "pit_duration": 22.3},
                {"driver_number": 1, "lap_number": 30, "pit_duration": 21.9}
            ]),
        );

        let snapshot = aggregator.build_snapshot("9158").await;
        let ver = &snapshot.timings[0];

        assert_eq!(ver.position, Some(3));
        assert_eq!(ver.gap, "+1:15.500");
        assert_eq!(ver.interval, "+3.200");
        assert_eq!(ver.tyre_compound, "MEDIUM");
        assert_eq!(ver.tyre_age, 7); // lap 15, stint from lap 10, 2 laps old
        assert_eq!(ver.pit_stops, 2);
    }

    #[tokio::test]
    async fn pit_404_gives_empty_counts_and_leaves_health_alone() {
        let (aggregator, backend, client) = aggregator_with(test_config());
        backend.ok("drivers", two_drivers());
        script_empty_streams(&backend, &["position", "intervals", "laps", "stints"]);
        backend.status("pit", 404);

        let snapshot = aggregator.build_snapshot("9158").await;
        let health = client.health_snapshot().await;

        assert!(snapshot.error.is_none());
        assert!(snapshot.timings.iter().all(|t| t.pit_stops == 0));
        assert!(health.is_healthy);
        assert_eq!(health.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn positions_timeout_falls_back_to_stale_cache() {
        let mut config = test_config();
        // Force positions to refetch on the second pass while the
        // other streams stay cache-fresh.
        config.cache.endpoint_ttl_secs.insert("position".into(), 0);
        let (aggregator, backend, client) = aggregator_with(config);

        backend.ok("drivers", two_drivers());
        backend.ok(
            "position",
            json!([
                {"driver_number": 1, "position": 1, "date": "2026-03-08T05:10:00+00:00"},
                {"driver_number": 44, "position": 2, "date": "2026-03-08T05:10:00+00:00"}
            ]),
        );
        script_empty_streams(&backend, &["intervals", "laps", "stints", "pit"]);

        let first = aggregator.build_snapshot("9158").await;
        assert_eq!(first.timings[0].position, Some(1));

        backend.timeout("position");
        let second = aggregator.build_snapshot("9158").await;
        let health = client.health_snapshot().await;

        assert!(second.error.is_none());
        assert_eq!(second.timings.len(), 2);
        assert_eq!(second.timings[0].position, Some(1));
        assert_eq!(second.timings[1].position, Some(2));
        assert_eq!(health.consecutive_failures, 1);
        assert!(health.is_healthy);
    }
}
