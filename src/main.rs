//! Pitwall: OpenF1 live-timing aggregation service.
//!
//! Single-binary Tokio application that:
//! 1. Discovers the session to track (or takes one on the CLI)
//! 2. Builds fused timing snapshots on a poll interval
//! 3. Serves cached/stale data through upstream trouble
//! 4. Reports health alongside every heartbeat

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::time::sleep;
use tracing::{error, info, warn};

use livetiming::TimingAggregator;
use openf1_client::OpenF1Client;

/// OpenF1 live-timing aggregation service
#[derive(Parser)]
#[command(name = "pitwall", about = "OpenF1 live-timing aggregation service")]
struct Cli {
    /// Session to track; discovered automatically when omitted.
    #[arg(long)]
    session_key: Option<String>,

    /// Build a single snapshot, print it as JSON, and exit.
    #[arg(long)]
    once: bool,

    /// Probe upstream session discovery, print health, and exit.
    #[arg(long)]
    check_upstream: bool,
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitwall=info,openf1_client=info,livetiming=info".into()),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("🏁 Pitwall starting up...");

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Upstream: {}", cfg.base_url);
    info!(
        "Cache: ttl={}s ({} endpoint overrides)",
        cfg.cache.default_ttl_secs,
        cfg.cache.endpoint_ttl_secs.len()
    );
    info!(
        "Pacing: min_interval={}ms, 429_backoff={}ms, stream_pause={}ms",
        cfg.pacing.min_request_interval_ms,
        cfg.pacing.rate_limited_backoff_ms,
        cfg.pacing.stream_pause_ms
    );
    info!(
        "Health: unhealthy after {} consecutive failures",
        cfg.health.failure_threshold
    );

    let client = Arc::new(OpenF1Client::new(cfg.clone()));
    let aggregator = TimingAggregator::new(client.clone(), &cfg);

    // ── Check-upstream mode ──────────────────────────────────────────
    if cli.check_upstream {
        info!("Probing upstream session discovery...");
        match client.get_latest_session().await {
            Some(session) => info!(
                "✅ Upstream reachable: session {} — {} at {}",
                session.session_key, session.session_name, session.circuit_short_name
            ),
            None => warn!("❌ No session available from upstream"),
        }
        let health = client.health_snapshot().await;
        info!(
            "Health: healthy={} failures={} cached_keys={}",
            health.is_healthy, health.consecutive_failures, health.cached_keys
        );
        return;
    }

    // ── Session resolution ───────────────────────────────────────────
    let session_key = match cli.session_key {
        Some(key) => key,
        None => match client.get_latest_session().await {
            Some(session) => {
                info!(
                    "Tracking session {} — {} at {}",
                    session.session_key, session.session_name, session.circuit_short_name
                );
                session.session_key.to_string()
            }
            None => {
                error!("No session available from upstream and none given on the CLI");
                std::process::exit(1);
            }
        },
    };

    // ── Once mode ────────────────────────────────────────────────────
    if cli.once {
        let snapshot = aggregator.build_snapshot(&session_key).await;
        match serde_json::to_string_pretty(&snapshot) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => error!("Failed to render snapshot: {}", e),
        }
        return;
    }

    // ── Poll loop ────────────────────────────────────────────────────
    info!("🚀 Pitwall is running. Press Ctrl+C to stop.");
    let poll_interval = Duration::from_secs(cfg.poll.snapshot_interval_secs);

    loop {
        let snapshot = aggregator.build_snapshot(&session_key).await;
        let health = client.health_snapshot().await;

        match &snapshot.error {
            Some(reason) => warn!(
                "Snapshot pass failed for session {}: {} (healthy={})",
                snapshot.session_key, reason, health.is_healthy
            ),
            None => {
                let leader = snapshot
                    .timings
                    .first()
                    .map(|t| t.driver.name_acronym.clone())
                    .unwrap_or_else(|| "--".into());
                info!(
                    "HEARTBEAT: drivers={} leader={} healthy={} failures={} cached_keys={}",
                    snapshot.total_drivers,
                    leader,
                    health.is_healthy,
                    health.consecutive_failures,
                    health.cached_keys
                );
            }
        }

        tokio::select! {
            _ = sleep(poll_interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Pitwall shut down.");
}
