//! Configuration loader — merges defaults, config.toml, and env vars.

use common::config::ServiceConfig;
use common::Error;
use std::path::Path;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn validate_config(config: &ServiceConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.base_url.trim().is_empty() {
        issues.push("base_url must not be empty".into());
    }
    if config.cache.default_ttl_secs == 0 {
        issues.push("cache.default_ttl_secs must be > 0".into());
    }
    if config.health.failure_threshold == 0 {
        issues.push("health.failure_threshold must be > 0".into());
    }
    if config.http.request_timeout_secs == 0 {
        issues.push("http.request_timeout_secs must be > 0".into());
    }
    if config.http.connect_timeout_secs == 0 {
        issues.push("http.connect_timeout_secs must be > 0".into());
    }
    if config.poll.snapshot_interval_secs == 0 {
        issues.push("poll.snapshot_interval_secs must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load service configuration from environment and optional config file.
pub fn load_config() -> Result<ServiceConfig, Error> {
    // 1. Load .env file if present.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = ServiceConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(url) = std::env::var("OPENF1_BASE_URL") {
        config.base_url = url;
    }
    if let Ok(raw) = std::env::var("PITWALL_CACHE_TTL_SECS") {
        config.cache.default_ttl_secs = parse_positive_u64(&raw, "PITWALL_CACHE_TTL_SECS")?;
    }
    if let Ok(raw) = std::env::var("PITWALL_MIN_REQUEST_INTERVAL_MS") {
        config.pacing.min_request_interval_ms = raw
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::Config("PITWALL_MIN_REQUEST_INTERVAL_MS must be a non-negative integer".into()))?;
    }
    if let Ok(raw) = std::env::var("PITWALL_FAILURE_THRESHOLD") {
        config.health.failure_threshold =
            parse_positive_u64(&raw, "PITWALL_FAILURE_THRESHOLD")? as u32;
    }
    if let Ok(raw) = std::env::var("PITWALL_REQUEST_TIMEOUT_SECS") {
        config.http.request_timeout_secs =
            parse_positive_u64(&raw, "PITWALL_REQUEST_TIMEOUT_SECS")?;
    }
    if let Ok(raw) = std::env::var("PITWALL_SNAPSHOT_INTERVAL_SECS") {
        config.poll.snapshot_interval_secs =
            parse_positive_u64(&raw, "PITWALL_SNAPSHOT_INTERVAL_SECS")?;
    }

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}
