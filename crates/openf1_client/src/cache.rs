//! TTL-bounded memo of prior upstream responses.
//!
//! Uses `DashMap` for lock-free concurrent reads. Entries are replaced
//! wholesale on write and never proactively deleted; staleness is
//! judged lazily on read against the per-endpoint TTL.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

/// Build a cache key from an endpoint and its query parameters.
///
/// Parameters are sorted by key first, so semantically identical
/// requests collide to the same slot regardless of argument order.
pub fn cache_key(endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort();

    if sorted.is_empty() {
        return endpoint.to_string();
    }

    let query: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{}?{}", endpoint, query.join("&"))
}

/// A cached upstream payload with its storage time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Vec<Value>,
    pub stored_at: Instant,
}

impl CacheEntry {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Thread-safe response cache keyed by (endpoint, params).
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.clone())
    }

    pub fn put(&self, key: String, payload: Vec<Value>) {
        self.entries.insert(
            key,
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
