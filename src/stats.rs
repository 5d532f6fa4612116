//! Per-route request statistics.
//!
//! Counters are keyed by `(route pattern, method)` in a [`DashMap`] so
//! concurrent requests on different routes do not contend.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u64,
    errors: u64,
    total_us: u64,
    min_us: u64,
    max_us: u64,
}

impl Default for Counter {
    fn default() -> Self {
        Self {
            count: 0,
            errors: 0,
            total_us: 0,
            min_us: u64::MAX,
            max_us: 0,
        }
    }
}

/// Snapshot of one route's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteStat {
    pub pattern: String,
    pub method: String,
    pub count: u64,
    pub errors: u64,
    pub total_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub avg_us: u64,
}

/// Request statistics collector.
#[derive(Debug, Default)]
pub struct RouteStats {
    counters: DashMap<(Arc<str>, Arc<str>), Counter>,
}

impl RouteStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request. `is_error` marks responses with status >= 400.
    pub fn record(&self, pattern: Arc<str>, method: &str, latency: Duration, is_error: bool) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        let mut entry = self
            .counters
            .entry((pattern, Arc::from(method)))
            .or_default();
        let c = entry.value_mut();
        c.count += 1;
        c.total_us = c.total_us.saturating_add(us);
        c.min_us = c.min_us.min(us);
        c.max_us = c.max_us.max(us);
        if is_error {
            c.errors += 1;
        }
    }

    /// All counters, sorted by pattern then method.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RouteStat> {
        let mut stats: Vec<RouteStat> = self
            .counters
            .iter()
            .map(|e| {
                let ((pattern, method), c) = (e.key(), e.value());
                RouteStat {
                    pattern: pattern.to_string(),
                    method: method.to_string(),
                    count: c.count,
                    errors: c.errors,
                    total_us: c.total_us,
                    min_us: if c.count == 0 { 0 } else { c.min_us },
                    max_us: c.max_us,
                    avg_us: c.total_us.checked_div(c.count).unwrap_or(0),
                }
            })
            .collect();
        stats.sort_by(|a, b| (&a.pattern, &a.method).cmp(&(&b.pattern, &b.method)));
        stats
    }

    /// Snapshot as a JSON array for admin endpoints.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }

    pub fn reset(&self) {
        self.counters.clear();
    }
}
