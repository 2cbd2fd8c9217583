use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Upper bounds (ms) of the response-time buckets. The last bucket is open.
pub const LATENCY_BUCKETS_MS: &[u64] = &[50, 100, 250, 500, 1000, 2500, 5000, 10000];

#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    /// (upper bound ms, count); `None` bound is the overflow bucket.
    pub buckets: Vec<(Option<u64>, u64)>,
    pub sum_ms: u64,
    pub count: u64,
}

impl Histogram {
    pub fn new() -> Self {
        let mut buckets: Vec<(Option<u64>, u64)> =
            LATENCY_BUCKETS_MS.iter().map(|b| (Some(*b), 0)).collect();
        buckets.push((None, 0));
        Self {
            buckets,
            sum_ms: 0,
            count: 0,
        }
    }

    pub fn observe(&mut self, value_ms: u64) {
        self.sum_ms += value_ms;
        self.count += 1;
        for (bound, count) in &mut self.buckets {
            match bound {
                Some(limit) if value_ms > *limit => continue,
                _ => {
                    *count += 1;
                    break;
                }
            }
        }
    }

    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_ms as f64 / self.count as f64
        }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Run-wide counters. Shared by reference between workers and the coordinator.
#[derive(Debug, Default)]
pub struct CrawlMetrics {
    pub requests: Counter,
    pub successes: Counter,
    pub failures: Counter,
    pub retries: Counter,
    pub dropped: Counter,
    pub canon_rejected: Counter,
    pub scope_rejected: Counter,
    pub robots_rejected: Counter,
    pub depth_rejected: Counter,
    pub duplicates: Counter,
    pub fuzz_variants: Counter,
    pub renders: Counter,
    pub render_failures: Counter,
    pub findings: Counter,
    pub bytes: Counter,
    pub truncated: Counter,
    status_codes: Mutex<BTreeMap<u16, u64>>,
    latency: Mutex<Histogram>,
}

impl CrawlMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_status(&self, status: u16) {
        let mut codes = self.status_codes.lock().unwrap_or_else(|e| e.into_inner());
        *codes.entry(status).or_insert(0) += 1;
    }

    pub fn record_latency(&self, elapsed: Duration) {
        let mut latency = self.latency.lock().unwrap_or_else(|e| e.into_inner());
        latency.observe(elapsed.as_millis() as u64);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.get(),
            successes: self.successes.get(),
            failures: self.failures.get(),
            retries: self.retries.get(),
            dropped: self.dropped.get(),
            canon_rejected: self.canon_rejected.get(),
            scope_rejected: self.scope_rejected.get(),
            robots_rejected: self.robots_rejected.get(),
            depth_rejected: self.depth_rejected.get(),
            duplicates: self.duplicates.get(),
            fuzz_variants: self.fuzz_variants.get(),
            renders: self.renders.get(),
            render_failures: self.render_failures.get(),
            findings: self.findings.get(),
            bytes: self.bytes.get(),
            truncated: self.truncated.get(),
            status_codes: self
                .status_codes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
            latency: self.latency.lock().unwrap_or_else(|e| e.into_inner()).clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub retries: u64,
    pub dropped: u64,
    pub canon_rejected: u64,
    pub scope_rejected: u64,
    pub robots_rejected: u64,
    pub depth_rejected: u64,
    pub duplicates: u64,
    pub fuzz_variants: u64,
    pub renders: u64,
    pub render_failures: u64,
    pub findings: u64,
    pub bytes: u64,
    pub truncated: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub latency: Histogram,
}
