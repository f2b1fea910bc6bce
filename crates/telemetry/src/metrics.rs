//! Internal metrics collection.
//!
//! Collects metrics in-memory; the worker scheduler logs a snapshot on an
//! interval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
///
/// Query executions routinely take tens of seconds, so the upper buckets
/// reach further than a request-latency histogram would.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s, 60s, 300s
    buckets: [AtomicU64; 12],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 12] = [
        10, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000, 60_000, 300_000,
    ];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let last = Self::BUCKET_BOUNDS.len() - 1;
        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(last);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the exporter.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingest
    pub events_received: Counter,
    pub events_buffered: Counter,
    pub events_rejected: Counter,
    pub unregistered_channel_errors: Counter,
    pub ingest_requests: Counter,

    // Flush pipeline
    pub flush_cycles: Counter,
    pub uploads_succeeded: Counter,
    pub upload_errors: Counter,
    pub bytes_uploaded: Counter,
    pub lines_uploaded: Counter,
    pub lines_dropped: Counter,
    pub lines_requeued: Counter,

    // Query executor
    pub queries_submitted: Counter,
    pub query_submission_errors: Counter,
    pub query_poll_errors: Counter,
    pub query_retries: Counter,
    pub queries_succeeded: Counter,
    pub queries_exhausted: Counter,
    pub query_timeouts: Counter,

    // Triggers
    pub partitions_registered: Counter,
    pub reports_published: Counter,
    pub publish_errors: Counter,

    // Latency histograms
    pub upload_latency_ms: Histogram,
    pub flush_cycle_latency_ms: Histogram,
    pub query_latency_ms: Histogram,

    // Gauges
    pub buffered_lines: Gauge,
    pub registered_channels: Gauge,
    pub queries_in_flight: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_received: u64,
    pub events_buffered: u64,
    pub events_rejected: u64,
    pub unregistered_channel_errors: u64,
    pub flush_cycles: u64,
    pub uploads_succeeded: u64,
    pub upload_errors: u64,
    pub bytes_uploaded: u64,
    pub lines_dropped: u64,
    pub lines_requeued: u64,
    pub queries_submitted: u64,
    pub query_retries: u64,
    pub query_poll_errors: u64,
    pub queries_succeeded: u64,
    pub queries_exhausted: u64,
    pub query_timeouts: u64,
    pub reports_published: u64,
    pub upload_latency_mean_ms: f64,
    pub query_latency_mean_ms: f64,
    pub buffered_lines: u64,
    pub registered_channels: u64,
    pub queries_in_flight: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_received: self.events_received.get(),
            events_buffered: self.events_buffered.get(),
            events_rejected: self.events_rejected.get(),
            unregistered_channel_errors: self.unregistered_channel_errors.get(),
            flush_cycles: self.flush_cycles.get(),
            uploads_succeeded: self.uploads_succeeded.get(),
            upload_errors: self.upload_errors.get(),
            bytes_uploaded: self.bytes_uploaded.get(),
            lines_dropped: self.lines_dropped.get(),
            lines_requeued: self.lines_requeued.get(),
            queries_submitted: self.queries_submitted.get(),
            query_retries: self.query_retries.get(),
            query_poll_errors: self.query_poll_errors.get(),
            queries_succeeded: self.queries_succeeded.get(),
            queries_exhausted: self.queries_exhausted.get(),
            query_timeouts: self.query_timeouts.get(),
            reports_published: self.reports_published.get(),
            upload_latency_mean_ms: self.upload_latency_ms.mean(),
            query_latency_mean_ms: self.query_latency_ms.mean(),
            buffered_lines: self.buffered_lines.get(),
            registered_channels: self.registered_channels.get(),
            queries_in_flight: self.queries_in_flight.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
