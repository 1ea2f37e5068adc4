//! Internal metrics collection.
//!
//! Counters and histograms live in a global registry; the scheduler logs a
//! snapshot periodically and the health API serves it at `/metrics`.

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

    /// Saturates at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s, 60s
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
    const BUCKET_BOUNDS: [u64; 12] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000, 60000];

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

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
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

    /// Returns (upper bound ms, count) pairs.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the augmenter.
#[derive(Debug, Default)]
pub struct Metrics {
    // Intake
    pub notifications_received: Counter,
    pub files_enqueued: Counter,
    pub files_skipped: Counter,
    pub units_received: Counter,
    pub units_processed: Counter,
    pub units_failed: Counter,
    pub poison_messages: Counter,

    // Records
    pub records_read: Counter,
    pub records_malformed: Counter,
    pub records_augmented: Counter,
    pub records_unresolved: Counter,
    pub records_unchanged: Counter,

    // Batches
    pub batches_processed: Counter,
    pub batches_written: Counter,
    pub batch_write_errors: Counter,
    pub multipart_uploads: Counter,

    // Cache
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub cache_errors: Counter,

    // Inference
    pub inference_requests: Counter,
    pub inference_pairs: Counter,
    pub inference_errors: Counter,

    // Latency histograms
    pub unit_latency_ms: Histogram,
    pub cache_latency_ms: Histogram,
    pub inference_latency_ms: Histogram,
    pub write_latency_ms: Histogram,

    // Gauges
    pub units_in_flight: Gauge,
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
    pub notifications_received: u64,
    pub files_enqueued: u64,
    pub files_skipped: u64,
    pub units_received: u64,
    pub units_processed: u64,
    pub units_failed: u64,
    pub poison_messages: u64,
    pub records_read: u64,
    pub records_malformed: u64,
    pub records_augmented: u64,
    pub records_unresolved: u64,
    pub records_unchanged: u64,
    pub batches_processed: u64,
    pub batches_written: u64,
    pub batch_write_errors: u64,
    pub multipart_uploads: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub inference_requests: u64,
    pub inference_pairs: u64,
    pub inference_errors: u64,
    pub unit_latency_mean_ms: f64,
    pub cache_latency_mean_ms: f64,
    pub inference_latency_mean_ms: f64,
    pub write_latency_mean_ms: f64,
    pub units_in_flight: u64,
}

impl MetricsSnapshot {
    /// Fraction of dedup keys served from cache, 0.0 when nothing was looked up.
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            notifications_received: self.notifications_received.get(),
            files_enqueued: self.files_enqueued.get(),
            files_skipped: self.files_skipped.get(),
            units_received: self.units_received.get(),
            units_processed: self.units_processed.get(),
            units_failed: self.units_failed.get(),
            poison_messages: self.poison_messages.get(),
            records_read: self.records_read.get(),
            records_malformed: self.records_malformed.get(),
            records_augmented: self.records_augmented.get(),
            records_unresolved: self.records_unresolved.get(),
            records_unchanged: self.records_unchanged.get(),
            batches_processed: self.batches_processed.get(),
            batches_written: self.batches_written.get(),
            batch_write_errors: self.batch_write_errors.get(),
            multipart_uploads: self.multipart_uploads.get(),
            cache_hits: self.cache_hits.get(),
            cache_misses: self.cache_misses.get(),
            cache_errors: self.cache_errors.get(),
            inference_requests: self.inference_requests.get(),
            inference_pairs: self.inference_pairs.get(),
            inference_errors: self.inference_errors.get(),
            unit_latency_mean_ms: self.unit_latency_ms.mean(),
            cache_latency_mean_ms: self.cache_latency_ms.mean(),
            inference_latency_mean_ms: self.inference_latency_ms.mean(),
            write_latency_mean_ms: self.write_latency_ms.mean(),
            units_in_flight: self.units_in_flight.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
