//! Metrics Recorder Module
//!
//! Counters and latency samples observed by the executor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

// == Metric Event ==
/// Something the executor observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricEvent {
    /// Served from the result cache
    Hit,
    /// Computed fresh and succeeded
    Miss,
    /// Attached to an in-flight computation
    Dedup,
    /// The computation failed or timed out
    Failure,
    /// Duration of a successful computation, from gate admission to
    /// completion; time spent queued at the gate is not included
    Latency(Duration),
}

// == Metrics Recorder ==
/// Monotonic counters plus a running latency average.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    deduplicated_requests: AtomicU64,
    failed_requests: AtomicU64,
    latency_sum_us: AtomicU64,
    latency_samples: AtomicU64,
}

impl MetricsRecorder {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an incoming call
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an observed event
    pub fn record(&self, event: MetricEvent) {
        match event {
            MetricEvent::Hit => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
            MetricEvent::Miss => {
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
            }
            MetricEvent::Dedup => {
                self.deduplicated_requests.fetch_add(1, Ordering::Relaxed);
            }
            MetricEvent::Failure => {
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
            }
            MetricEvent::Latency(elapsed) => {
                let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
                self.latency_sum_us.fetch_add(micros, Ordering::Relaxed);
                self.latency_samples.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let deduplicated_requests = self.deduplicated_requests.load(Ordering::Relaxed);
        let failed_requests = self.failed_requests.load(Ordering::Relaxed);
        let latency_sum_us = self.latency_sum_us.load(Ordering::Relaxed);
        let latency_samples = self.latency_samples.load(Ordering::Relaxed);

        let percent = |count: u64| {
            if total_requests > 0 {
                count as f64 / total_requests as f64 * 100.0
            } else {
                0.0
            }
        };

        MetricsSnapshot {
            total_requests,
            cache_hits,
            cache_misses,
            deduplicated_requests,
            failed_requests,
            average_response_time_ms: if latency_samples > 0 {
                latency_sum_us as f64 / latency_samples as f64 / 1000.0
            } else {
                0.0
            },
            hit_rate: percent(cache_hits),
            deduplication_rate: percent(deduplicated_requests),
            failure_rate: percent(failed_requests),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.deduplicated_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.latency_sum_us.store(0, Ordering::Relaxed);
        self.latency_samples.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of executor metrics; rates are percentages of `total_requests`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub deduplicated_requests: u64,
    pub failed_requests: u64,
    /// Mean latency of successful computations, in milliseconds
    pub average_response_time_ms: f64,
    pub hit_rate: f64,
    pub deduplication_rate: f64,
    pub failure_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let metrics = MetricsRecorder::new();
        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 0);
        assert_eq!(snap.hit_rate, 0.0);
        assert_eq!(snap.deduplication_rate, 0.0);
        assert_eq!(snap.failure_rate, 0.0);
        assert_eq!(snap.average_response_time_ms, 0.0);
    }

    #[test]
    fn test_rates() {
        let metrics = MetricsRecorder::new();
        for _ in 0..4 {
            metrics.record_request();
        }
        metrics.record(MetricEvent::Hit);
        metrics.record(MetricEvent::Dedup);
        metrics.record(MetricEvent::Miss);
        metrics.record(MetricEvent::Failure);

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 4);
        assert!((snap.hit_rate - 25.0).abs() < 0.001);
        assert!((snap.deduplication_rate - 25.0).abs() < 0.001);
        assert!((snap.failure_rate - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_average_latency() {
        let metrics = MetricsRecorder::new();
        metrics.record(MetricEvent::Latency(Duration::from_millis(100)));
        metrics.record(MetricEvent::Latency(Duration::from_millis(300)));

        let snap = metrics.snapshot();
        assert!((snap.average_response_time_ms - 200.0).abs() < 0.001);
    }

    #[test]
    fn test_reset() {
        let metrics = MetricsRecorder::new();
        metrics.record_request();
        metrics.record(MetricEvent::Hit);
        metrics.record(MetricEvent::Latency(Duration::from_millis(5)));

        metrics.reset();
        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 0);
        assert_eq!(snap.cache_hits, 0);
        assert_eq!(snap.average_response_time_ms, 0.0);
    }
}
