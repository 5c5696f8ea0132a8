//! Prometheus-style metrics for the access engine

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Engine performance metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineMetrics {
    /// Total number of access checks
    pub total_requests: u64,

    pub allowed_decisions: u64,

    pub denied_decisions: u64,

    pub cache_hits: u64,

    pub cache_misses: u64,

    /// Checks that failed with an error
    pub error_count: u64,

    /// Successful snapshot rebuilds
    pub rebuilds: u64,

    /// Rebuilds that failed and kept the previous snapshot
    pub failed_rebuilds: u64,

    /// Number of recorded latencies
    pub latency_samples: u64,

    /// Latency percentiles, bucket upper bounds
    pub latency_p50_ms: f64,
    pub latency_p90_ms: f64,
    pub latency_p99_ms: f64,

    pub avg_latency_ms: f64,
}

impl EngineMetrics {
    /// Calculate cache hit rate
    pub fn cache_hit_rate(&self) -> f64 {
        ratio(self.cache_hits, self.cache_hits + self.cache_misses)
    }

    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        ratio(
            self.allowed_decisions,
            self.allowed_decisions + self.denied_decisions,
        )
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Latency buckets: bucket `i > 0` holds samples in `[2^(i-1), 2^i)` µs
const LATENCY_BUCKETS: usize = 32;

/// Metrics collector shared by all engine callers
///
/// Every recording is a relaxed atomic increment. Latency goes into a
/// fixed log2 histogram and percentiles are derived when metrics are read.
pub struct MetricsCollector {
    total_requests: AtomicU64,
    allowed_decisions: AtomicU64,
    denied_decisions: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    error_count: AtomicU64,
    rebuilds: AtomicU64,
    failed_rebuilds: AtomicU64,
    latency_sum_micros: AtomicU64,
    latency_buckets: [AtomicU64; LATENCY_BUCKETS],
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            allowed_decisions: AtomicU64::new(0),
            denied_decisions: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            rebuilds: AtomicU64::new(0),
            failed_rebuilds: AtomicU64::new(0),
            latency_sum_micros: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed access check
    pub fn record_decision(&self, allowed: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if allowed {
            self.allowed_decisions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied_decisions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_error(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rebuild(&self, succeeded: bool) {
        if succeeded {
            self.rebuilds.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_rebuilds.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record check latency
    pub fn record_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_sum_micros.fetch_add(micros, Ordering::Relaxed);
        self.latency_buckets[bucket_of(micros)].fetch_add(1, Ordering::Relaxed);
    }

    /// Current metrics
    pub fn get_metrics(&self) -> EngineMetrics {
        let buckets: [u64; LATENCY_BUCKETS] =
            std::array::from_fn(|i| self.latency_buckets[i].load(Ordering::Relaxed));
        let samples: u64 = buckets.iter().sum();
        let sum_ms = self.latency_sum_micros.load(Ordering::Relaxed) as f64 / 1000.0;

        EngineMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            allowed_decisions: self.allowed_decisions.load(Ordering::Relaxed),
            denied_decisions: self.denied_decisions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            failed_rebuilds: self.failed_rebuilds.load(Ordering::Relaxed),
            latency_samples: samples,
            latency_p50_ms: percentile(&buckets, samples, 0.50),
            latency_p90_ms: percentile(&buckets, samples, 0.90),
            latency_p99_ms: percentile(&buckets, samples, 0.99),
            avg_latency_ms: if samples == 0 { 0.0 } else { sum_ms / samples as f64 },
        }
    }

    pub fn reset(&self) {
        let counters = [
            &self.total_requests,
            &self.allowed_decisions,
            &self.denied_decisions,
            &self.cache_hits,
            &self.cache_misses,
            &self.error_count,
            &self.rebuilds,
            &self.failed_rebuilds,
            &self.latency_sum_micros,
        ];
        for counter in counters.into_iter().chain(self.latency_buckets.iter()) {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let metrics = self.get_metrics();

        format!(
            r#"# HELP access_checks_total Total number of access checks
# TYPE access_checks_total counter
access_checks_total {}

# HELP access_allowed_total Number of allowed decisions
# TYPE access_allowed_total counter
access_allowed_total {}

# HELP access_denied_total Number of denied decisions
# TYPE access_denied_total counter
access_denied_total {}

# HELP access_cache_hits_total Cache hits
# TYPE access_cache_hits_total counter
access_cache_hits_total {}

# HELP access_cache_misses_total Cache misses
# TYPE access_cache_misses_total counter
access_cache_misses_total {}

# HELP access_errors_total Failed access checks
# TYPE access_errors_total counter
access_errors_total {}

# HELP access_rebuilds_total Snapshot rebuilds by result
# TYPE access_rebuilds_total counter
access_rebuilds_total{{result="ok"}} {}
access_rebuilds_total{{result="failed"}} {}

# HELP access_check_latency_seconds Access check latency percentiles
# TYPE access_check_latency_seconds summary
access_check_latency_seconds{{quantile="0.5"}} {}
access_check_latency_seconds{{quantile="0.9"}} {}
access_check_latency_seconds{{quantile="0.99"}} {}
access_check_latency_seconds_sum {}
access_check_latency_seconds_count {}
"#,
            metrics.total_requests,
            metrics.allowed_decisions,
            metrics.denied_decisions,
            metrics.cache_hits,
            metrics.cache_misses,
            metrics.error_count,
            metrics.rebuilds,
            metrics.failed_rebuilds,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p90_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
            metrics.avg_latency_ms * metrics.latency_samples as f64 / 1000.0,
            metrics.latency_samples,
        )
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn bucket_of(micros: u64) -> usize {
    let bits = (u64::BITS - micros.leading_zeros()) as usize;
    bits.min(LATENCY_BUCKETS - 1)
}

/// Nearest-rank percentile, reported as the upper bound of its bucket
fn percentile(buckets: &[u64; LATENCY_BUCKETS], samples: u64, p: f64) -> f64 {
    if samples == 0 {
        return 0.0;
    }

    let rank = ((samples as f64) * p).ceil().max(1.0) as u64;
    let mut seen = 0;
    for (i, &count) in buckets.iter().enumerate() {
        seen += count;
        if seen >= rank {
            return (1u64 << i) as f64 / 1000.0;
        }
    }
    (1u64 << (LATENCY_BUCKETS - 1)) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_decision() {
        let collector = MetricsCollector::new();

        collector.record_decision(true);
        collector.record_decision(false);
        collector.record_decision(true);

        let metrics = collector.get_metrics();
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.allowed_decisions, 2);
        assert_eq!(metrics.denied_decisions, 1);
        assert!((metrics.allow_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_record_cache() {
        let collector = MetricsCollector::new();

        collector.record_cache_hit();
        collector.record_cache_hit();
        collector.record_cache_miss();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.cache_hits, 2);
        assert_eq!(metrics.cache_misses, 1);
        assert!((metrics.cache_hit_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_record_latency() {
        let collector = MetricsCollector::new();

        collector.record_latency(Duration::from_millis(5));
        collector.record_latency(Duration::from_millis(10));
        collector.record_latency(Duration::from_millis(15));

        let metrics = collector.get_metrics();
        assert!((metrics.avg_latency_ms - 10.0).abs() < 1.0);
        assert!(metrics.latency_p50_ms > 0.0);
        assert!(metrics.latency_p99_ms >= metrics.latency_p50_ms);
    }

    #[test]
    fn test_latency_percentiles_follow_distribution() {
        let collector = MetricsCollector::new();

        for _ in 0..95 {
            collector.record_latency(Duration::from_millis(1));
        }
        for _ in 0..5 {
            collector.record_latency(Duration::from_millis(100));
        }

        let metrics = collector.get_metrics();
        assert_eq!(metrics.latency_samples, 100);
        assert!(metrics.latency_p50_ms < 2.0);
        assert!(metrics.latency_p90_ms < 2.0);
        assert!(metrics.latency_p99_ms > 50.0);
        assert!((metrics.avg_latency_ms - 5.95).abs() < 0.01);
    }

    #[test]
    fn test_concurrent_recording_is_exact() {
        let collector = MetricsCollector::new();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for i in 0..1_000 {
                        collector.record_cache_miss();
                        collector.record_decision(i % 2 == 0);
                        collector.record_latency(Duration::from_micros(50));
                    }
                });
            }
        });

        let metrics = collector.get_metrics();
        assert_eq!(metrics.total_requests, 8_000);
        assert_eq!(metrics.allowed_decisions, 4_000);
        assert_eq!(metrics.denied_decisions, 4_000);
        assert_eq!(metrics.cache_misses, 8_000);
        assert_eq!(metrics.latency_samples, 8_000);
    }

    #[test]
    fn test_rebuilds_and_errors() {
        let collector = MetricsCollector::new();

        collector.record_rebuild(true);
        collector.record_rebuild(false);
        collector.record_error();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.rebuilds, 1);
        assert_eq!(metrics.failed_rebuilds, 1);
        assert_eq!(metrics.error_count, 1);
    }

    #[test]
    fn test_prometheus_export() {
        let collector = MetricsCollector::new();

        collector.record_decision(true);
        collector.record_rebuild(true);
        collector.record_latency(Duration::from_millis(5));

        let prometheus = collector.export_prometheus();
        assert!(prometheus.contains("access_checks_total 1"));
        assert!(prometheus.contains("access_allowed_total 1"));
        assert!(prometheus.contains("access_rebuilds_total{result=\"ok\"} 1"));
        assert!(prometheus.contains("access_check_latency_seconds_count 1"));
    }

    #[test]
    fn test_reset() {
        let collector = MetricsCollector::new();

        collector.record_decision(true);
        collector.record_cache_hit();
        collector.reset();

        assert_eq!(collector.get_metrics(), EngineMetrics::default());
    }
}
