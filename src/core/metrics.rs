//! Logger metrics for observability
//!
//! Counters and gauges updated on the hot path with relaxed atomics, and a
//! point-in-time [`MetricsSnapshot`] consumed by the health checker.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use rust_log_pipeline::core::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_logged();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_logged(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records delivered to the sink fan-out
    total_logged: AtomicU64,

    /// Records lost to queue overflow or a stopped async logger
    dropped_count: AtomicU64,

    /// Records rejected by the filter chain
    filtered_count: AtomicU64,

    /// Sink failures (errors and panics)
    error_count: AtomicU64,

    latency_total_us: AtomicU64,
    latency_max_us: AtomicU64,
    latency_samples: AtomicU64,

    queue_depth: AtomicUsize,
    max_queue_depth: AtomicUsize,
    queue_capacity: AtomicUsize,

    created: Instant,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub fn new() -> Self {
        Self {
            total_logged: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            filtered_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            latency_total_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
            queue_depth: AtomicUsize::new(0),
            max_queue_depth: AtomicUsize::new(0),
            queue_capacity: AtomicUsize::new(0),
            created: Instant::now(),
        }
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered_count(&self) -> u64 {
        self.filtered_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn max_queue_depth(&self) -> usize {
        self.max_queue_depth.load(Ordering::Relaxed)
    }

    /// Capacity of the async queue feeding this logger, 0 for a sync logger
    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.load(Ordering::Relaxed)
    }

    /// Record a successfully logged entry, returning the previous count
    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped entry, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_error(&self) -> u64 {
        self.error_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Record the fan-out latency of one delivered record
    pub fn record_latency(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.latency_total_us.fetch_add(micros, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
        self.latency_max_us.fetch_max(micros, Ordering::Relaxed);
    }

    /// Update the current queue depth and the high-water mark
    pub fn record_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
        self.max_queue_depth.fetch_max(depth, Ordering::Relaxed);
    }

    pub fn set_queue_capacity(&self, capacity: usize) {
        self.queue_capacity.store(capacity, Ordering::Relaxed);
    }

    /// Drop rate as a fraction in `[0, 1]`
    ///
    /// Returns 0.0 if nothing has been logged or dropped.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_logged() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            dropped / total
        }
    }

    /// Point-in-time copy of every metric
    pub fn snapshot(&self) -> MetricsSnapshot {
        let logged = self.total_logged();
        let samples = self.latency_samples.load(Ordering::Relaxed);
        let latency_total = self.latency_total_us.load(Ordering::Relaxed);
        let elapsed = self.created.elapsed().as_secs_f64();

        MetricsSnapshot {
            messages_logged: logged,
            messages_dropped: self.dropped_count(),
            messages_filtered: self.filtered_count(),
            errors: self.error_count(),
            messages_per_second: if elapsed > 0.0 {
                logged as f64 / elapsed
            } else {
                0.0
            },
            avg_latency_us: if samples == 0 {
                0.0
            } else {
                latency_total as f64 / samples as f64
            },
            max_latency_us: self.latency_max_us.load(Ordering::Relaxed),
            queue_depth: self.queue_depth(),
            max_queue_depth: self.max_queue_depth(),
        }
    }

    /// Reset all counters to zero
    ///
    /// The queue capacity is configuration, not a counter, and is kept.
    pub fn reset(&self) {
        self.total_logged.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.filtered_count.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
        self.latency_total_us.store(0, Ordering::Relaxed);
        self.latency_max_us.store(0, Ordering::Relaxed);
        self.latency_samples.store(0, Ordering::Relaxed);
        self.queue_depth.store(0, Ordering::Relaxed);
        self.max_queue_depth.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metric values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub messages_logged: u64,
    pub messages_dropped: u64,
    pub messages_filtered: u64,
    pub errors: u64,
    pub messages_per_second: f64,
    pub avg_latency_us: f64,
    pub max_latency_us: u64,
    pub queue_depth: usize,
    pub max_queue_depth: usize,
}
