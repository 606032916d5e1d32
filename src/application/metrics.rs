//! Observability metrics for dispatch.
//!
//! Counts what happened to each entry handed to a logger.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking dispatch statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Entries that reached at least the routing step
    entries_dispatched: AtomicU64,
    /// Entries dropped by the throttling evaluator
    entries_throttled: AtomicU64,
    /// Entries dropped because their level was not enabled
    entries_filtered: AtomicU64,
    /// Individual sink deliveries that failed
    delivery_failures: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                entries_dispatched: AtomicU64::new(0),
                entries_throttled: AtomicU64::new(0),
                entries_filtered: AtomicU64::new(0),
                delivery_failures: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_dispatched(&self) {
        self.inner.entries_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_throttled(&self) {
        self.inner.entries_throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.inner.entries_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery_failures(&self, count: u64) {
        self.inner
            .delivery_failures
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Get the number of entries dispatched to sinks.
    pub fn entries_dispatched(&self) -> u64 {
        self.inner.entries_dispatched.load(Ordering::Relaxed)
    }

    /// Get the number of entries dropped by throttling.
    pub fn entries_throttled(&self) -> u64 {
        self.inner.entries_throttled.load(Ordering::Relaxed)
    }

    /// Get the number of entries dropped by level filtering.
    pub fn entries_filtered(&self) -> u64 {
        self.inner.entries_filtered.load(Ordering::Relaxed)
    }

    /// Get the number of failed sink deliveries.
    pub fn delivery_failures(&self) -> u64 {
        self.inner.delivery_failures.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            entries_dispatched: self.entries_dispatched(),
            entries_throttled: self.entries_throttled(),
            entries_filtered: self.entries_filtered(),
            delivery_failures: self.delivery_failures(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.entries_dispatched.store(0, Ordering::Relaxed);
        self.inner.entries_throttled.store(0, Ordering::Relaxed);
        self.inner.entries_filtered.store(0, Ordering::Relaxed);
        self.inner.delivery_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Entries dispatched to sinks
    pub entries_dispatched: u64,
    /// Entries dropped by throttling
    pub entries_throttled: u64,
    /// Entries dropped by level filtering
    pub entries_filtered: u64,
    /// Failed sink deliveries
    pub delivery_failures: u64,
}

impl MetricsSnapshot {
    /// Calculate the throttle rate (0.0 to 1.0).
    ///
    /// Ratio of throttled entries to entries that passed the level filter.
    /// Returns 0.0 if no such entries have been seen.
    pub fn throttle_rate(&self) -> f64 {
        let total = self.entries_dispatched.saturating_add(self.entries_throttled);
        if total == 0 {
            0.0
        } else {
            self.entries_throttled as f64 / total as f64
        }
    }

    /// Total entries handed to the logger.
    pub fn total_entries(&self) -> u64 {
        self.entries_dispatched
            .saturating_add(self.entries_throttled)
            .saturating_add(self.entries_filtered)
    }
}
