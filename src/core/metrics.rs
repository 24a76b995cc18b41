//! Dispatch metrics for observability
//!
//! Counters for monitoring dispatcher health: accepted and dropped entries,
//! per-destination delivery outcomes, flushes and retries.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for dispatcher observability
///
/// # Example
///
/// ```
/// use correlated_logger::DispatchMetrics;
///
/// let metrics = DispatchMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_submitted();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_submitted(), 1);
/// ```
#[derive(Debug)]
pub struct DispatchMetrics {
    /// Entries accepted into the buffer
    submitted: AtomicU64,

    /// Entries dropped by the overflow policy
    dropped_count: AtomicU64,

    /// Entries acknowledged by a destination (counted once per destination)
    delivered: AtomicU64,

    /// Batch deliveries that failed after all attempts
    failed_deliveries: AtomicU64,

    /// Buffer drains, whatever triggered them
    flushes: AtomicU64,

    /// In-worker retry attempts
    retries: AtomicU64,

    /// Times a producer waited for buffer space
    block_events: AtomicU64,
}

impl DispatchMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed_deliveries: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_deliveries(&self) -> u64 {
        self.failed_deliveries.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    /// Record an accepted entry
    #[inline]
    pub fn record_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped entry, returning the new total
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record `count` dropped entries at once, returning the new total
    #[inline]
    pub fn record_dropped_many(&self, count: u64) -> u64 {
        self.dropped_count.fetch_add(count, Ordering::Relaxed) + count
    }

    #[inline]
    pub fn record_delivered(&self, entries: usize) -> u64 {
        self.delivered.fetch_add(entries as u64, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed_delivery(&self) -> u64 {
        self.failed_deliveries.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush(&self) -> u64 {
        self.flushes.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_retry(&self) -> u64 {
        self.retries.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been submitted.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_submitted() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
        self.failed_deliveries.store(0, Ordering::Relaxed);
        self.flushes.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.block_events.store(0, Ordering::Relaxed);
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DispatchMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            submitted: AtomicU64::new(self.total_submitted()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            delivered: AtomicU64::new(self.delivered()),
            failed_deliveries: AtomicU64::new(self.failed_deliveries()),
            flushes: AtomicU64::new(self.flushes()),
            retries: AtomicU64::new(self.retries()),
            block_events: AtomicU64::new(self.block_events()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = DispatchMetrics::new();
        assert_eq!(metrics.total_submitted(), 0);
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.delivered(), 0);
        assert_eq!(metrics.flushes(), 0);
    }

    #[test]
    fn test_record_dropped_returns_total() {
        let metrics = DispatchMetrics::new();
        assert_eq!(metrics.record_dropped(), 1);
        assert_eq!(metrics.record_dropped(), 2);
        assert_eq!(metrics.dropped_count(), 2);
    }

    #[test]
    fn test_delivered_counts_entries() {
        let metrics = DispatchMetrics::new();
        metrics.record_delivered(10);
        metrics.record_delivered(5);
        assert_eq!(metrics.delivered(), 15);
    }

    #[test]
    fn test_metrics_drop_rate() {
        let metrics = DispatchMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..100 {
            metrics.record_submitted();
        }
        for _ in 0..10 {
            metrics.record_dropped();
        }
        let rate = metrics.drop_rate();
        assert!(rate > 9.0 && rate < 10.0, "Drop rate was {}", rate);
    }

    #[test]
    fn test_metrics_snapshot_is_independent() {
        let metrics = DispatchMetrics::new();
        metrics.record_flush();
        let snapshot = metrics.clone();
        metrics.record_flush();
        metrics.reset();
        assert_eq!(snapshot.flushes(), 1);
        assert_eq!(metrics.flushes(), 0);
    }
}
