//! Cache Statistics Module
//!
//! Tracks cache performance metrics: hits, misses, bypasses, refreshes and
//! the degraded paths (capacity rejections, timeouts, stale serves).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache performance metrics.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CacheStats {
    /// Requests answered straight from the store
    pub hits: u64,
    /// Requests for cacheable keys that were not resident (or expired)
    pub misses: u64,
    /// Requests for keys the admission policy refused; computed directly
    pub bypasses: u64,
    /// Producer invocations (any path)
    pub producer_calls: u64,
    /// Successful sweeper refreshes
    pub refreshes: u64,
    /// Failed sweeper refreshes
    pub refresh_failures: u64,
    /// New keys rejected because the store was full
    pub capacity_rejections: u64,
    /// Waits on an in-flight recompute that timed out
    pub timeout_fallbacks: u64,
    /// Responses served from a stale entry after a failed recompute
    pub stale_served: u64,
    /// Current number of resident entries
    pub total_entries: usize,
    /// Configured capacity ceiling
    pub capacity: usize,
    /// Recomputes currently in flight
    pub in_flight: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate over cacheable requests.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by every request and the sweeper.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    bypasses: AtomicU64,
    producer_calls: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
    capacity_rejections: AtomicU64,
    timeout_fallbacks: AtomicU64,
    stale_served: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bypass(&self) {
        self.bypasses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_producer_call(&self) {
        self.producer_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_failure(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout_fallback(&self) {
        self.timeout_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_served(&self) {
        self.stale_served.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Reads all counters. Gauges (entries, capacity, in-flight) are supplied by the caller.
    pub fn snapshot(&self, total_entries: usize, capacity: usize, in_flight: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            producer_calls: self.producer_calls.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(Ordering::Relaxed),
            timeout_fallbacks: self.timeout_fallbacks.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            total_entries,
            capacity,
            in_flight,
        }
    }
}
