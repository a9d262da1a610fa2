//! Global atomic counters for survey observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a command or request finishes).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Atomic counters, no allocation or locking.
pub struct Metrics {
    batches_served: AtomicU64,
    items_served: AtomicU64,
    seen_resets: AtomicU64,
    responses_recorded: AtomicU64,
    responses_rejected: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            batches_served: AtomicU64::new(0),
            items_served: AtomicU64::new(0),
            seen_resets: AtomicU64::new(0),
            responses_recorded: AtomicU64::new(0),
            responses_rejected: AtomicU64::new(0),
        }
    }

    pub fn inc_batches_served(&self) {
        self.batches_served.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "batches_served", "counter incremented");
    }

    pub fn add_items_served(&self, n: u64) {
        self.items_served.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_seen_resets(&self) {
        self.seen_resets.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "seen_resets", "counter incremented");
    }

    pub fn inc_responses_recorded(&self) {
        self.responses_recorded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "responses_recorded", "counter incremented");
    }

    pub fn inc_responses_rejected(&self) {
        self.responses_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "responses_rejected", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            batches_served = self.batches_served(),
            items_served = self.items_served(),
            seen_resets = self.seen_resets(),
            responses_recorded = self.responses_recorded(),
            responses_rejected = self.responses_rejected(),
        );
    }

    pub fn batches_served(&self) -> u64 {
        self.batches_served.load(Ordering::Relaxed)
    }

    pub fn items_served(&self) -> u64 {
        self.items_served.load(Ordering::Relaxed)
    }

    pub fn seen_resets(&self) -> u64 {
        self.seen_resets.load(Ordering::Relaxed)
    }

    pub fn responses_recorded(&self) -> u64 {
        self.responses_recorded.load(Ordering::Relaxed)
    }

    pub fn responses_rejected(&self) -> u64 {
        self.responses_rejected.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.batches_served.store(0, Ordering::Relaxed);
        self.items_served.store(0, Ordering::Relaxed);
        self.seen_resets.store(0, Ordering::Relaxed);
        self.responses_recorded.store(0, Ordering::Relaxed);
        self.responses_rejected.store(0, Ordering::Relaxed);
    }
}
