//! Global atomic counters for validation and promotion activity.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Relaxed atomic counters, safe to bump from any worker.
pub struct Metrics {
    validations: AtomicU64,
    native_runs: AtomicU64,
    fallbacks: AtomicU64,
    timeouts: AtomicU64,
    promotions_accepted: AtomicU64,
    promotions_rejected: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            validations: AtomicU64::new(0),
            native_runs: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            promotions_accepted: AtomicU64::new(0),
            promotions_rejected: AtomicU64::new(0),
        }
    }

    pub fn inc_validations(&self) {
        self.validations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "validations", "counter incremented");
    }

    pub fn inc_native_runs(&self) {
        self.native_runs.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "native_runs", "counter incremented");
    }

    pub fn inc_fallbacks(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fallbacks", "counter incremented");
    }

    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "timeouts", "counter incremented");
    }

    /// Record the terminal state of one promotion attempt.
    pub fn record_promotion(&self, accepted: bool) {
        if accepted {
            self.promotions_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.promotions_rejected.fetch_add(1, Ordering::Relaxed);
        }
        tracing::trace!(metric = "promotions", accepted, "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a batch or promotion run)
    /// rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            validations = self.validations(),
            native_runs = self.native_runs(),
            fallbacks = self.fallbacks(),
            timeouts = self.timeouts(),
            promotions_accepted = self.promotions_accepted(),
            promotions_rejected = self.promotions_rejected(),
        );
    }

    pub fn validations(&self) -> u64 {
        self.validations.load(Ordering::Relaxed)
    }

    pub fn native_runs(&self) -> u64 {
        self.native_runs.load(Ordering::Relaxed)
    }

    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn promotions_accepted(&self) -> u64 {
        self.promotions_accepted.load(Ordering::Relaxed)
    }

    pub fn promotions_rejected(&self) -> u64 {
        self.promotions_rejected.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.validations.store(0, Ordering::Relaxed);
        self.native_runs.store(0, Ordering::Relaxed);
        self.fallbacks.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.promotions_accepted.store(0, Ordering::Relaxed);
        self.promotions_rejected.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.validations(), 0);
        m.inc_validations();
        m.inc_validations();
        assert_eq!(m.validations(), 2);

        m.inc_fallbacks();
        m.inc_native_runs();
        m.inc_timeouts();
        assert_eq!(m.fallbacks(), 1);
        assert_eq!(m.native_runs(), 1);
        assert_eq!(m.timeouts(), 1);

        m.record_promotion(true);
        m.record_promotion(false);
        m.record_promotion(false);
        assert_eq!(m.promotions_accepted(), 1);
        assert_eq!(m.promotions_rejected(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_validations();
        m.inc_timeouts();
        m.record_promotion(true);
        m.reset();
        assert_eq!(m.validations(), 0);
        assert_eq!(m.timeouts(), 0);
        assert_eq!(m.promotions_accepted(), 0);
    }
}
