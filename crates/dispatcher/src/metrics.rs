//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one dispatcher instance
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Attempts that reached a backend
    attempts: AtomicU64,
    /// Successful deliveries
    delivered: AtomicU64,
    /// Attempts rejected by a backend
    backend_failures: AtomicU64,
    /// Attempts denied by the rate limiter
    rate_limited: AtomicU64,
    /// Backend rotations
    rotations: AtomicU64,
    /// Sends short-circuited by the idempotency guard
    already_sent: AtomicU64,
    /// Sends that used up every backend
    exhausted: AtomicU64,
    /// Sends abandoned through cancellation
    cancelled: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn inc_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn backend_failures(&self) -> u64 {
        self.backend_failures.load(Ordering::Relaxed)
    }

    pub fn inc_backend_failures(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    pub fn inc_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    pub fn inc_rotations(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn already_sent(&self) -> u64 {
        self.already_sent.load(Ordering::Relaxed)
    }

    pub fn inc_already_sent(&self) {
        self.already_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exhausted(&self) -> u64 {
        self.exhausted.load(Ordering::Relaxed)
    }

    pub fn inc_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn inc_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts(),
            delivered: self.delivered(),
            backend_failures: self.backend_failures(),
            rate_limited: self.rate_limited(),
            rotations: self.rotations(),
            already_sent: self.already_sent(),
            exhausted: self.exhausted(),
            cancelled: self.cancelled(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub delivered: u64,
    pub backend_failures: u64,
    pub rate_limited: u64,
    pub rotations: u64,
    pub already_sent: u64,
    pub exhausted: u64,
    pub cancelled: u64,
}
