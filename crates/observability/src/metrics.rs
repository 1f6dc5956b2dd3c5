//! Dispatch metrics
//!
//! Prometheus recorders for attempts, rotations and send outcomes, plus an
//! in-memory aggregator for run summaries.

use std::collections::HashMap;

use contracts::DeliveryReceipt;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

pub const ATTEMPTS_TOTAL: &str = "mail_dispatch_attempts_total";
pub const ROTATIONS_TOTAL: &str = "mail_dispatch_rotations_total";
pub const SENDS_TOTAL: &str = "mail_dispatch_sends_total";
pub const BACKOFF_MS: &str = "mail_dispatch_backoff_ms";
pub const SEND_LATENCY_MS: &str = "mail_dispatch_send_latency_ms";

/// Register help text and units with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        ATTEMPTS_TOTAL,
        "Delivery attempts by backend and outcome (success, failure, rate_limited)"
    );
    describe_counter!(ROTATIONS_TOTAL, "Switches from one backend to the next");
    describe_counter!(SENDS_TOTAL, "Finished send calls by outcome");
    describe_histogram!(BACKOFF_MS, Unit::Milliseconds, "Backoff sleeps between attempts");
    describe_histogram!(
        SEND_LATENCY_MS,
        Unit::Milliseconds,
        "Wall time of a send call including retries"
    );
}

/// Record a single delivery attempt
///
/// `outcome` is one of `success`, `failure`, `rate_limited`.
pub fn record_attempt(backend: &str, outcome: &str) {
    counter!(
        ATTEMPTS_TOTAL,
        "backend" => backend.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a backend rotation
pub fn record_rotation(from: &str, to: &str) {
    counter!(
        ROTATIONS_TOTAL,
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// Record the terminal outcome of a send call
pub fn record_send_outcome(outcome: &str) {
    counter!(
        SENDS_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a backoff sleep
pub fn record_backoff_ms(delay_ms: f64) {
    histogram!(BACKOFF_MS).record(delay_ms);
}

/// Record end-to-end latency of a send call
pub fn record_send_latency_ms(latency_ms: f64) {
    histogram!(SEND_LATENCY_MS).record(latency_ms);
}


/// Dispatch statistics aggregator
///
/// Aggregates send outcomes in memory for summary output.
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// Total send calls
    pub total_sends: u64,

    /// Sends that reached a backend and succeeded
    pub delivered: u64,

    /// Sends short-circuited by the idempotency guard
    pub already_sent: u64,

    /// Sends that ended in an error
    pub failed: u64,

    /// Attempts per delivered send
    pub attempt_stats: SampleStats,

    /// Send latency (ms)
    pub latency_stats: SampleStats,

    /// Deliveries per backend
    pub backend_counts: HashMap<String, u64>,

    /// Failures per error kind
    pub failure_counts: HashMap<String, u64>,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful send (delivered or already sent)
    pub fn record_receipt(&mut self, receipt: &DeliveryReceipt, latency_ms: f64) {
        self.total_sends += 1;
        self.latency_stats.push(latency_ms);

        if receipt.is_already_sent() {
            self.already_sent += 1;
            return;
        }

        self.delivered += 1;
        self.attempt_stats.push(f64::from(receipt.attempts));
        if let Some(backend) = &receipt.backend {
            *self.backend_counts.entry(backend.clone()).or_default() += 1;
        }
    }

    /// Record a failed send under its error kind
    pub fn record_failure(&mut self, kind: &str, latency_ms: f64) {
        self.total_sends += 1;
        self.failed += 1;
        self.latency_stats.push(latency_ms);
        *self.failure_counts.entry(kind.to_string()).or_default() += 1;
    }

    pub fn summary(&self) -> DispatchSummary {
        let failure_rate = if self.total_sends == 0 {
            0.0
        } else {
            self.failed as f64 / self.total_sends as f64 * 100.0
        };

        DispatchSummary {
            total_sends: self.total_sends,
            delivered: self.delivered,
            already_sent: self.already_sent,
            failed: self.failed,
            failure_rate,
            attempts: self.attempt_stats.summary(),
            latency_ms: self.latency_stats.summary(),
            backend_counts: self.backend_counts.clone(),
            failure_counts: self.failure_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary report printed after a batch run
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total_sends: u64,
    pub delivered: u64,
    pub already_sent: u64,
    pub failed: u64,
    pub failure_rate: f64,
    pub attempts: StatsSummary,
    pub latency_ms: StatsSummary,
    pub backend_counts: HashMap<String, u64>,
    pub failure_counts: HashMap<String, u64>,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Total sends: {}", self.total_sends)?;
        writeln!(f, "Delivered: {}", self.delivered)?;
        writeln!(f, "Already sent: {}", self.already_sent)?;
        writeln!(f, "Failed: {} ({:.2}%)", self.failed, self.failure_rate)?;
        writeln!(f, "Attempts per delivery: {}", self.attempts)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        write_counts(f, "Deliveries by backend:", &self.backend_counts)?;
        write_counts(f, "Failures by kind:", &self.failure_counts)
    }
}

fn write_counts(
    f: &mut std::fmt::Formatter<'_>,
    title: &str,
    counts: &HashMap<String, u64>,
) -> std::fmt::Result {
    if counts.is_empty() {
        return Ok(());
    }
    writeln!(f, "{}", title)?;
    let mut sorted: Vec<_> = counts.iter().collect();
    sorted.sort();
    for (key, count) in sorted {
        writeln!(f, "  {}: {}", key, count)?;
    }
    Ok(())
}

/// Order statistics over a set of samples
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: usize,
    pub min: f64,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
    pub mean: f64,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.1}, p50={:.1}, p95={:.1}, max={:.1}, mean={:.2} (n={})",
            self.min, self.p50, self.p95, self.max, self.mean, self.count
        )
    }
}

/// Retained samples; batch runs are small enough to keep every value
#[derive(Debug, Clone, Default)]
pub struct SampleStats {
    samples: Vec<f64>,
}

impl SampleStats {
    pub fn push(&mut self, value: f64) {
        self.samples.push(value);
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Nearest-rank percentile, `p` in `[0, 100]`
    pub fn percentile(&self, p: f64) -> Option<f64> {
        percentile_of(&self.sorted(), p)
    }

    pub fn summary(&self) -> StatsSummary {
        let sorted = self.sorted();
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return StatsSummary::default();
        };

        StatsSummary {
            count: sorted.len(),
            min,
            p50: percentile_of(&sorted, 50.0).unwrap_or(min),
            p95: percentile_of(&sorted, 95.0).unwrap_or(max),
            max,
            mean: self.mean(),
        }
    }

    fn sorted(&self) -> Vec<f64> {
        let mut sorted = self.samples.clone();
        sorted.sort_by(f64::total_cmp);
        sorted
    }
}

fn percentile_of(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted.get(rank.saturating_sub(1)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_stats() {
        let mut stats = SampleStats::default();
        for value in [5.0, 1.0, 4.0, 2.0, 3.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert_eq!(stats.percentile(50.0), Some(3.0));
        assert_eq!(stats.percentile(95.0), Some(5.0));
        assert_eq!(stats.percentile(0.0), Some(1.0));

        let summary = stats.summary();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.count, 5);
    }

    #[test]
    fn test_empty_stats() {
        let stats = SampleStats::default();
        assert_eq!(stats.percentile(50.0), None);
        assert_eq!(stats.summary().to_string(), "N/A");
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = DispatchStatsAggregator::new();

        aggregator.record_receipt(
            &DeliveryReceipt::delivered("a", "Provider1").with_attempts(3),
            120.0,
        );
        aggregator.record_receipt(&DeliveryReceipt::already_sent("a"), 0.1);
        aggregator.record_failure("exhausted", 900.0);

        assert_eq!(aggregator.total_sends, 3);
        assert_eq!(aggregator.delivered, 1);
        assert_eq!(aggregator.already_sent, 1);
        assert_eq!(aggregator.failed, 1);
        assert_eq!(aggregator.backend_counts.get("Provider1"), Some(&1));
        assert_eq!(aggregator.failure_counts.get("exhausted"), Some(&1));
        assert!((aggregator.attempt_stats.mean() - 3.0).abs() < 1e-10);
        assert_eq!(aggregator.latency_stats.count(), 3);

        aggregator.reset();
        assert_eq!(aggregator.total_sends, 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DispatchStatsAggregator::new();
        for _ in 0..3 {
            aggregator.record_receipt(&DeliveryReceipt::delivered("x", "Provider2"), 10.0);
        }
        aggregator.record_failure("exhausted", 50.0);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total sends: 4"));
        assert!(output.contains("25.00%"));
        assert!(output.contains("Provider2: 3"));
        assert!(output.contains("exhausted: 1"));
    }
}
