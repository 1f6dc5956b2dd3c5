//! `batch` command implementation.

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use contracts::{DeliveryReceipt, Email};
use dispatcher::{CancellationToken, DispatchError, Dispatcher, MetricsSnapshot};
use observability::DispatchStatsAggregator;

use super::{prepare_blueprint, shutdown_signal, start_metrics};
use crate::cli::BatchArgs;
use crate::error::CliError;

type SendOutcome = (Result<DeliveryReceipt, DispatchError>, Duration);

/// Execute the `batch` command
pub async fn run_batch(args: &BatchArgs) -> Result<()> {
    let blueprint = prepare_blueprint(&args.dispatch)?;
    start_metrics(args.dispatch.metrics_port)?;

    let dispatcher = dispatcher::create_dispatcher(&blueprint).map_err(CliError::from)?;
    let dispatcher = Arc::new(dispatcher);
    let emails = generate_emails(args.count, &args.domain);

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            warn!("Received shutdown signal, cancelling in-flight sends...");
            cancel.cancel();
        })
    };

    info!(count = emails.len(), duplicates = args.duplicates, "Starting batch");
    let started = Instant::now();

    let mut stats = DispatchStatsAggregator::new();
    send_all(&dispatcher, &emails, &cancel, &mut stats).await;
    if args.duplicates && !cancel.is_cancelled() {
        info!("Re-sending every email to exercise the idempotency guard");
        send_all(&dispatcher, &emails, &cancel, &mut stats).await;
    }
    watcher.abort();

    info!(
        duration_secs = started.elapsed().as_secs_f64(),
        "Batch completed"
    );

    println!("{}", stats.summary());
    print_snapshot(&dispatcher.snapshot());

    Ok(())
}

fn generate_emails(count: usize, domain: &str) -> Vec<Email> {
    (0..count)
        .map(|i| {
            Email::new(
                format!("batch-{}", i),
                format!("user{}@{}", i, domain),
                format!("Batch message {}", i),
                "Generated by mail-dispatch batch",
            )
        })
        .collect()
}

/// Send every email concurrently through the shared dispatcher
async fn send_all(
    dispatcher: &Arc<Dispatcher>,
    emails: &[Email],
    cancel: &CancellationToken,
    stats: &mut DispatchStatsAggregator,
) {
    let mut tasks: JoinSet<SendOutcome> = JoinSet::new();

    for email in emails.iter().cloned() {
        let dispatcher = Arc::clone(dispatcher);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let started = Instant::now();
            let result = dispatcher.send_with_cancel(&email, &cancel).await;
            (result, started.elapsed())
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((result, elapsed)) => record_outcome(stats, result, elapsed),
            Err(e) => warn!(error = %e, "Send task failed to complete"),
        }
    }
}

fn record_outcome(
    stats: &mut DispatchStatsAggregator,
    result: Result<DeliveryReceipt, DispatchError>,
    elapsed: Duration,
) {
    let latency_ms = elapsed.as_secs_f64() * 1000.0;
    match result {
        Ok(receipt) => {
            debug!(email_id = %receipt.email_id, status = ?receipt.status, "Send finished");
            stats.record_receipt(&receipt, latency_ms);
        }
        Err(e) => {
            warn!(error = %e, "Send failed");
            stats.record_failure(e.kind().as_str(), latency_ms);
        }
    }
}

fn print_snapshot(snapshot: &MetricsSnapshot) {
    println!("=== Dispatcher Counters ===");
    println!("Attempts: {}", snapshot.attempts);
    println!("Delivered: {}", snapshot.delivered);
    println!("Backend failures: {}", snapshot.backend_failures);
    println!("Rate limited: {}", snapshot.rate_limited);
    println!("Rotations: {}", snapshot.rotations);
    println!("Already sent: {}", snapshot.already_sent);
    println!("Exhausted: {}", snapshot.exhausted);
    println!("Cancelled: {}", snapshot.cancelled);
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DispatcherSettings;
    use dispatcher::{AnyBackend, ScriptedBackend};

    #[test]
    fn test_generate_emails_unique_ids() {
        let emails = generate_emails(3, "example.org");
        assert_eq!(emails.len(), 3);
        assert_eq!(emails[2].id, "batch-2");
        assert_eq!(emails[2].to, "user2@example.org");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_all_twice_hits_guard() {
        let settings = DispatcherSettings {
            rate_limit: 100,
            ..DispatcherSettings::default()
        };
        let backends: Vec<AnyBackend> = vec![ScriptedBackend::always_succeed("ok").into()];
        let dispatcher = Arc::new(Dispatcher::new(backends, &settings).unwrap());
        let emails = generate_emails(4, "example.com");
        let cancel = CancellationToken::new();
        let mut stats = DispatchStatsAggregator::new();

        send_all(&dispatcher, &emails, &cancel, &mut stats).await;
        send_all(&dispatcher, &emails, &cancel, &mut stats).await;

        let summary = stats.summary();
        assert_eq!(summary.total_sends, 8);
        assert_eq!(summary.delivered, 4);
        assert_eq!(summary.already_sent, 4);
        assert_eq!(summary.failed, 0);
        assert_eq!(dispatcher.snapshot().attempts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_recorded_by_kind() {
        let settings = DispatcherSettings {
            max_retries: 1,
            rate_limit: 100,
            ..DispatcherSettings::default()
        };
        let backends: Vec<AnyBackend> = vec![ScriptedBackend::always_fail("down").into()];
        let dispatcher = Arc::new(Dispatcher::new(backends, &settings).unwrap());
        let mut stats = DispatchStatsAggregator::new();

        send_all(
            &dispatcher,
            &generate_emails(2, "example.com"),
            &CancellationToken::new(),
            &mut stats,
        )
        .await;

        let summary = stats.summary();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failure_counts.get("exhausted"), Some(&2));
    }
}
