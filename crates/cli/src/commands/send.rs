//! `send` command implementation.

use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

use contracts::Email;
use dispatcher::CancellationToken;

use super::{prepare_blueprint, shutdown_signal, start_metrics};
use crate::cli::SendArgs;
use crate::error::CliError;

/// Execute the `send` command
pub async fn run_send(args: &SendArgs) -> Result<()> {
    let blueprint = prepare_blueprint(&args.dispatch)?;
    start_metrics(args.dispatch.metrics_port)?;

    let dispatcher = dispatcher::create_dispatcher(&blueprint).map_err(CliError::from)?;

    let email = match &args.id {
        Some(id) => Email::new(id, &args.to, &args.subject, &args.body),
        None => Email::with_generated_id(&args.to, &args.subject, &args.body),
    };

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_signal_or_timeout(
        cancel.clone(),
        (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
    ));

    info!(email_id = %email.id, to = %email.to, "Sending email");
    let result = dispatcher.send_with_cancel(&email, &cancel).await;
    watcher.abort();

    let receipt = result?;
    info!(
        email_id = %receipt.email_id,
        attempts = receipt.attempts,
        backend = receipt.backend.as_deref().unwrap_or("-"),
        "Send finished"
    );
    println!("{}", receipt);

    Ok(())
}

/// Cancel `token` on Ctrl+C / SIGTERM, or once `timeout` elapses
async fn cancel_on_signal_or_timeout(token: CancellationToken, timeout: Option<Duration>) {
    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, cancelling send...");
        }
        _ = deadline => {
            warn!(timeout = ?timeout, "Send timed out, cancelling...");
        }
    }
    token.cancel();
}
