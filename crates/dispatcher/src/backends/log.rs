//! LogBackend - accepts every email and writes it to the log

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{ContractError, DeliveryBackend, DeliveryReceipt, Email};
use tracing::{info, instrument};

const PREVIEW_CHARS: usize = 60;

/// Backend that logs emails instead of delivering them
///
/// Useful as a last-resort entry in a pool or as a dry-run target.
pub struct LogBackend {
    name: String,
    accepted: AtomicU64,
}

impl LogBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accepted: AtomicU64::new(0),
        }
    }

    /// Emails accepted so far
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

/// First line of the body, cut at `PREVIEW_CHARS` characters
fn body_preview(body: &str) -> String {
    let line = body.lines().next().unwrap_or_default();
    let mut preview: String = line.chars().take(PREVIEW_CHARS).collect();
    if line.chars().count() > PREVIEW_CHARS || body.lines().nth(1).is_some() {
        preview.push_str("...");
    }
    preview
}

impl DeliveryBackend for LogBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_backend_attempt",
        skip(self, email),
        fields(backend = %self.name, email_id = %email.id)
    )]
    async fn attempt(&self, email: &Email) -> Result<DeliveryReceipt, ContractError> {
        let seq = self.accepted.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            seq,
            to = %email.to,
            subject = %email.subject,
            preview = %body_preview(&email.body),
            "Email accepted"
        );
        Ok(DeliveryReceipt::delivered(&email.id, &self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_backend_attempt() {
        let backend = LogBackend::new("audit");
        let email = Email::new("id-1", "a@example.com", "hello", "world");

        let receipt = backend.attempt(&email).await.unwrap();
        assert_eq!(receipt.to_string(), "Email sent by audit");
        assert_eq!(receipt.email_id, "id-1");

        backend.attempt(&email).await.unwrap();
        assert_eq!(backend.accepted(), 2);
    }

    #[test]
    fn test_body_preview() {
        assert_eq!(body_preview("short"), "short");
        assert_eq!(body_preview("first\nsecond"), "first...");
        assert_eq!(body_preview(""), "");

        let long = "x".repeat(100);
        assert_eq!(body_preview(&long).len(), PREVIEW_CHARS + 3);
    }
}
