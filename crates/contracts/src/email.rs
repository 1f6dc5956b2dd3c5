//! Email work item and delivery receipt.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit of work handed to the dispatcher
///
/// Immutable once constructed. `id` must be unique per logical send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Idempotency key
    pub id: String,
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Message body
    pub body: String,
}

impl Email {
    /// Create an email with a caller-assigned id
    pub fn new(
        id: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Create an email whose id is `"{to}-{unix_millis}"`
    pub fn with_generated_id(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let to = to.into();
        let id = format!("{}-{}", to, Utc::now().timestamp_millis());
        Self::new(id, to, subject, body)
    }
}

/// Outcome recorded on a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// A backend accepted the email during this call
    Delivered,
    /// The id was delivered earlier; no backend was contacted
    AlreadySent,
}

/// Delivery confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub email_id: String,
    pub status: ReceiptStatus,
    /// Backend that accepted the email (None for `AlreadySent`)
    pub backend: Option<String>,
    /// Human-readable confirmation text
    pub message: String,
    /// Attempts consumed by the send call, including the successful one
    pub attempts: u32,
    pub delivered_at: DateTime<Utc>,
}

impl DeliveryReceipt {
    /// Receipt produced by a backend on success
    pub fn delivered(email_id: impl Into<String>, backend: impl Into<String>) -> Self {
        let backend = backend.into();
        Self {
            email_id: email_id.into(),
            status: ReceiptStatus::Delivered,
            message: format!("Email sent by {}", backend),
            backend: Some(backend),
            attempts: 1,
            delivered_at: Utc::now(),
        }
    }

    /// Short-circuit receipt for an id that was already delivered
    pub fn already_sent(email_id: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            status: ReceiptStatus::AlreadySent,
            backend: None,
            message: "Email already sent".to_string(),
            attempts: 0,
            delivered_at: Utc::now(),
        }
    }

    /// Override the attempt count
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_already_sent(&self) -> bool {
        self.status == ReceiptStatus::AlreadySent
    }
}

impl fmt::Display for DeliveryReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
