//! DeliveryBackend trait - Dispatcher output interface
//!
//! Defines the abstract interface for delivery backends.

use crate::{ContractError, DeliveryReceipt, Email};

/// Delivery backend trait
///
/// Backends are shared by concurrent sends, so `attempt` takes `&self`.
#[trait_variant::make(DeliveryBackend: Send)]
pub trait LocalDeliveryBackend {
    /// Backend name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Attempt a single delivery
    ///
    /// # Errors
    /// Returns a delivery error (should include context). Every error is
    /// treated as transient by the dispatcher.
    async fn attempt(&self, email: &Email) -> Result<DeliveryReceipt, ContractError>;
}
