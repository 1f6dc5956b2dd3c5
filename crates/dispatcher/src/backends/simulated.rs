//! SimulatedBackend - randomized success after a fixed latency

use std::time::Duration;

use contracts::{BackendConfig, ContractError, DeliveryBackend, DeliveryReceipt, Email};
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, instrument};

/// Default probability that an attempt succeeds
pub const DEFAULT_SUCCESS_RATE: f64 = 0.7;

/// Default simulated latency
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(100);

/// Configuration for SimulatedBackend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedBackendConfig {
    /// Probability in [0, 1] that an attempt succeeds
    pub success_rate: f64,
    /// Delay before the attempt resolves
    pub latency: Duration,
}

impl Default for SimulatedBackendConfig {
    fn default() -> Self {
        Self {
            success_rate: DEFAULT_SUCCESS_RATE,
            latency: DEFAULT_LATENCY,
        }
    }
}

impl SimulatedBackendConfig {
    /// Create config from backend params
    pub fn from_params(config: &BackendConfig) -> Result<Self, ContractError> {
        let success_rate = config.param_or("success_rate", DEFAULT_SUCCESS_RATE)?;
        if !(0.0..=1.0).contains(&success_rate) {
            return Err(ContractError::backend_param(
                &config.name,
                "success_rate",
                format!("must be within [0, 1], got {}", success_rate),
            ));
        }

        let latency_ms = config.param_or("latency_ms", DEFAULT_LATENCY.as_millis() as u64)?;

        Ok(Self {
            success_rate,
            latency: Duration::from_millis(latency_ms),
        })
    }
}

/// Backend that succeeds with a fixed probability
pub struct SimulatedBackend {
    name: String,
    config: SimulatedBackendConfig,
}

impl SimulatedBackend {
    /// Create a new SimulatedBackend; `success_rate` is clamped to [0, 1]
    pub fn new(name: impl Into<String>, config: SimulatedBackendConfig) -> Self {
        Self {
            name: name.into(),
            config: SimulatedBackendConfig {
                success_rate: config.success_rate.clamp(0.0, 1.0),
                ..config
            },
        }
    }

    /// Create from params (for factory)
    pub fn from_params(config: &BackendConfig) -> Result<Self, ContractError> {
        Ok(Self::new(
            &config.name,
            SimulatedBackendConfig::from_params(config)?,
        ))
    }

    pub fn config(&self) -> &SimulatedBackendConfig {
        &self.config
    }
}

impl DeliveryBackend for SimulatedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "simulated_backend_attempt",
        skip(self, email),
        fields(backend = %self.name, email_id = %email.id)
    )]
    async fn attempt(&self, email: &Email) -> Result<DeliveryReceipt, ContractError> {
        // Decide up front; the thread-local rng must not live across the await
        let success = rand::rng().random_bool(self.config.success_rate);

        if !self.config.latency.is_zero() {
            sleep(self.config.latency).await;
        }

        debug!(backend = %self.name, success, "Simulated attempt resolved");

        if success {
            Ok(DeliveryReceipt::delivered(&email.id, &self.name))
        } else {
            Err(ContractError::delivery(&self.name, "simulated failure"))
        }
    }
}
