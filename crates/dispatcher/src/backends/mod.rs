//! Backend implementations
//!
//! Contains LogBackend, SimulatedBackend and ScriptedBackend, plus the
//! [`AnyBackend`] enum used for pools built from configuration.

mod log;
mod scripted;
mod simulated;

pub use self::log::LogBackend;
pub use self::scripted::{CallLog, Script, ScriptedBackend};
pub use self::simulated::{SimulatedBackend, SimulatedBackendConfig};

use contracts::{BackendConfig, BackendType, ContractError, DeliveryBackend, DeliveryReceipt, Email};
use tracing::instrument;

use crate::error::DispatchError;

/// Any of the built-in backends
///
/// `DeliveryBackend` is not object safe, so heterogeneous pools go through
/// this enum instead of `dyn`.
pub enum AnyBackend {
    Log(LogBackend),
    Simulated(SimulatedBackend),
    Scripted(ScriptedBackend),
}

impl DeliveryBackend for AnyBackend {
    fn name(&self) -> &str {
        match self {
            Self::Log(b) => b.name(),
            Self::Simulated(b) => b.name(),
            Self::Scripted(b) => b.name(),
        }
    }

    async fn attempt(&self, email: &Email) -> Result<DeliveryReceipt, ContractError> {
        match self {
            Self::Log(b) => b.attempt(email).await,
            Self::Simulated(b) => b.attempt(email).await,
            Self::Scripted(b) => b.attempt(email).await,
        }
    }
}

impl From<LogBackend> for AnyBackend {
    fn from(backend: LogBackend) -> Self {
        Self::Log(backend)
    }
}

impl From<SimulatedBackend> for AnyBackend {
    fn from(backend: SimulatedBackend) -> Self {
        Self::Simulated(backend)
    }
}

impl From<ScriptedBackend> for AnyBackend {
    fn from(backend: ScriptedBackend) -> Self {
        Self::Scripted(backend)
    }
}

/// Create a backend from configuration
#[instrument(
    name = "dispatcher_create_backend",
    skip(config),
    fields(backend = %config.name, backend_type = ?config.backend_type)
)]
pub fn create_backend(config: &BackendConfig) -> Result<AnyBackend, DispatchError> {
    let backend = match config.backend_type {
        BackendType::Log => LogBackend::new(&config.name).into(),
        BackendType::Simulated => SimulatedBackend::from_params(config)
            .map_err(|e| DispatchError::backend_creation(&config.name, e.to_string()))?
            .into(),
        BackendType::Scripted => ScriptedBackend::from_params(config)
            .map_err(|e| DispatchError::backend_creation(&config.name, e.to_string()))?
            .into(),
    };
    Ok(backend)
}
