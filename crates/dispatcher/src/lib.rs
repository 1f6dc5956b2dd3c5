//! # Dispatcher
//!
//! Reliable email dispatch.
//!
//! Responsibilities:
//! - Skip emails whose id was already delivered
//! - Retry failed attempts with exponential backoff
//! - Rotate to the next backend once a backend's retry budget is spent
//! - Keep accepted attempts under a sliding-window rate limit

pub mod backends;
pub mod backoff;
pub mod dispatcher;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod pool;
pub mod rate_limit;

pub use backends::{
    create_backend, AnyBackend, CallLog, LogBackend, Script, ScriptedBackend, SimulatedBackend,
    SimulatedBackendConfig,
};
pub use backoff::Backoff;
pub use contracts::{DeliveryBackend, DeliveryReceipt, Email};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, DispatchErrorKind, FailureKind};
pub use guard::{Claim, ClaimGuard, IdempotencyGuard};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use pool::BackendPool;
pub use rate_limit::{RateDecision, RateLimiter};
pub use tokio_util::sync::CancellationToken;
