//! Dispatcher - retry / backoff / failover loop over a backend pool

use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use contracts::{DeliveryBackend, DeliveryReceipt, DispatchBlueprint, DispatcherSettings, Email};

use crate::backends::{create_backend, AnyBackend};
use crate::backoff::Backoff;
use crate::error::{DispatchError, FailureKind};
use crate::guard::{Claim, IdempotencyGuard};
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::pool::BackendPool;
use crate::rate_limit::{RateDecision, RateLimiter};

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder<B = AnyBackend> {
    settings: DispatcherSettings,
    backends: Vec<B>,
}

impl<B: DeliveryBackend + Sync> DispatcherBuilder<B> {
    /// Create a new DispatcherBuilder
    pub fn new(settings: DispatcherSettings) -> Self {
        Self {
            settings,
            backends: Vec::new(),
        }
    }

    /// Append a backend; rotation follows insertion order
    pub fn backend(mut self, backend: impl Into<B>) -> Self {
        self.backends.push(backend.into());
        self
    }

    /// Build the dispatcher
    pub fn build(self) -> Result<Dispatcher<B>, DispatchError> {
        Dispatcher::new(self.backends, &self.settings)
    }
}

/// Per-call bookkeeping
#[derive(Debug, Clone, Copy)]
struct AttemptState {
    attempts: u32,
    backend_index: usize,
}

/// Sends emails through a pool of backends with retry, backoff, rotation,
/// idempotency and a sliding-window rate limit
///
/// One instance is meant to be shared (`Arc<Dispatcher>`) by concurrent callers.
pub struct Dispatcher<B = AnyBackend> {
    pool: BackendPool<B>,
    guard: IdempotencyGuard,
    limiter: RateLimiter,
    backoff: Backoff,
    max_retries: u32,
    metrics: Arc<DispatchMetrics>,
}

impl<B> Dispatcher<B> {
    /// Get dispatcher metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn pool(&self) -> &BackendPool<B> {
        &self.pool
    }

    pub fn guard(&self) -> &IdempotencyGuard {
        &self.guard
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Upper bound on attempts for one email: `max_retries × backend_count`
    pub fn attempt_budget(&self) -> u32 {
        self.max_retries
            .saturating_mul(u32::try_from(self.pool.len()).unwrap_or(u32::MAX))
    }

    /// Whether `id` was delivered by this dispatcher
    pub fn has_sent(&self, id: &str) -> bool {
        self.guard.has_sent(id)
    }
}

impl<B: DeliveryBackend + Sync> Dispatcher<B> {
    /// Create a dispatcher over `backends` (rotation order = vector order)
    ///
    /// # Errors
    /// `InvalidConfig` for an empty backend list or zero retries / rate limit / window.
    pub fn new(backends: Vec<B>, settings: &DispatcherSettings) -> Result<Self, DispatchError> {
        if settings.max_retries == 0 {
            return Err(DispatchError::invalid_config("max_retries must be >= 1"));
        }
        if settings.rate_limit == 0 {
            return Err(DispatchError::invalid_config("rate_limit must be >= 1"));
        }
        if settings.rate_window_ms == 0 {
            return Err(DispatchError::invalid_config("rate_window_ms must be >= 1"));
        }
        let pool = BackendPool::new(backends)
            .ok_or_else(|| DispatchError::invalid_config("at least one backend is required"))?;

        Ok(Self {
            pool,
            guard: IdempotencyGuard::new(),
            limiter: RateLimiter::new(settings.rate_limit, settings.rate_window()),
            backoff: Backoff::new(settings.base_delay(), settings.max_delay()),
            max_retries: settings.max_retries,
            metrics: Arc::new(DispatchMetrics::new()),
        })
    }

    /// Send an email, retrying until success or exhaustion
    pub async fn send(&self, email: &Email) -> Result<DeliveryReceipt, DispatchError> {
        self.send_with_cancel(email, &CancellationToken::new()).await
    }

    /// Send an email, abandoning the retry loop once `cancel` fires
    ///
    /// The token is raced against every backend attempt and backoff sleep.
    /// No backoff is slept after the final attempt; exhaustion is returned immediately.
    #[instrument(
        name = "dispatcher_send",
        skip(self, email, cancel),
        fields(email_id = %email.id)
    )]
    pub async fn send_with_cancel(
        &self,
        email: &Email,
        cancel: &CancellationToken,
    ) -> Result<DeliveryReceipt, DispatchError> {
        let started = Instant::now();
        let result = self.dispatch(email, cancel).await;

        observability::record_send_latency_ms(started.elapsed().as_secs_f64() * 1000.0);
        let outcome = match &result {
            Ok(receipt) if receipt.is_already_sent() => "already_sent",
            Ok(_) => "delivered",
            Err(e) => e.kind().as_str(),
        };
        observability::record_send_outcome(outcome);

        result
    }

    async fn dispatch(
        &self,
        email: &Email,
        cancel: &CancellationToken,
    ) -> Result<DeliveryReceipt, DispatchError> {
        let claim = match self.guard.claim(&email.id) {
            Claim::AlreadySent => {
                self.metrics.inc_already_sent();
                info!(email_id = %email.id, "Email has already been sent");
                return Ok(DeliveryReceipt::already_sent(&email.id));
            }
            Claim::InFlight => {
                warn!(email_id = %email.id, "Email is already being dispatched");
                return Err(DispatchError::InFlight {
                    email_id: email.id.clone(),
                });
            }
            Claim::Acquired(claim) => claim,
        };

        let budget = self.attempt_budget();
        let mut state = AttemptState {
            attempts: 0,
            backend_index: self.pool.cursor(),
        };
        let mut last_failure = FailureKind::BackendFailure;
        let mut last_error = None;

        while state.attempts < budget {
            if cancel.is_cancelled() {
                return Err(self.cancelled(email, state.attempts));
            }

            let delay = self.backoff.delay(state.attempts);
            let backend = self.pool.get(state.backend_index);
            let attempt = state.attempts + 1;

            let failure = match self.limiter.try_acquire(Instant::now()) {
                RateDecision::Denied { retry_after } => {
                    self.metrics.inc_rate_limited();
                    observability::record_attempt(backend.name(), "rate_limited");
                    warn!(
                        backend = backend.name(),
                        attempt,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "Rate limit exceeded"
                    );
                    last_error = None;
                    FailureKind::RateLimited
                }
                RateDecision::Allowed => {
                    self.metrics.inc_attempts();
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            return Err(self.cancelled(email, state.attempts));
                        }
                        result = backend.attempt(email) => result,
                    };

                    match result {
                        Ok(receipt) => {
                            claim.commit();
                            self.metrics.inc_delivered();
                            observability::record_attempt(backend.name(), "success");
                            info!(
                                backend = backend.name(),
                                attempt,
                                "{}", receipt
                            );
                            return Ok(receipt.with_attempts(attempt));
                        }
                        Err(e) => {
                            self.metrics.inc_backend_failures();
                            observability::record_attempt(backend.name(), "failure");
                            warn!(backend = backend.name(), attempt, error = %e, "Delivery attempt failed");
                            last_error = Some(e.to_string());
                            FailureKind::BackendFailure
                        }
                    }
                }
            };

            state.attempts = attempt;
            last_failure = failure;

            if state.attempts % self.max_retries == 0 {
                self.rotate(&mut state);
            }

            if state.attempts < budget {
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off"
                );
                observability::record_backoff_ms(delay.as_secs_f64() * 1000.0);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(self.cancelled(email, state.attempts));
                    }
                    _ = sleep(delay) => {}
                }
            }
        }

        self.metrics.inc_exhausted();
        error!(
            email_id = %email.id,
            attempts = state.attempts,
            last_failure = %last_failure,
            "All providers failed after multiple attempts"
        );
        Err(DispatchError::Exhausted {
            email_id: email.id.clone(),
            attempts: state.attempts,
            last_failure,
            last_error,
        })
    }

    /// Move this call to the next backend and pull the shared cursor along
    fn rotate(&self, state: &mut AttemptState) {
        let from = state.backend_index;
        state.backend_index = self.pool.advance_from(from);
        self.metrics.inc_rotations();

        let from_name = self.pool.get(from).name();
        let to_name = self.pool.get(state.backend_index).name();
        observability::record_rotation(from_name, to_name);
        info!(from = from_name, to = to_name, "Switching to provider: {}", to_name);
    }

    fn cancelled(&self, email: &Email, attempts: u32) -> DispatchError {
        self.metrics.inc_cancelled();
        warn!(email_id = %email.id, attempts, "Dispatch cancelled");
        DispatchError::Cancelled {
            email_id: email.id.clone(),
            attempts,
        }
    }
}

/// Convenience function to create a dispatcher from a blueprint
#[instrument(
    name = "dispatcher_create",
    skip(blueprint),
    fields(backend_count = blueprint.backends.len())
)]
pub fn create_dispatcher(blueprint: &DispatchBlueprint) -> Result<Dispatcher, DispatchError> {
    let backends = blueprint
        .backends
        .iter()
        .map(create_backend)
        .collect::<Result<Vec<_>, _>>()?;
    Dispatcher::new(backends, &blueprint.dispatcher)
}
