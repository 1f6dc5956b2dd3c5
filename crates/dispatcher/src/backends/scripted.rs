//! ScriptedBackend - deterministic backend for tests and dry runs
//!
//! Behaviour is fixed by a [`Script`]; every call is counted and can be
//! recorded into a shared [`CallLog`] to assert rotation order.

use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use contracts::{BackendConfig, ContractError, DeliveryBackend, DeliveryReceipt, Email};
use tokio::time::sleep;
use tracing::instrument;

/// Deterministic behaviour of a [`ScriptedBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Every attempt succeeds
    Succeed,
    /// Every attempt fails
    Fail,
    /// The first `n` attempts fail, the rest succeed
    FailThenSucceed(u32),
}

impl FromStr for Script {
    type Err = String;

    /// Parses `succeed`, `fail` or `fail_then_succeed:<n>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "succeed" => Ok(Self::Succeed),
            None if s == "fail" => Ok(Self::Fail),
            Some(("fail_then_succeed", n)) => n
                .parse()
                .map(Self::FailThenSucceed)
                .map_err(|e| format!("invalid failure count '{}': {}", n, e)),
            _ => Err(format!("unknown script '{}'", s)),
        }
    }
}

/// Ordered record of which backend received each attempt
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, backend: &str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(backend.to_string());
    }

    /// Backend names in call order
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Backend with scripted outcomes
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    name: String,
    script: Script,
    latency: Duration,
    calls: Arc<AtomicU32>,
    call_log: Option<CallLog>,
}

impl ScriptedBackend {
    pub fn new(name: impl Into<String>, script: Script) -> Self {
        Self {
            name: name.into(),
            script,
            latency: Duration::ZERO,
            calls: Arc::new(AtomicU32::new(0)),
            call_log: None,
        }
    }

    pub fn always_succeed(name: impl Into<String>) -> Self {
        Self::new(name, Script::Succeed)
    }

    pub fn always_fail(name: impl Into<String>) -> Self {
        Self::new(name, Script::Fail)
    }

    pub fn fail_then_succeed(name: impl Into<String>, failures: u32) -> Self {
        Self::new(name, Script::FailThenSucceed(failures))
    }

    /// Delay every attempt by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Record every attempt into `log`
    pub fn with_call_log(mut self, log: &CallLog) -> Self {
        self.call_log = Some(log.clone());
        self
    }

    /// Create from params (for factory)
    ///
    /// `mode` = succeed | fail | fail_then_succeed, `failures` = N, `latency_ms` = N
    pub fn from_params(config: &BackendConfig) -> Result<Self, ContractError> {
        let mode = config
            .params
            .get("mode")
            .map(String::as_str)
            .unwrap_or("succeed");
        let script = match mode {
            "fail_then_succeed" => Script::FailThenSucceed(config.param_or("failures", 1)?),
            other => other
                .parse()
                .map_err(|e| ContractError::backend_param(&config.name, "mode", e))?,
        };
        let latency_ms = config.param_or("latency_ms", 0u64)?;

        Ok(Self::new(&config.name, script).with_latency(Duration::from_millis(latency_ms)))
    }

    pub fn script(&self) -> Script {
        self.script
    }

    /// Number of attempts received so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared counter that outlives moving the backend into a pool
    pub fn call_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

impl DeliveryBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "scripted_backend_attempt",
        skip(self, email),
        fields(backend = %self.name, email_id = %email.id)
    )]
    async fn attempt(&self, email: &Email) -> Result<DeliveryReceipt, ContractError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.call_log {
            log.record(&self.name);
        }

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        let succeed = match self.script {
            Script::Succeed => true,
            Script::Fail => false,
            Script::FailThenSucceed(failures) => call >= failures,
        };

        if succeed {
            Ok(DeliveryReceipt::delivered(&email.id, &self.name))
        } else {
            Err(ContractError::delivery(
                &self.name,
                format!("scripted failure on call {}", call + 1),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::BackendType;
    use std::collections::HashMap;

    fn email() -> Email {
        Email::new("s-1", "a@example.com", "s", "b")
    }

    #[tokio::test]
    async fn test_fail_then_succeed() {
        let backend = ScriptedBackend::fail_then_succeed("flaky", 2);

        assert!(backend.attempt(&email()).await.is_err());
        assert!(backend.attempt(&email()).await.is_err());
        assert!(backend.attempt(&email()).await.is_ok());
        assert!(backend.attempt(&email()).await.is_ok());
        assert_eq!(backend.calls(), 4);
    }

    #[tokio::test]
    async fn test_call_log_order() {
        let log = CallLog::new();
        let a = ScriptedBackend::always_fail("A").with_call_log(&log);
        let b = ScriptedBackend::always_succeed("B").with_call_log(&log);

        let _ = a.attempt(&email()).await;
        let _ = b.attempt(&email()).await;
        let _ = a.attempt(&email()).await;

        assert_eq!(log.entries(), ["A", "B", "A"]);
    }

    #[tokio::test]
    async fn test_counter_survives_move() {
        let backend = ScriptedBackend::always_succeed("A");
        let counter = backend.call_counter();
        let moved = vec![backend];

        moved[0].attempt(&email()).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_script_from_str() {
        assert_eq!("succeed".parse::<Script>(), Ok(Script::Succeed));
        assert_eq!("fail".parse::<Script>(), Ok(Script::Fail));
        assert_eq!(
            "fail_then_succeed:3".parse::<Script>(),
            Ok(Script::FailThenSucceed(3))
        );
        assert!("sometimes".parse::<Script>().is_err());
    }

    #[test]
    fn test_from_params() {
        let config = BackendConfig {
            name: "flaky".to_string(),
            backend_type: BackendType::Scripted,
            params: HashMap::from([
                ("mode".to_string(), "fail_then_succeed".to_string()),
                ("failures".to_string(), "4".to_string()),
            ]),
        };

        let backend = ScriptedBackend::from_params(&config).unwrap();
        assert_eq!(backend.script(), Script::FailThenSucceed(4));
        assert_eq!(backend.name(), "flaky");
    }
}
