//! DispatchBlueprint - Config Loader output
//!
//! Describes the full dispatch setup: retry/rate policy and the ordered backend list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::ContractError;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete dispatch configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Retry / rate / backoff policy
    #[serde(default)]
    pub dispatcher: DispatcherSettings,

    /// Backends in rotation order
    pub backends: Vec<BackendConfig>,
}

impl Default for DispatchBlueprint {
    /// Two simulated providers at 70% success, the stock demo setup
    fn default() -> Self {
        let simulated = |name: &str| BackendConfig {
            name: name.to_string(),
            backend_type: BackendType::Simulated,
            params: HashMap::from([
                ("success_rate".to_string(), "0.7".to_string()),
                ("latency_ms".to_string(), "100".to_string()),
            ]),
        };

        Self {
            version: ConfigVersion::V1,
            dispatcher: DispatcherSettings::default(),
            backends: vec![simulated("Provider1"), simulated("Provider2")],
        }
    }
}

/// Dispatcher policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// Consecutive attempts per backend before rotating
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Accepted attempts per rate window
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,

    /// Rate window length in milliseconds
    #[serde(default = "default_rate_window_ms")]
    pub rate_window_ms: u64,

    /// Backoff base delay in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Optional backoff cap in milliseconds (None = uncapped)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl DispatcherSettings {
    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay_ms.map(Duration::from_millis)
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            rate_limit: default_rate_limit(),
            rate_window_ms: default_rate_window_ms(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: None,
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_rate_limit() -> usize {
    5
}

fn default_rate_window_ms() -> u64 {
    1000
}

fn default_base_delay_ms() -> u64 {
    100
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend name (diagnostics only)
    pub name: String,

    /// Backend type
    pub backend_type: BackendType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl BackendConfig {
    /// Parse an optional parameter
    ///
    /// # Errors
    /// Returns `BackendParam` if the value is present but does not parse.
    pub fn param<T>(&self, key: &str) -> Result<Option<T>, ContractError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.params
            .get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| {
                    ContractError::backend_param(&self.name, key, format!("'{}': {}", raw, e))
                })
            })
            .transpose()
    }

    /// Parse a parameter, falling back to `default` when absent
    pub fn param_or<T>(&self, key: &str, default: T) -> Result<T, ContractError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        Ok(self.param(key)?.unwrap_or(default))
    }
}

/// Backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// Randomized success after a fixed latency
    Simulated,
    /// Always succeeds, logs the email
    Log,
    /// Deterministic behaviour (`mode` = succeed | fail | fail_then_succeed)
    Scripted,
}
