//! # Observability
//!
//! Tracing and Prometheus metrics for the dispatch engine.
//!
//! The dispatcher only calls the `record_*` functions; they are no-ops until a
//! recorder is installed with [`init_metrics`]. Binaries call
//! [`init_with_config`] once at startup.
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     verbosity: Verbosity::from_flags(false, 1),
//!     ..Default::default()
//! })?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    describe_metrics, record_attempt, record_backoff_ms, record_rotation, record_send_latency_ms,
    record_send_outcome, DispatchStatsAggregator, DispatchSummary, SampleStats, StatsSummary,
};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}

/// Default log level when `RUST_LOG` is unset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only; `RUST_LOG` is ignored
    Quiet,
    #[default]
    Normal,
    Debug,
    Trace,
}

impl Verbosity {
    /// Map `-q` / repeated `-v` flags
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Debug,
            (false, _) => Self::Trace,
        }
    }

    pub fn as_level(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    pub verbosity: Verbosity,
    /// Prometheus listener port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Build the level filter for `verbosity`
pub fn build_filter(verbosity: Verbosity) -> EnvFilter {
    if verbosity == Verbosity::Quiet {
        return EnvFilter::new(verbosity.as_level());
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.as_level()))
}

/// Install the global tracing subscriber and, if configured, the Prometheus exporter
///
/// Logs are written to stderr; stdout is left to command output.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(config.verbosity))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        verbosity = ?config.verbosity,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Install the Prometheus recorder with an HTTP listener on `port`
pub fn init_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {}", port))?;
    describe_metrics();

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, 5), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(true, 2), Verbosity::Quiet);
        assert_eq!(Verbosity::Quiet.as_level(), "warn");
    }

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.verbosity, Verbosity::Normal);
        assert!(config.metrics_port.is_none());
    }
}
