//! Error types for CLI operations.

use contracts::ContractError;
use dispatcher::DispatchError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or failed validation
    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: ContractError,
    },

    /// A command-line override produced an invalid configuration
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Dispatcher construction error
    #[error("Failed to create dispatcher: {0}")]
    Dispatcher(#[from] DispatchError),

    /// Metrics exporter error
    #[error("Failed to start metrics exporter: {message}")]
    Metrics { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_load(path: impl Into<String>, source: ContractError) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            source,
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn metrics(message: impl Into<String>) -> Self {
        Self::Metrics {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
