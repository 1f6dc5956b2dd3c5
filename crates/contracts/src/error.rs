//! Errors shared across crates: configuration problems and backend rejections

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Delivery attempt rejected by a backend
    #[error("Failed to send email via {backend}: {message}")]
    Delivery { backend: String, message: String },

    /// Backend parameter error
    #[error("backend '{backend}' parameter '{param}': {message}")]
    BackendParam {
        backend: String,
        param: String,
        message: String,
    },

    /// Reading or writing a config file
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn delivery(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn backend_param(
        backend: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::BackendParam {
            backend: backend.into(),
            param: param.into(),
            message: message.into(),
        }
    }
}
