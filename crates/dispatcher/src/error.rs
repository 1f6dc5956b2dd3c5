//! Dispatcher error types

use std::fmt;

use thiserror::Error;

/// Cause of a single failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The rate limiter denied the attempt
    RateLimited,
    /// The backend rejected the email
    BackendFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::BackendFailure => "backend_failure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat classification of [`DispatchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    Exhausted,
    InFlight,
    Cancelled,
    InvalidConfig,
    BackendCreation,
}

impl DispatchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::InFlight => "in_flight",
            Self::Cancelled => "cancelled",
            Self::InvalidConfig => "invalid_config",
            Self::BackendCreation => "backend_creation",
        }
    }
}

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Every backend used up its retry budget
    #[error("All providers failed after {attempts} attempts (last failure: {last_failure}{})",
        .last_error.as_deref().map(|e| format!(", {e}")).unwrap_or_default())]
    Exhausted {
        email_id: String,
        attempts: u32,
        last_failure: FailureKind,
        last_error: Option<String>,
    },

    /// Another send of the same id is still running
    #[error("email '{email_id}' is already being dispatched")]
    InFlight { email_id: String },

    /// The caller's cancellation token fired
    #[error("dispatch of email '{email_id}' cancelled after {attempts} attempts")]
    Cancelled { email_id: String, attempts: u32 },

    /// Dispatcher settings rejected at construction
    #[error("invalid dispatcher configuration: {message}")]
    InvalidConfig { message: String },

    /// Backend creation error
    #[error("failed to create backend '{name}': {message}")]
    BackendCreation { name: String, message: String },
}

impl DispatchError {
    pub fn kind(&self) -> DispatchErrorKind {
        match self {
            Self::Exhausted { .. } => DispatchErrorKind::Exhausted,
            Self::InFlight { .. } => DispatchErrorKind::InFlight,
            Self::Cancelled { .. } => DispatchErrorKind::Cancelled,
            Self::InvalidConfig { .. } => DispatchErrorKind::InvalidConfig,
            Self::BackendCreation { .. } => DispatchErrorKind::BackendCreation,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a backend creation error
    pub fn backend_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message() {
        let err = DispatchError::Exhausted {
            email_id: "x".to_string(),
            attempts: 6,
            last_failure: FailureKind::BackendFailure,
            last_error: Some("Failed to send email via B: down".to_string()),
        };
        assert_eq!(err.kind(), DispatchErrorKind::Exhausted);
        assert_eq!(
            err.to_string(),
            "All providers failed after 6 attempts (last failure: backend_failure, Failed to send email via B: down)"
        );

        let err = DispatchError::Exhausted {
            email_id: "x".to_string(),
            attempts: 1,
            last_failure: FailureKind::RateLimited,
            last_error: None,
        };
        assert_eq!(
            err.to_string(),
            "All providers failed after 1 attempts (last failure: rate_limited)"
        );
    }
}
