//! Error types for the LLM crate.

use std::time::Duration;

use thiserror::Error;
use vellum_config::Provider;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for adapter and registry operations.
///
/// Every variant carries owned strings so errors can be cloned into
/// [`GenerationResult::Failure`](crate::GenerationResult) and health records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    /// Missing API key, missing model selection, unusable settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the provider.
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Response body did not match the provider schema, or JSON cleaning failed.
    #[error("Format error: {0}")]
    Format(String),

    /// Registry or adapter used before initialization or during teardown.
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Requested model is not in the provider catalog.
    #[error("Unknown model '{model}' for {provider}")]
    UnknownModel { provider: Provider, model: String },

    /// The request exceeded its deadline.
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The request was cancelled by the caller or by adapter shutdown.
    #[error("Request cancelled")]
    Cancelled,

    /// No adapter is registered for the provider.
    #[error("No adapter registered for {0}")]
    AdapterNotFound(Provider),

    /// Another provider switch is still running.
    #[error("A provider switch is already in progress")]
    SwitchInProgress,

    /// The switch protocol rejected the target provider.
    #[error("Switch to {target} failed: {reason}")]
    SwitchFailed { target: Provider, reason: String },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LlmError {
    /// Returns true if a caller-side retry could reasonably succeed.
    ///
    /// This layer never retries by itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }

    /// HTTP status code, if this is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            LlmError::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            LlmError::Format(err.to_string())
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Format(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(LlmError::Network("reset".to_string()).is_retryable());
        assert!(LlmError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(
            LlmError::HttpStatus {
                status: 429,
                message: "slow down".to_string()
            }
            .is_retryable()
        );
        assert!(
            LlmError::HttpStatus {
                status: 503,
                message: "overloaded".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::HttpStatus {
                status: 401,
                message: "bad key".to_string()
            }
            .is_retryable()
        );
        assert!(!LlmError::Config("no key".to_string()).is_retryable());
        assert!(!LlmError::Format("bad json".to_string()).is_retryable());
    }

    #[test]
    fn test_status_error_message_contains_code() {
        let err = LlmError::HttpStatus {
            status: 404,
            message: "model not found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: model not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_timeout_display() {
        let err = LlmError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Request timed out after 30s");
    }

    #[test]
    fn test_from_serde_error_is_format() {
        let err: LlmError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, LlmError::Format(_)));
    }
}
