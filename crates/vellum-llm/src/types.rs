//! Provider-agnostic request, result, and health types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{LlmError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Generation Options
// ─────────────────────────────────────────────────────────────────────────────

/// Per-call options for [`ProviderAdapter::generate_response`](crate::ProviderAdapter).
///
/// Unset fields fall back to configuration.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// Temperature override; still subject to the `[0, 1]` rule.
    pub temperature: Option<f64>,
    /// Max tokens override; wins over configuration when positive.
    pub max_tokens: Option<u32>,
    /// Return the completion text as-is, skipping JSON cleaning.
    pub raw_response: bool,
    /// Deadline override for this call.
    pub timeout: Option<Duration>,
    /// Caller-side cancellation.
    pub cancellation: Option<CancellationToken>,
}

impl GenerationOptions {
    /// Options for a raw (unvalidated) text response.
    pub fn raw() -> Self {
        Self {
            raw_response: true,
            ..Self::default()
        }
    }

    /// Set a max tokens override.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set a temperature override.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set a timeout override.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generation Request
// ─────────────────────────────────────────────────────────────────────────────

/// A fully resolved request handed to a wire protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// User prompt.
    pub prompt: String,
    /// Provider-side model identifier.
    pub model: String,
    /// Effective temperature in `[0, 1]`.
    pub temperature: f64,
    /// Effective max tokens, always positive.
    pub max_tokens: u32,
    /// Skip JSON mode and cleaning.
    pub raw_response: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Generation Result
// ─────────────────────────────────────────────────────────────────────────────

/// Successful generation payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    /// Parsed JSON (default mode).
    Json(serde_json::Value),
    /// Plain text (raw mode).
    Text(String),
}

impl ResponsePayload {
    /// Borrow the text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponsePayload::Text(text) => Some(text),
            ResponsePayload::Json(_) => None,
        }
    }

    /// Borrow the JSON payload.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponsePayload::Json(value) => Some(value),
            ResponsePayload::Text(_) => None,
        }
    }

    /// Render the payload as text, serializing JSON.
    pub fn to_text(&self) -> String {
        match self {
            ResponsePayload::Text(text) => text.clone(),
            ResponsePayload::Json(value) => value.to_string(),
        }
    }
}

/// Outcome of a generation call. Adapter failures never escape as panics or
/// `Err`; they collapse into [`GenerationResult::Failure`].
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    /// The provider answered and the answer was usable.
    Success(ResponsePayload),
    /// Anything went wrong.
    Failure(LlmError),
}

impl GenerationResult {
    /// Returns true for [`GenerationResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    /// The payload, if successful.
    pub fn payload(&self) -> Option<&ResponsePayload> {
        match self {
            GenerationResult::Success(payload) => Some(payload),
            GenerationResult::Failure(_) => None,
        }
    }

    /// The user-facing error message, if failed.
    pub fn error_message(&self) -> Option<String> {
        match self {
            GenerationResult::Success(_) => None,
            GenerationResult::Failure(err) => Some(err.to_string()),
        }
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<ResponsePayload> {
        match self {
            GenerationResult::Success(payload) => Ok(payload),
            GenerationResult::Failure(err) => Err(err),
        }
    }
}

impl From<Result<ResponsePayload>> for GenerationResult {
    fn from(result: Result<ResponsePayload>) -> Self {
        match result {
            Ok(payload) => GenerationResult::Success(payload),
            Err(err) => GenerationResult::Failure(err),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Health Status
// ─────────────────────────────────────────────────────────────────────────────

/// Per-provider health record, owned and mutated by the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdapterHealthStatus {
    /// The adapter was constructed and registered.
    pub is_initialized: bool,
    /// The last validation or connection test succeeded.
    pub is_connected: bool,
    /// When the last successful connection happened.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// When the API key was last validated, regardless of outcome.
    pub last_validated_at: Option<DateTime<Utc>>,
    /// Most recent error, cleared on success.
    pub last_error: Option<String>,
}

impl AdapterHealthStatus {
    /// Status for a freshly registered adapter.
    pub fn initialized() -> Self {
        Self {
            is_initialized: true,
            ..Self::default()
        }
    }

    /// Status for an adapter that failed to construct.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            last_error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Initialized and connected.
    pub fn is_healthy(&self) -> bool {
        self.is_initialized && self.is_connected
    }
}
