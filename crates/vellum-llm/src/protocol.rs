//! Wire protocol strategy.
//!
//! A [`WireProtocol`] knows only how to turn a resolved
//! [`GenerationRequest`] into a provider HTTP call and how to pull the
//! completion out of the response body. Everything else (readiness, model
//! resolution, timeouts, error reporting, JSON cleaning) is shared in
//! [`HttpAdapter`](crate::HttpAdapter).

use serde_json::Value;
use vellum_config::{AiSettings, Provider};

use crate::error::{LlmError, Result};
use crate::types::GenerationRequest;

/// What to do when a requested model is not in the provider catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownModelPolicy {
    /// Log a warning and use the provider's first catalog model.
    Fallback,
    /// Fail with [`LlmError::UnknownModel`].
    Reject,
}

/// Inputs available while building a request.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub request: &'a GenerationRequest,
    pub api_key: Option<&'a str>,
    pub settings: &'a AiSettings,
}

impl RequestContext<'_> {
    /// The API key, or a configuration error naming the provider.
    pub fn require_api_key(&self, provider: Provider) -> Result<&str> {
        self.api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| missing_key_error(provider))
    }

    /// Configured base URL for `provider`, or `default`, without a trailing slash.
    pub fn base_url<'b>(&'b self, provider: Provider, default: &'b str) -> &'b str {
        self.settings
            .base_url(provider)
            .unwrap_or(default)
            .trim_end_matches('/')
    }
}

/// A provider HTTP call ready to send. Always a POST with a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl PreparedRequest {
    pub fn new(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }
}

/// Completion content pulled from a provider response.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedContent {
    /// Completion text, still subject to JSON cleaning.
    Text(String),
    /// A structured body used as-is.
    Json(Value),
}

/// Provider-specific request/response translation.
pub trait WireProtocol: Send + Sync + 'static {
    /// Provider this protocol speaks for.
    fn provider(&self) -> Provider;

    /// Build the HTTP call for a resolved request.
    fn build_request(&self, ctx: &RequestContext<'_>) -> Result<PreparedRequest>;

    /// Pull the completion out of a 2xx response body.
    fn extract_content(&self, body: Value) -> Result<ExtractedContent>;

    /// How unknown model names are handled.
    fn unknown_model_policy(&self) -> UnknownModelPolicy {
        UnknownModelPolicy::Fallback
    }

    /// `Ok` when the adapter has everything it needs to send a request.
    fn readiness(&self, api_key: Option<&str>, _settings: &AiSettings) -> Result<()> {
        match api_key {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err(missing_key_error(self.provider())),
        }
    }

    /// Human-readable message from an error response body.
    fn error_message(&self, body: &str) -> String {
        default_error_message(body)
    }
}

fn missing_key_error(provider: Provider) -> LlmError {
    match provider.env_var() {
        Some(var) => LlmError::Config(format!(
            "{} API key is not set (set {} or [ai.providers.{}].api_key)",
            provider.display_name(),
            var,
            provider.name()
        )),
        None => LlmError::Config(format!("{} API key is not set", provider.display_name())),
    }
}

const MAX_ERROR_BODY_CHARS: usize = 300;

/// Extract a message from the common error body shapes:
/// `{"error": {"message": ..}}`, `{"error": ".."}`, `{"message": ..}` and
/// `{"detail": ..}`. Falls back to the (truncated) raw body.
pub fn default_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let candidates = [
            value.pointer("/error/message"),
            value.get("error"),
            value.get("message"),
            value.get("detail"),
        ];
        for candidate in candidates.into_iter().flatten() {
            if let Some(message) = candidate.as_str().filter(|s| !s.is_empty()) {
                return message.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", truncated)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            default_error_message(r#"{"error":{"message":"Invalid API key","type":"auth"}}"#),
            "Invalid API key"
        );
        assert_eq!(default_error_message(r#"{"error":"rate limited"}"#), "rate limited");
        assert_eq!(
            default_error_message(r#"{"object":"error","message":"Unauthorized"}"#),
            "Unauthorized"
        );
        assert_eq!(default_error_message(r#"{"detail":"Not found"}"#), "Not found");
        assert_eq!(default_error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(default_error_message("  "), "empty response body");
    }

    #[test]
    fn test_error_message_truncates_long_bodies() {
        let body = "x".repeat(1000);
        let message = default_error_message(&body);
        assert!(message.ends_with("..."));
        assert_eq!(message.len(), MAX_ERROR_BODY_CHARS + 3);
    }

    #[test]
    fn test_base_url_override_strips_trailing_slash() {
        let mut settings = AiSettings::default();
        settings.provider_mut(Provider::OpenAi).base_url = Some("http://proxy:8080/v1/".to_string());
        let request = GenerationRequest {
            prompt: "hi".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_tokens: 10,
            raw_response: true,
        };
        let ctx = RequestContext {
            request: &request,
            api_key: Some("sk"),
            settings: &settings,
        };
        assert_eq!(
            ctx.base_url(Provider::OpenAi, "https://api.openai.com/v1"),
            "http://proxy:8080/v1"
        );
        assert_eq!(
            ctx.base_url(Provider::Groq, "https://api.groq.com/openai/v1"),
            "https://api.groq.com/openai/v1"
        );
    }

    #[test]
    fn test_require_api_key() {
        let settings = AiSettings::default();
        let request = GenerationRequest {
            prompt: "hi".to_string(),
            model: "m".to_string(),
            temperature: 0.7,
            max_tokens: 10,
            raw_response: false,
        };
        let ctx = RequestContext {
            request: &request,
            api_key: Some(""),
            settings: &settings,
        };
        let err = ctx.require_api_key(Provider::Mistral).unwrap_err();
        assert!(err.to_string().contains("MISTRAL_API_KEY"));
    }
}
