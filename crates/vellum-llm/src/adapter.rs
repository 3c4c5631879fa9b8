//! The provider adapter contract and its shared HTTP implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use vellum_config::{AiSettings, Provider, SettingsSource, resolve_max_tokens, resolve_temperature};

use crate::catalog;
use crate::error::{LlmError, Result};
use crate::notify::{Notice, Notifier};
use crate::protocol::{ExtractedContent, RequestContext, UnknownModelPolicy, WireProtocol};
use crate::types::{GenerationOptions, GenerationRequest, GenerationResult, ResponsePayload};
use crate::validator::ResponseValidator;

/// Prompt used by connection tests when the caller does not supply one.
pub const CONNECTION_TEST_PROMPT: &str = "Return the word 'OK'.";

// ─────────────────────────────────────────────────────────────────────────────
// Adapter Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Uniform interface over every LLM provider.
///
/// Public methods never return raw transport errors: generation failures
/// become [`GenerationResult::Failure`] and boolean checks become `false`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Generate a completion for `prompt` using `model`.
    async fn generate_response(
        &self,
        prompt: &str,
        model: &str,
        options: GenerationOptions,
    ) -> GenerationResult;

    /// Send a raw-mode prompt and require the reply to contain "ok".
    async fn health_check(&self, prompt: Option<&str>, model: &str) -> Result<()> {
        let prompt = prompt.unwrap_or(CONNECTION_TEST_PROMPT);
        let payload = self
            .generate_response(prompt, model, GenerationOptions::raw())
            .await
            .into_result()?;
        let text = payload.to_text();
        if text.to_lowercase().contains("ok") {
            Ok(())
        } else {
            Err(LlmError::Format(format!(
                "unexpected connection test reply: {}",
                text.chars().take(80).collect::<String>()
            )))
        }
    }

    /// True when a raw-mode health check succeeds.
    async fn test_connection(&self, prompt: Option<&str>, model: &str) -> bool {
        self.health_check(prompt, model).await.is_ok()
    }

    /// Health-check the provider's first catalog model and notify the user of the outcome.
    async fn validate_api_key(&self) -> bool;

    /// Like [`validate_api_key`](Self::validate_api_key), but keeps the reason
    /// a validation failed.
    async fn check_api_key(&self) -> Result<()> {
        if self.validate_api_key().await {
            return Ok(());
        }
        let name = self.provider().display_name();
        if self.is_ready() {
            Err(LlmError::Config(format!("{} API key validation failed", name)))
        } else {
            Err(LlmError::Config(format!("{} is not configured", name)))
        }
    }

    /// Model API names from the static catalog, in preference order.
    fn available_models(&self) -> Vec<&'static str> {
        catalog::models(self.provider())
            .iter()
            .map(|m| m.api_name)
            .collect()
    }

    /// Replace the API key. Empty keys clear it.
    fn set_api_key(&self, key: Option<String>);

    /// Current API key.
    fn api_key(&self) -> Option<String>;

    /// True when the adapter can send requests.
    fn is_ready(&self) -> bool;

    /// Resolve a requested model name against the catalog.
    fn api_model_name(&self, requested: &str) -> Result<String>;

    /// Release resources and cancel in-flight requests.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Shared handle to a type-erased adapter.
pub type SharedAdapter = Arc<dyn ProviderAdapter>;

/// Collaborators every adapter receives.
#[derive(Clone)]
pub struct AdapterContext {
    pub settings: Arc<dyn SettingsSource>,
    pub notifier: Arc<dyn Notifier>,
}

impl AdapterContext {
    pub fn new(settings: Arc<dyn SettingsSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self { settings, notifier }
    }
}

impl std::fmt::Debug for AdapterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterContext").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// [`ProviderAdapter`] over HTTP, parameterized by a [`WireProtocol`].
pub struct HttpAdapter<P: WireProtocol> {
    protocol: P,
    client: Client,
    context: AdapterContext,
    api_key: RwLock<Option<String>>,
    shutdown: CancellationToken,
}

impl<P: WireProtocol> HttpAdapter<P> {
    /// Create an adapter with a fresh HTTP client.
    pub fn new(protocol: P, context: AdapterContext) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(protocol, context, client))
    }

    /// Create an adapter sharing an existing HTTP client.
    pub fn with_client(protocol: P, context: AdapterContext, client: Client) -> Self {
        Self {
            protocol,
            client,
            context,
            api_key: RwLock::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    fn resolve_model(&self, requested: &str, settings: &AiSettings) -> Result<String> {
        let provider = self.protocol.provider();
        if catalog::find(provider, requested).is_some() {
            return Ok(requested.to_string());
        }

        let policy = if settings.strict_models() {
            UnknownModelPolicy::Reject
        } else {
            self.protocol.unknown_model_policy()
        };
        let unknown = || LlmError::UnknownModel {
            provider,
            model: requested.to_string(),
        };

        match policy {
            UnknownModelPolicy::Reject => Err(unknown()),
            UnknownModelPolicy::Fallback => {
                let fallback = catalog::default_model(provider).ok_or_else(unknown)?;
                tracing::warn!(
                    provider = %provider,
                    requested = %requested,
                    fallback = %fallback.api_name,
                    "Unknown model, falling back to default"
                );
                Ok(fallback.api_name.to_string())
            }
        }
    }

    async fn try_generate(
        &self,
        prompt: &str,
        model: &str,
        options: &GenerationOptions,
    ) -> Result<ResponsePayload> {
        let provider = self.protocol.provider();
        if self.shutdown.is_cancelled() {
            return Err(LlmError::NotReady(format!(
                "{} adapter has been shut down",
                provider.display_name()
            )));
        }

        let settings = self.context.settings.snapshot();
        let api_key = self.api_key();
        self.protocol.readiness(api_key.as_deref(), &settings)?;

        let request = GenerationRequest {
            prompt: prompt.to_string(),
            model: self.resolve_model(model, &settings)?,
            temperature: resolve_temperature(options.temperature.or(settings.temperature)),
            max_tokens: resolve_max_tokens(options.max_tokens, settings.max_tokens),
            raw_response: options.raw_response,
        };
        let prepared = self.protocol.build_request(&RequestContext {
            request: &request,
            api_key: api_key.as_deref(),
            settings: &settings,
        })?;

        let timeout = options
            .timeout
            .unwrap_or_else(|| Duration::from_secs(settings.timeout_secs(provider)));

        tracing::debug!(
            provider = %provider,
            model = %request.model,
            max_tokens = request.max_tokens,
            raw = request.raw_response,
            "Sending generation request"
        );

        let mut builder = self
            .client
            .post(&prepared.url)
            .timeout(timeout)
            .json(&prepared.body);
        for (name, value) in &prepared.headers {
            builder = builder.header(*name, value);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let caller_cancel = options.cancellation.clone().unwrap_or_default();
        let (status, body) = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(LlmError::Cancelled),
            _ = caller_cancel.cancelled() => return Err(LlmError::Cancelled),
            result = exchange => result.map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(timeout)
                } else {
                    LlmError::from(e)
                }
            })?,
        };

        if !status.is_success() {
            let message = self.protocol.error_message(&body);
            tracing::warn!(
                provider = %provider,
                status = status.as_u16(),
                error = %message,
                "Provider returned error status"
            );
            return Err(LlmError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| LlmError::Format(format!("invalid response body: {}", e)))?;

        let payload = match (self.protocol.extract_content(json)?, request.raw_response) {
            (ExtractedContent::Text(text), true) => ResponsePayload::Text(text),
            (ExtractedContent::Text(text), false) => {
                ResponsePayload::Json(ResponseValidator::clean(&text)?)
            }
            (ExtractedContent::Json(value), true) => ResponsePayload::Text(value.to_string()),
            (ExtractedContent::Json(value), false) => ResponsePayload::Json(value),
        };
        Ok(payload)
    }
}

#[async_trait]
impl<P: WireProtocol> ProviderAdapter for HttpAdapter<P> {
    fn provider(&self) -> Provider {
        self.protocol.provider()
    }

    async fn generate_response(
        &self,
        prompt: &str,
        model: &str,
        options: GenerationOptions,
    ) -> GenerationResult {
        match self.try_generate(prompt, model, &options).await {
            Ok(payload) => GenerationResult::Success(payload),
            Err(err) => {
                let provider = self.protocol.provider();
                tracing::error!(provider = %provider, model = %model, error = %err, "Generation failed");
                self.context.notifier.notify(Notice::error(format!(
                    "{} request failed: {}",
                    provider.display_name(),
                    err
                )));
                GenerationResult::Failure(err)
            }
        }
    }

    async fn validate_api_key(&self) -> bool {
        self.check_api_key().await.is_ok()
    }

    async fn check_api_key(&self) -> Result<()> {
        let provider = self.protocol.provider();
        let name = provider.display_name();

        if !self.is_ready() {
            self.context
                .notifier
                .notify(Notice::error(format!("{} is not configured", name)));
            return Err(LlmError::Config(format!("{} is not configured", name)));
        }
        let model = catalog::default_model(provider).ok_or_else(|| {
            LlmError::Config(format!("{} has no catalog models", name))
        })?;

        let outcome = self.health_check(None, model.api_name).await;
        let notice = match &outcome {
            Ok(()) => Notice::success(format!("{} API key validated", name)),
            Err(_) => Notice::error(format!("{} API key validation failed", name)),
        };
        self.context.notifier.notify(notice);
        outcome
    }

    fn set_api_key(&self, key: Option<String>) {
        *self.api_key.write() = key.filter(|k| !k.is_empty());
    }

    fn api_key(&self) -> Option<String> {
        self.api_key.read().clone()
    }

    fn is_ready(&self) -> bool {
        let provider = self.protocol.provider();
        if catalog::models(provider).is_empty() {
            return false;
        }
        let settings = self.context.settings.snapshot();
        self.protocol
            .readiness(self.api_key.read().as_deref(), &settings)
            .is_ok()
    }

    fn api_model_name(&self, requested: &str) -> Result<String> {
        let settings = self.context.settings.snapshot();
        self.resolve_model(requested, &settings)
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();
        tracing::debug!(provider = %self.protocol.provider(), "Adapter shut down");
        Ok(())
    }
}

impl<P: WireProtocol> std::fmt::Debug for HttpAdapter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAdapter")
            .field("provider", &self.protocol.provider())
            .field("has_api_key", &self.api_key.read().is_some())
            .finish()
    }
}
