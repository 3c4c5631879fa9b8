//! In-memory adapter for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use vellum_config::Provider;

use crate::adapter::ProviderAdapter;
use crate::catalog;
use crate::error::{LlmError, Result};
use crate::types::{GenerationOptions, GenerationResult, ResponsePayload};

/// A scripted adapter that never touches the network.
///
/// Replies with a fixed payload (or failure), and reports a fixed
/// validation outcome. Calls are counted so tests can assert on them.
#[derive(Debug)]
pub struct MockAdapter {
    provider: Provider,
    reply: Mutex<GenerationResult>,
    valid_key: AtomicBool,
    validation_delay: Mutex<Option<Duration>>,
    shutdown_error: Mutex<Option<LlmError>>,
    api_key: Mutex<Option<String>>,
    requests: Mutex<Vec<(String, String)>>,
    validations: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl MockAdapter {
    /// A healthy adapter that answers "OK".
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            reply: Mutex::new(GenerationResult::Success(ResponsePayload::Text(
                "OK".to_string(),
            ))),
            valid_key: AtomicBool::new(true),
            validation_delay: Mutex::new(None),
            shutdown_error: Mutex::new(None),
            api_key: Mutex::new(Some("mock-key".to_string())),
            requests: Mutex::new(Vec::new()),
            validations: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        }
    }

    /// An adapter whose every call fails with `error`.
    pub fn failing(provider: Provider, error: LlmError) -> Self {
        let adapter = Self::new(provider);
        adapter.set_reply(GenerationResult::Failure(error));
        adapter.set_valid(false);
        adapter
    }

    /// An adapter that answers with `text`.
    pub fn with_text(provider: Provider, text: impl Into<String>) -> Self {
        let adapter = Self::new(provider);
        adapter.set_reply(GenerationResult::Success(ResponsePayload::Text(text.into())));
        adapter
    }

    pub fn set_reply(&self, reply: GenerationResult) {
        *self.reply.lock() = reply;
    }

    pub fn set_valid(&self, valid: bool) {
        self.valid_key.store(valid, Ordering::SeqCst);
    }

    /// Make `validate_api_key` take at least `delay`.
    pub fn set_validation_delay(&self, delay: Duration) {
        *self.validation_delay.lock() = Some(delay);
    }

    /// Make `shutdown` fail with `error`.
    pub fn fail_shutdown(&self, error: LlmError) {
        *self.shutdown_error.lock() = Some(error);
    }

    /// `(prompt, model)` pairs received so far.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }

    pub fn validation_count(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn generate_response(
        &self,
        prompt: &str,
        model: &str,
        _options: GenerationOptions,
    ) -> GenerationResult {
        self.requests
            .lock()
            .push((prompt.to_string(), model.to_string()));
        self.reply.lock().clone()
    }

    async fn validate_api_key(&self) -> bool {
        self.validations.fetch_add(1, Ordering::SeqCst);
        let delay = *self.validation_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.is_ready() && self.valid_key.load(Ordering::SeqCst)
    }

    fn set_api_key(&self, key: Option<String>) {
        *self.api_key.lock() = key.filter(|k| !k.is_empty());
    }

    fn api_key(&self) -> Option<String> {
        self.api_key.lock().clone()
    }

    fn is_ready(&self) -> bool {
        !self.provider.requires_api_key() || self.api_key.lock().is_some()
    }

    fn api_model_name(&self, requested: &str) -> Result<String> {
        match catalog::find(self.provider, requested) {
            Some(model) => Ok(model.api_name.to_string()),
            None => catalog::default_model(self.provider)
                .map(|m| m.api_name.to_string())
                .ok_or_else(|| LlmError::UnknownModel {
                    provider: self.provider,
                    model: requested.to_string(),
                }),
        }
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        match self.shutdown_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
