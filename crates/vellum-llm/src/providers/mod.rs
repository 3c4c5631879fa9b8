//! Per-provider wire protocols and adapter construction.

pub mod anthropic;
pub mod gemini;
pub mod local;
pub mod mistral;
pub mod openai;
pub mod openrouter;
pub mod perplexity;

use std::sync::Arc;

use vellum_config::Provider;

pub use anthropic::AnthropicProtocol;
pub use gemini::GeminiProtocol;
pub use local::LocalModelProtocol;
pub use mistral::MistralProtocol;
pub use openai::OpenAiCompatible;
pub use openrouter::OpenRouterProtocol;
pub use perplexity::PerplexityProtocol;

use crate::adapter::{AdapterContext, HttpAdapter, SharedAdapter};
use crate::error::Result;
use crate::registry::AdapterFactory;

/// Factory producing the HTTP adapter for every provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpAdapterFactory;

impl AdapterFactory for HttpAdapterFactory {
    fn create(&self, provider: Provider, context: &AdapterContext) -> Result<SharedAdapter> {
        create_adapter(provider, context)
    }
}

/// Build the HTTP adapter for `provider`.
pub fn create_adapter(provider: Provider, context: &AdapterContext) -> Result<SharedAdapter> {
    let context = context.clone();
    let adapter: SharedAdapter = match provider {
        Provider::OpenAi => Arc::new(HttpAdapter::new(OpenAiCompatible::openai(), context)?),
        Provider::Groq => Arc::new(HttpAdapter::new(OpenAiCompatible::groq(), context)?),
        Provider::Anthropic => Arc::new(HttpAdapter::new(AnthropicProtocol, context)?),
        Provider::Google => Arc::new(HttpAdapter::new(GeminiProtocol, context)?),
        Provider::Mistral => Arc::new(HttpAdapter::new(MistralProtocol, context)?),
        Provider::Perplexity => Arc::new(HttpAdapter::new(PerplexityProtocol, context)?),
        Provider::OpenRouter => Arc::new(HttpAdapter::new(OpenRouterProtocol, context)?),
        Provider::LocalModel => Arc::new(HttpAdapter::new(LocalModelProtocol, context)?),
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use vellum_config::SettingsStore;

    #[test]
    fn test_creates_every_provider() {
        let context = AdapterContext::new(
            Arc::new(SettingsStore::default()),
            Arc::new(RecordingNotifier::new()),
        );
        for provider in Provider::ALL {
            let adapter = create_adapter(provider, &context).unwrap();
            assert_eq!(adapter.provider(), provider);
            assert!(!adapter.available_models().is_empty());
        }
    }
}
