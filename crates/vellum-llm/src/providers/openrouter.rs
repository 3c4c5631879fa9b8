//! OpenRouter chat completions.

use serde_json::Value;
use vellum_config::Provider;

use super::openai::{ChatShape, chat_content, chat_request};
use crate::error::Result;
use crate::protocol::{ExtractedContent, PreparedRequest, RequestContext, WireProtocol};

/// Default OpenRouter API base URL.
pub const DEFAULT_OPENROUTER_BASE: &str = "https://openrouter.ai/api/v1";

/// Default `HTTP-Referer` attribution.
pub const DEFAULT_REFERER: &str = "https://obsidian.md";

/// Default `X-Title` attribution.
pub const DEFAULT_TITLE: &str = "Vellum";

/// OpenRouter: OpenAI chat format plus app attribution headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRouterProtocol;

impl WireProtocol for OpenRouterProtocol {
    fn provider(&self) -> Provider {
        Provider::OpenRouter
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Result<PreparedRequest> {
        let url = format!(
            "{}/chat/completions",
            ctx.base_url(Provider::OpenRouter, DEFAULT_OPENROUTER_BASE)
        );
        let attribution = &ctx.settings.openrouter;
        let referer = attribution.referer.as_deref().unwrap_or(DEFAULT_REFERER);
        let title = attribution.title.as_deref().unwrap_or(DEFAULT_TITLE);

        Ok(chat_request(
            ctx,
            Provider::OpenRouter,
            url,
            ChatShape {
                system_prompt: None,
                json_mode: true,
            },
        )?
        .header("HTTP-Referer", referer)
        .header("X-Title", title))
    }

    fn extract_content(&self, body: Value) -> Result<ExtractedContent> {
        chat_content(Provider::OpenRouter, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationRequest;
    use vellum_config::AiSettings;

    fn prepare(settings: &AiSettings) -> PreparedRequest {
        let req = GenerationRequest {
            prompt: "hi".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            raw_response: true,
        };
        OpenRouterProtocol
            .build_request(&RequestContext {
                request: &req,
                api_key: Some("or-key"),
                settings,
            })
            .unwrap()
    }

    #[test]
    fn test_default_attribution_headers() {
        let prepared = prepare(&AiSettings::default());
        assert_eq!(prepared.url, "https://openrouter.ai/api/v1/chat/completions");
        assert!(
            prepared
                .headers
                .contains(&("HTTP-Referer", DEFAULT_REFERER.to_string()))
        );
        assert!(
            prepared
                .headers
                .contains(&("X-Title", DEFAULT_TITLE.to_string()))
        );
    }

    #[test]
    fn test_configured_attribution_headers() {
        let mut settings = AiSettings::default();
        settings.openrouter.referer = Some("https://example.org".to_string());
        settings.openrouter.title = Some("My Vault".to_string());
        let prepared = prepare(&settings);
        assert!(
            prepared
                .headers
                .contains(&("X-Title", "My Vault".to_string()))
        );
        assert!(
            prepared
                .headers
                .contains(&("HTTP-Referer", "https://example.org".to_string()))
        );
    }
}
