//! Mistral La Plateforme chat completions.

use serde_json::Value;
use vellum_config::Provider;

use super::openai::{ChatShape, chat_content, chat_request};
use crate::error::Result;
use crate::protocol::{ExtractedContent, PreparedRequest, RequestContext, WireProtocol};

/// Default Mistral API base URL.
pub const DEFAULT_MISTRAL_BASE: &str = "https://api.mistral.ai/v1";

/// Mistral chat mode. Same wire format as OpenAI, including JSON mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct MistralProtocol;

impl WireProtocol for MistralProtocol {
    fn provider(&self) -> Provider {
        Provider::Mistral
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Result<PreparedRequest> {
        let url = format!(
            "{}/chat/completions",
            ctx.base_url(Provider::Mistral, DEFAULT_MISTRAL_BASE)
        );
        chat_request(
            ctx,
            Provider::Mistral,
            url,
            ChatShape {
                system_prompt: None,
                json_mode: true,
            },
        )
    }

    fn extract_content(&self, body: Value) -> Result<ExtractedContent> {
        chat_content(Provider::Mistral, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationRequest;
    use vellum_config::AiSettings;

    #[test]
    fn test_mistral_endpoint() {
        let settings = AiSettings::default();
        let req = GenerationRequest {
            prompt: "hi".to_string(),
            model: "mistral-small-latest".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            raw_response: false,
        };
        let prepared = MistralProtocol
            .build_request(&RequestContext {
                request: &req,
                api_key: Some("key"),
                settings: &settings,
            })
            .unwrap();
        assert_eq!(prepared.url, "https://api.mistral.ai/v1/chat/completions");
        assert_eq!(prepared.body["response_format"]["type"], "json_object");
    }
}
