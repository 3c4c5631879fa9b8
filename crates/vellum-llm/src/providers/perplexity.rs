//! Perplexity chat completions.

use serde_json::Value;
use vellum_config::Provider;

use super::openai::{ChatShape, chat_content, chat_request};
use crate::error::Result;
use crate::protocol::{ExtractedContent, PreparedRequest, RequestContext, WireProtocol};

/// Default Perplexity API base URL.
pub const DEFAULT_PERPLEXITY_BASE: &str = "https://api.perplexity.ai";

const SYSTEM_PROMPT: &str = "Be precise and concise.";

/// Perplexity speaks the OpenAI chat format but rejects `response_format`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerplexityProtocol;

impl WireProtocol for PerplexityProtocol {
    fn provider(&self) -> Provider {
        Provider::Perplexity
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Result<PreparedRequest> {
        let url = format!(
            "{}/chat/completions",
            ctx.base_url(Provider::Perplexity, DEFAULT_PERPLEXITY_BASE)
        );
        chat_request(
            ctx,
            Provider::Perplexity,
            url,
            ChatShape {
                system_prompt: Some(SYSTEM_PROMPT),
                json_mode: false,
            },
        )
    }

    fn extract_content(&self, body: Value) -> Result<ExtractedContent> {
        chat_content(Provider::Perplexity, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationRequest;
    use vellum_config::AiSettings;

    #[test]
    fn test_never_sends_response_format() {
        let settings = AiSettings::default();
        let req = GenerationRequest {
            prompt: "What is Rust?".to_string(),
            model: "sonar".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            raw_response: false,
        };
        let prepared = PerplexityProtocol
            .build_request(&RequestContext {
                request: &req,
                api_key: Some("pplx"),
                settings: &settings,
            })
            .unwrap();

        assert_eq!(prepared.url, "https://api.perplexity.ai/chat/completions");
        assert!(prepared.body.get("response_format").is_none());
        assert_eq!(prepared.body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(prepared.body["messages"][1]["role"], "user");
    }
}
