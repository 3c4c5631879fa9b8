//! Anthropic Messages API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vellum_config::Provider;

use crate::error::{LlmError, Result};
use crate::protocol::{
    ExtractedContent, PreparedRequest, RequestContext, UnknownModelPolicy, WireProtocol,
};

/// Default Anthropic API base URL.
pub const DEFAULT_ANTHROPIC_BASE: &str = "https://api.anthropic.com";

/// Value of the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: [UserMessage<'a>; 1],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages. The payload carries only the user message.
///
/// Unknown model names are rejected rather than substituted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicProtocol;

impl WireProtocol for AnthropicProtocol {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Result<PreparedRequest> {
        let api_key = ctx.require_api_key(Provider::Anthropic)?;
        let request = ctx.request;
        let url = format!(
            "{}/v1/messages",
            ctx.base_url(Provider::Anthropic, DEFAULT_ANTHROPIC_BASE)
        );

        let body = MessagesRequest {
            model: &request.model,
            messages: [UserMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        Ok(PreparedRequest::new(url, serde_json::to_value(&body)?)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION))
    }

    fn extract_content(&self, body: Value) -> Result<ExtractedContent> {
        let parsed: MessagesResponse = serde_json::from_value(body)
            .map_err(|e| LlmError::Format(format!("unexpected Anthropic response: {}", e)))?;

        parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .map(ExtractedContent::Text)
            .ok_or_else(|| {
                LlmError::Format("Anthropic response has no content[0].text".to_string())
            })
    }

    fn unknown_model_policy(&self) -> UnknownModelPolicy {
        UnknownModelPolicy::Reject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationRequest;
    use serde_json::json;
    use vellum_config::AiSettings;

    #[test]
    fn test_request_shape() {
        let settings = AiSettings::default();
        let req = GenerationRequest {
            prompt: "Tag this note".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            temperature: 0.2,
            max_tokens: 500,
            raw_response: false,
        };
        let prepared = AnthropicProtocol
            .build_request(&RequestContext {
                request: &req,
                api_key: Some("sk-ant"),
                settings: &settings,
            })
            .unwrap();

        assert_eq!(prepared.url, "https://api.anthropic.com/v1/messages");
        assert!(prepared.headers.contains(&("x-api-key", "sk-ant".to_string())));
        assert!(
            prepared
                .headers
                .contains(&("anthropic-version", "2023-06-01".to_string()))
        );
        assert_eq!(
            prepared.body["messages"],
            json!([{"role": "user", "content": "Tag this note"}])
        );
        assert!(prepared.body.get("system").is_none());
        assert_eq!(prepared.body["max_tokens"], 500);
    }

    #[test]
    fn test_extract_first_text_block() {
        let body = json!({
            "id": "msg_1",
            "content": [{"type": "text", "text": "{\"tags\":[]}"}],
            "stop_reason": "end_turn"
        });
        assert_eq!(
            AnthropicProtocol.extract_content(body).unwrap(),
            ExtractedContent::Text("{\"tags\":[]}".to_string())
        );
        assert!(AnthropicProtocol.extract_content(json!({"content": []})).is_err());
    }
}
