//! OpenAI chat completions, and the shared chat format used by every
//! OpenAI-compatible provider (Groq, Mistral, OpenRouter, Perplexity).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vellum_config::Provider;

use crate::error::{LlmError, Result};
use crate::protocol::{ExtractedContent, PreparedRequest, RequestContext, WireProtocol};

/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Default Groq API base URL.
pub const DEFAULT_GROQ_BASE: &str = "https://api.groq.com/openai/v1";

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

// JSON mode requires the word "JSON" to appear in the messages.
const SYSTEM_PROMPT_JSON: &str = "You are a helpful assistant that responds in JSON.";

// ─────────────────────────────────────────────────────────────────────────────
// Chat Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// How a provider's chat endpoint is called.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChatShape {
    /// System prompt; `None` picks the JSON-aware default.
    pub system_prompt: Option<&'static str>,
    /// Whether `response_format: json_object` is supported.
    pub json_mode: bool,
}

/// Build `POST {url}` with the OpenAI chat body and a Bearer token.
pub(crate) fn chat_request(
    ctx: &RequestContext<'_>,
    provider: Provider,
    url: String,
    shape: ChatShape,
) -> Result<PreparedRequest> {
    let api_key = ctx.require_api_key(provider)?;
    let request = ctx.request;
    let json_mode = shape.json_mode && !request.raw_response;

    let system = shape.system_prompt.unwrap_or(if json_mode {
        SYSTEM_PROMPT_JSON
    } else {
        SYSTEM_PROMPT
    });

    let body = ChatRequest {
        model: &request.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: &request.prompt,
            },
        ],
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        response_format: json_mode.then_some(ResponseFormat {
            format_type: "json_object",
        }),
    };

    Ok(PreparedRequest::new(url, serde_json::to_value(&body)?).bearer(api_key))
}

/// Read `choices[0].message.content`.
pub(crate) fn chat_content(provider: Provider, body: Value) -> Result<ExtractedContent> {
    let parsed: ChatResponse = serde_json::from_value(body).map_err(|e| {
        LlmError::Format(format!("unexpected {} response: {}", provider.display_name(), e))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(ExtractedContent::Text)
        .ok_or_else(|| {
            LlmError::Format(format!(
                "{} response has no choices[0].message.content",
                provider.display_name()
            ))
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Plain OpenAI-compatible chat completions (OpenAI, Groq).
#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    provider: Provider,
    default_base: &'static str,
}

impl OpenAiCompatible {
    pub fn openai() -> Self {
        Self {
            provider: Provider::OpenAi,
            default_base: DEFAULT_OPENAI_BASE,
        }
    }

    pub fn groq() -> Self {
        Self {
            provider: Provider::Groq,
            default_base: DEFAULT_GROQ_BASE,
        }
    }
}

impl WireProtocol for OpenAiCompatible {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Result<PreparedRequest> {
        let url = format!(
            "{}/chat/completions",
            ctx.base_url(self.provider, self.default_base)
        );
        chat_request(
            ctx,
            self.provider,
            url,
            ChatShape {
                system_prompt: None,
                json_mode: true,
            },
        )
    }

    fn extract_content(&self, body: Value) -> Result<ExtractedContent> {
        chat_content(self.provider, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationRequest;
    use serde_json::json;
    use vellum_config::AiSettings;

    fn request(raw: bool) -> GenerationRequest {
        GenerationRequest {
            prompt: "Summarize".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 256,
            raw_response: raw,
        }
    }

    #[test]
    fn test_openai_request_shape() {
        let settings = AiSettings::default();
        let req = request(false);
        let prepared = OpenAiCompatible::openai()
            .build_request(&RequestContext {
                request: &req,
                api_key: Some("sk-test"),
                settings: &settings,
            })
            .unwrap();

        assert_eq!(prepared.url, "https://api.openai.com/v1/chat/completions");
        assert!(
            prepared
                .headers
                .contains(&("Authorization", "Bearer sk-test".to_string()))
        );
        assert_eq!(prepared.body["model"], "gpt-4o-mini");
        assert_eq!(prepared.body["max_tokens"], 256);
        assert_eq!(prepared.body["messages"][0]["role"], "system");
        assert_eq!(prepared.body["messages"][1]["content"], "Summarize");
        assert_eq!(prepared.body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_raw_request_omits_response_format() {
        let settings = AiSettings::default();
        let req = request(true);
        let prepared = OpenAiCompatible::groq()
            .build_request(&RequestContext {
                request: &req,
                api_key: Some("gsk"),
                settings: &settings,
            })
            .unwrap();

        assert_eq!(prepared.url, "https://api.groq.com/openai/v1/chat/completions");
        assert!(prepared.body.get("response_format").is_none());
        assert_eq!(prepared.body["messages"][0]["content"], SYSTEM_PROMPT);
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let settings = AiSettings::default();
        let req = request(true);
        let err = OpenAiCompatible::openai()
            .build_request(&RequestContext {
                request: &req,
                api_key: None,
                settings: &settings,
            })
            .unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[test]
    fn test_extract_content() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        assert_eq!(
            OpenAiCompatible::openai().extract_content(body).unwrap(),
            ExtractedContent::Text("hi".to_string())
        );

        let empty = json!({"choices": []});
        assert!(matches!(
            OpenAiCompatible::openai().extract_content(empty),
            Err(LlmError::Format(_))
        ));
    }
}
