//! Google Gemini `generateContent`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vellum_config::Provider;

use crate::error::{LlmError, Result};
use crate::protocol::{ExtractedContent, PreparedRequest, RequestContext, WireProtocol};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1";

const TOP_K: u32 = 40;
const TOP_P: f64 = 0.95;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
    top_k: u32,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini. Authenticates with `x-goog-api-key`, or a Bearer token when
/// `[ai.gemini] legacy_bearer_auth = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiProtocol;

impl WireProtocol for GeminiProtocol {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Result<PreparedRequest> {
        let api_key = ctx.require_api_key(Provider::Google)?;
        let request = ctx.request;
        let url = format!(
            "{}/models/{}:generateContent",
            ctx.base_url(Provider::Google, DEFAULT_GEMINI_BASE),
            request.model
        );

        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                top_k: TOP_K,
                top_p: TOP_P,
            },
        };

        let prepared = PreparedRequest::new(url, serde_json::to_value(&body)?);
        if ctx.settings.gemini.legacy_bearer_auth.unwrap_or(false) {
            Ok(prepared.bearer(api_key))
        } else {
            Ok(prepared.header("x-goog-api-key", api_key))
        }
    }

    fn extract_content(&self, body: Value) -> Result<ExtractedContent> {
        let parsed: GenerateContentResponse = serde_json::from_value(body)
            .map_err(|e| LlmError::Format(format!("unexpected Gemini response: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(ExtractedContent::Text)
            .ok_or_else(|| {
                LlmError::Format(
                    "Gemini response has no candidates[0].content.parts[0].text".to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationRequest;
    use serde_json::json;
    use vellum_config::AiSettings;

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "Link these notes".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            raw_response: false,
        }
    }

    #[test]
    fn test_request_shape() {
        let settings = AiSettings::default();
        let req = request();
        let prepared = GeminiProtocol
            .build_request(&RequestContext {
                request: &req,
                api_key: Some("AIza"),
                settings: &settings,
            })
            .unwrap();

        assert_eq!(
            prepared.url,
            "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent"
        );
        assert!(prepared.headers.contains(&("x-goog-api-key", "AIza".to_string())));
        assert_eq!(
            prepared.body["contents"],
            json!([{"parts": [{"text": "Link these notes"}]}])
        );
        assert_eq!(prepared.body["generationConfig"]["maxOutputTokens"], 1000);
        assert_eq!(prepared.body["generationConfig"]["topK"], 40);
    }

    #[test]
    fn test_legacy_bearer_auth() {
        let mut settings = AiSettings::default();
        settings.gemini.legacy_bearer_auth = Some(true);
        let req = request();
        let prepared = GeminiProtocol
            .build_request(&RequestContext {
                request: &req,
                api_key: Some("AIza"),
                settings: &settings,
            })
            .unwrap();
        assert!(
            prepared
                .headers
                .contains(&("Authorization", "Bearer AIza".to_string()))
        );
        assert!(prepared.headers.iter().all(|(name, _)| *name != "x-goog-api-key"));
    }

    #[test]
    fn test_extract_content() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "OK"}], "role": "model"}}]
        });
        assert_eq!(
            GeminiProtocol.extract_content(body).unwrap(),
            ExtractedContent::Text("OK".to_string())
        );
        assert!(GeminiProtocol.extract_content(json!({"candidates": []})).is_err());
    }
}
