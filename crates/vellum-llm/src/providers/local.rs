//! Local LM Studio server.

use serde::Serialize;
use serde_json::Value;
use vellum_config::{AiSettings, Provider};

use crate::error::{LlmError, Result};
use crate::protocol::{ExtractedContent, PreparedRequest, RequestContext, WireProtocol};

#[derive(Debug, Serialize)]
struct CompleteRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// LM Studio's completion endpoint on `localhost:<port>`.
///
/// No API key and no JSON mode: the whole response body is the result.
/// The model configured in `[ai.local]` is sent regardless of the
/// requested catalog name.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalModelProtocol;

impl WireProtocol for LocalModelProtocol {
    fn provider(&self) -> Provider {
        Provider::LocalModel
    }

    fn build_request(&self, ctx: &RequestContext<'_>) -> Result<PreparedRequest> {
        let local = &ctx.settings.local;
        let port = local
            .port
            .ok_or_else(|| LlmError::Config("Local model port is not set".to_string()))?;
        let model = local
            .model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(ctx.request.model.as_str());

        let default_base = format!("http://localhost:{}", port);
        let url = format!(
            "{}/api/v1/complete",
            ctx.base_url(Provider::LocalModel, &default_base)
        );

        let body = CompleteRequest {
            model,
            prompt: &ctx.request.prompt,
        };
        Ok(PreparedRequest::new(url, serde_json::to_value(&body)?))
    }

    fn extract_content(&self, body: Value) -> Result<ExtractedContent> {
        Ok(ExtractedContent::Json(body))
    }

    fn readiness(&self, _api_key: Option<&str>, settings: &AiSettings) -> Result<()> {
        if settings.local.is_configured() {
            Ok(())
        } else {
            Err(LlmError::Config(
                "Local model and port must both be configured in [ai.local]".to_string(),
            ))
        }
    }
}
