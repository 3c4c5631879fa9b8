//! Ask command - one-shot prompt through a provider adapter.

use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use vellum_config::{AiSettings, Provider, SettingsSource};
use vellum_llm::{GenerationOptions, ResponsePayload, catalog};

use super::{Context, parse_provider};

/// Arguments for the ask command.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The prompt to send
    pub prompt: String,

    /// Provider to use (defaults to the selected provider)
    #[arg(short, long, value_parser = parse_provider)]
    pub provider: Option<Provider>,

    /// Model API name (defaults to the configured or catalog default)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Return the text as-is instead of cleaning it into JSON
    #[arg(long)]
    pub raw: bool,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Response for JSON output.
#[derive(Debug, Serialize)]
struct AskOutput<'a> {
    provider: Provider,
    model: &'a str,
    response: &'a ResponsePayload,
}

/// Run the ask command.
pub async fn run(args: AskArgs, ctx: &Context) -> Result<()> {
    let session = ctx.start_session().await?;

    let adapter = match args.provider {
        Some(provider) => session
            .registry
            .get_adapter(provider)
            .with_context(|| format!("{} adapter is not registered", provider.display_name()))?,
        None => session.registry.get_current_adapter()?,
    };
    let provider = adapter.provider();

    let model = resolve_model(args.model, &session.settings.snapshot(), provider)
        .with_context(|| format!("no model available for {}", provider.display_name()))?;

    let cancel = CancellationToken::new();
    let mut options = GenerationOptions::default().with_cancellation(cancel.clone());
    options.raw_response = args.raw;
    if let Some(max_tokens) = args.max_tokens {
        options = options.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = args.temperature {
        options = options.with_temperature(temperature);
    }
    if let Some(secs) = args.timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    tracing::debug!(provider = %provider, model = %model, "Sending prompt");
    let result = adapter
        .generate_response(&args.prompt, &model, options)
        .await;
    ctrl_c.abort();
    session.close().await;

    let payload = result.into_result()?;

    if ctx.json_output {
        let output = AskOutput {
            provider,
            model: &model,
            response: &payload,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &payload {
        ResponsePayload::Text(text) => println!("{}", text),
        ResponsePayload::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
    }

    Ok(())
}

/// Explicit model, else the configured model when it belongs to `provider`,
/// else the provider's catalog default.
fn resolve_model(requested: Option<String>, settings: &AiSettings, provider: Provider) -> Option<String> {
    requested
        .or_else(|| {
            settings
                .selected_model
                .clone()
                .filter(|_| settings.selected_provider() == provider)
        })
        .or_else(|| catalog::default_model(provider).map(|m| m.api_name.to_string()))
}
