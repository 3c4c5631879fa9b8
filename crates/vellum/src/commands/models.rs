//! Models command - lists the static model catalog.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;
use vellum_config::Provider;
use vellum_llm::{ModelDescriptor, catalog};

use super::{Context, parse_provider};

/// Arguments for the models command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Only list models for this provider
    #[arg(short, long, value_parser = parse_provider)]
    pub provider: Option<Provider>,
}

/// Catalog listing for JSON output.
#[derive(Debug, Serialize)]
struct ProviderModels {
    provider: Provider,
    display_name: &'static str,
    models: &'static [ModelDescriptor],
}

/// Run the models command.
pub async fn run(args: ModelsArgs, ctx: &Context) -> Result<()> {
    let providers: Vec<Provider> = match args.provider {
        Some(p) => vec![p],
        None => Provider::ALL.to_vec(),
    };

    if ctx.json_output {
        let output: Vec<ProviderModels> = providers
            .into_iter()
            .map(|provider| ProviderModels {
                provider,
                display_name: provider.display_name(),
                models: catalog::models(provider),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let cyan = Style::new().cyan();

    for provider in providers {
        println!();
        println!(
            "{} {}",
            style(provider.display_name()).bold(),
            dim.apply_to(format!("({})", provider.name()))
        );
        println!("{}", dim.apply_to("─".repeat(40)));

        for (i, model) in catalog::models(provider).iter().enumerate() {
            let marker = if i == 0 { "*" } else { " " };
            println!(
                "  {} {} {}",
                cyan.apply_to(marker),
                model.api_name,
                dim.apply_to(describe(model))
            );
        }
    }
    println!();
    println!("{}", dim.apply_to("* default model, used for connection tests"));

    Ok(())
}

/// Context window and pricing summary.
fn describe(model: &ModelDescriptor) -> String {
    let mut parts = Vec::new();
    if let Some(window) = model.context_window {
        parts.push(format!("{}k ctx", window / 1000));
    }
    if let (Some(input), Some(output)) = (model.input_cost_per_1m, model.output_cost_per_1m) {
        parts.push(format!("${:.2}/${:.2} per 1M", input, output));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("[{}]", parts.join(", "))
    }
}
