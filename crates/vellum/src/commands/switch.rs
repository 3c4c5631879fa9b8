//! Switch command - validated provider switch, persisted to the user config.

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, style};
use serde::Serialize;
use vellum_config::{Provider, VellumConfig};

use super::{Context, parse_provider};

/// Arguments for the switch command.
#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// Provider to switch to
    #[arg(value_parser = parse_provider)]
    pub provider: Provider,

    /// Switch for this run only; do not write the config file
    #[arg(long)]
    pub no_save: bool,
}

/// Switch outcome for JSON output.
#[derive(Debug, Serialize)]
struct SwitchOutput {
    previous: Option<Provider>,
    current: Option<Provider>,
    switched: bool,
    error: Option<String>,
    saved_to: Option<String>,
}

/// Run the switch command.
pub async fn run(args: SwitchArgs, ctx: &Context) -> Result<()> {
    let session = ctx.start_session().await?;
    let previous = session.registry.current_provider();

    let outcome = session.registry.switch_provider(args.provider).await;
    let current = session.registry.current_provider();
    session.close().await;

    let saved_to = match (&outcome, args.no_save) {
        (Ok(()), false) => Some(persist_selection(args.provider)?),
        _ => None,
    };

    if ctx.json_output {
        let output = SwitchOutput {
            previous,
            current,
            switched: outcome.is_ok(),
            error: outcome.as_ref().err().map(|e| e.to_string()),
            saved_to: saved_to.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return outcome.map_err(Into::into);
    }

    let green = Style::new().green();
    let dim = Style::new().dim();

    outcome?;

    println!(
        "{} Active provider: {}",
        green.apply_to("✓"),
        style(args.provider.display_name()).bold()
    );
    if let Some(path) = saved_to {
        println!("  {} {}", dim.apply_to("Saved to:"), path);
    }

    Ok(())
}

/// Write the selection into the user config file, leaving project layers alone.
fn persist_selection(provider: Provider) -> Result<String> {
    let path = vellum_config::xdg_config_path().context("could not determine config directory")?;

    let mut config = if path.exists() {
        vellum_config::load_config_file(&path)?
    } else {
        VellumConfig::new()
    };
    config.ai.selected_provider = Some(provider);
    vellum_config::save_config(&config, &path)?;

    tracing::info!(provider = %provider, path = %path.display(), "Saved provider selection");
    Ok(path.display().to_string())
}
