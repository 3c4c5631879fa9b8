//! Config command - configuration management.

use anyhow::Result;
use clap::{Args, Subcommand};
use vellum_config::Provider;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show resolved AI settings and API key status per provider
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./vellum.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx).await,
        ConfigCommand::Which => cmd_which(ctx).await,
        ConfigCommand::Init { local } => cmd_init(local).await,
        ConfigCommand::Path => cmd_path().await,
    }
}

async fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let ai = &loaded.config.ai;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&redacted(&loaded.config))?);
        return Ok(());
    }

    println!("# Vellum Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    println!("Generation:");
    println!("  provider:    {}", ai.selected_provider());
    if let Some(model) = &ai.selected_model {
        println!("  model:       {}", model);
    }
    println!("  temperature: {}", ai.effective_temperature());
    println!("  max tokens:  {}", ai.effective_max_tokens());
    println!("  strict:      {}", ai.strict_models());
    println!();

    println!("Providers:");
    for provider in Provider::ALL {
        let marker = if provider == ai.selected_provider() {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<12} {:<28} timeout {}s",
            marker,
            provider.name(),
            key_status_for(ai, provider),
            ai.timeout_secs(provider)
        );
        if let Some(url) = ai.base_url(provider) {
            println!("    base url: {}", url);
        }
    }
    println!();

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config (keys redacted):\n");
        if let Ok(toml_str) = redacted(&loaded.config).to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

async fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'vellum config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

async fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        std::path::PathBuf::from("vellum.toml")
    } else {
        vellum_config::xdg_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let template = r#"# Vellum Configuration

[ai]
selected_provider = "openai"
# selected_model = "gpt-4o-mini"
# temperature = 0.7
# max_tokens = 1000
# request_timeout_secs = 120
# strict_models = false

# API keys are read from OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY,
# GROQ_API_KEY, MISTRAL_API_KEY, PERPLEXITY_API_KEY and OPENROUTER_API_KEY.
# [ai.providers.openai]
# base_url = "https://api.openai.com/v1"

# LM Studio or another local completion server
# [ai.local]
# model = "qwen2.5-7b-instruct"
# port = 1234
"#;

    std::fs::write(&path, template)?;
    println!("✓ Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  export OPENAI_API_KEY=...     # provide an API key");
    println!("  vellum config show            # verify configuration");
    println!("  vellum status                 # test provider connections");

    Ok(())
}

async fn cmd_path() -> Result<()> {
    if let Some(path) = vellum_config::xdg_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}

fn key_status_for(ai: &vellum_config::AiSettings, provider: Provider) -> String {
    if !provider.requires_api_key() {
        return if ai.local.is_configured() {
            "(local ✓)".to_string()
        } else {
            "(no model/port)".to_string()
        };
    }
    match ai.resolve_api_key(provider) {
        Some(secret) => format!("({} ✓)", secret.source),
        None => "(no key)".to_string(),
    }
}

/// Copy of the config with API keys masked.
fn redacted(config: &vellum_config::VellumConfig) -> vellum_config::VellumConfig {
    let mut config = config.clone();
    for settings in config.ai.providers.values_mut() {
        if settings.api_key.is_some() {
            settings.api_key = Some("********".to_string());
        }
    }
    config
}
