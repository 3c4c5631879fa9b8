//! Vellum - LLM provider adapters for note-taking workflows
//!
//! Main entry point for the Vellum CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ask, config, models, status, switch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Vellum - LLM provider adapters for note-taking workflows
#[derive(Parser)]
#[command(name = "vellum")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding the project config (vellum.toml)
    #[arg(long, global = true, env = "VELLUM_PROJECT_DIR")]
    pub project_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the model catalog
    Models(models::ModelsArgs),

    /// Connection-test every provider and show health
    Status(status::StatusArgs),

    /// Send a one-shot prompt to a provider
    Ask(ask::AskArgs),

    /// Switch the active provider after validating it
    Switch(switch::SwitchArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "vellum=debug,vellum_llm=debug,vellum_config=debug,info"
    } else {
        "vellum=info,vellum_llm=info,vellum_config=info,warn"
    };

    let log_dir = vellum_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "vellum.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "vellum=trace,vellum_llm=trace,vellum_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        project_dir: cli.project_dir,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Models(args) => models::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Ask(args) => ask::run(args, &ctx).await,
        Commands::Switch(args) => switch::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
