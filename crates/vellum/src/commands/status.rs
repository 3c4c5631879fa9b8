//! Status command - initializes the registry and reports provider health.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use vellum_config::Provider;

use super::Context;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Skip connection tests and only report registration
    #[arg(long)]
    pub no_test: bool,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let session = ctx.start_session().await?;

    if !args.no_test {
        for provider in Provider::ALL {
            if session.registry.get_adapter(provider).is_some() {
                session.registry.test_connection(provider).await;
            }
        }
    }

    let snapshot = session.store.current();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        session.close().await;
        return Ok(());
    }

    let green = Style::new().green();
    let red = Style::new().red();
    let yellow = Style::new().yellow();
    let dim = Style::new().dim();

    println!();
    println!("{}", style("Vellum Provider Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Registry:"), snapshot.lifecycle);
    println!(
        "  {} {}",
        dim.apply_to("Active:"),
        snapshot
            .current_provider
            .map(|p| p.display_name())
            .unwrap_or("none")
    );
    println!();

    for provider in Provider::ALL {
        let status = snapshot.statuses.get(&provider);
        let marker = if snapshot.current_provider == Some(provider) {
            "*"
        } else {
            " "
        };

        let state = match status {
            Some(s) if s.is_healthy() => green.apply_to("● connected").to_string(),
            Some(s) if s.is_initialized && args.no_test => {
                yellow.apply_to("○ registered").to_string()
            }
            Some(s) if s.is_initialized => red.apply_to("● unreachable").to_string(),
            _ => red.apply_to("✗ unavailable").to_string(),
        };

        println!("{} {:<14} {}", marker, provider.display_name(), state);

        if let Some(error) = status.and_then(|s| s.last_error.as_deref()) {
            println!("    {}", dim.apply_to(error));
        } else if ctx.verbose
            && let Some(at) = status.and_then(|s| s.last_connected_at)
        {
            println!(
                "    {}",
                dim.apply_to(format!("connected at {}", at.format("%Y-%m-%d %H:%M:%S UTC")))
            );
        }
    }
    println!();

    session.close().await;
    Ok(())
}
