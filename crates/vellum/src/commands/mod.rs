//! CLI command handlers.

pub mod ask;
pub mod config;
pub mod models;
pub mod status;
pub mod switch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use vellum_config::{LoadedConfig, Provider, SettingsStore};
use vellum_llm::{AdapterContext, AdapterRegistry, ProviderStore, TracingNotifier};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory searched for a project-local `vellum.toml`.
    pub project_dir: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Discover and merge config layers, logging any load warnings.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let loaded = vellum_config::load_config(self.project_dir.as_deref())?;
        for warning in &loaded.warnings {
            tracing::warn!("{}", warning);
        }
        Ok(loaded)
    }

    /// Load config and bring up an initialized adapter registry.
    pub async fn start_session(&self) -> Result<Session> {
        let loaded = self.load_config()?;
        let settings = Arc::new(SettingsStore::from_config(loaded.config.clone()));
        let store = Arc::new(ProviderStore::new());
        let context = AdapterContext::new(settings.clone(), Arc::new(TracingNotifier));
        let registry = AdapterRegistry::new(context, store.clone());

        registry.initialize().await?;

        Ok(Session {
            loaded,
            settings,
            store,
            registry,
        })
    }
}

/// A running registry plus the config it was built from.
pub struct Session {
    pub loaded: LoadedConfig,
    pub settings: Arc<SettingsStore>,
    pub store: Arc<ProviderStore>,
    pub registry: Arc<AdapterRegistry>,
}

impl Session {
    /// Tear down the registry.
    pub async fn close(self) {
        self.registry.destroy().await;
    }
}

/// Clap value parser for provider names and aliases.
pub fn parse_provider(name: &str) -> std::result::Result<Provider, String> {
    Provider::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = Provider::ALL.iter().map(|p| p.name()).collect();
        format!("unknown provider '{}' (expected one of: {})", name, known.join(", "))
    })
}
