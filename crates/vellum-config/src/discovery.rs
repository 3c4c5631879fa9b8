//! Layered config files.
//!
//! The user file (`$VELLUM_CONFIG_DIR/config.toml`, else the platform config
//! dir) is read first and the project's `vellum.toml` is merged over it.
//! Missing layers are skipped; unreadable ones become warnings.

use std::path::{Path, PathBuf};

use crate::{ConfigError, Provider, Result, VellumConfig};

const CONFIG_DIR_ENV: &str = "VELLUM_CONFIG_DIR";
const APP_NAME: &str = "vellum";
const USER_CONFIG_FILE: &str = "config.toml";
const PROJECT_CONFIG_FILE: &str = "vellum.toml";

/// A layer that was looked for, and whether it contributed.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub loaded: bool,
}

/// Merged settings plus where they came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: VellumConfig,
    /// Every layer checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Load problems and plaintext-key notices, for the host to surface.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the layers that actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|s| s.loaded.then_some(s.path.as_path()))
            .collect()
    }
}

/// Discover and merge the user and project layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// [`load_config`] with the user config directory pinned to `config_dir`.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user_layer = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    let project_layer = project_dir
        .unwrap_or_else(|| Path::new("."))
        .join(PROJECT_CONFIG_FILE);

    let mut loaded = LoadedConfig {
        config: VellumConfig::new(),
        sources: Vec::new(),
        warnings: Vec::new(),
    };
    for path in user_layer.into_iter().chain(Some(project_layer)) {
        let contributed = path.is_file()
            && match load_config_file(&path) {
                Ok(layer) => {
                    loaded.config.merge(layer);
                    true
                }
                Err(e) => {
                    loaded
                        .warnings
                        .push(format!("Skipped {}: {}", path.display(), e));
                    false
                }
            };
        loaded.sources.push(ConfigSource {
            path,
            loaded: contributed,
        });
    }

    loaded.warnings.extend(plaintext_key_warnings(&loaded.config));
    Ok(loaded)
}

/// Parse a single config file.
pub fn load_config_file(path: &Path) -> Result<VellumConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    VellumConfig::from_toml(&text)
}

/// Write `config` as TOML, creating parent directories.
pub fn save_config(config: &VellumConfig, path: &Path) -> Result<()> {
    let write_err = |target: &Path, source| ConfigError::WriteFile {
        path: target.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }
    std::fs::write(path, config.to_toml()?).map_err(|e| write_err(path, e))
}

/// The user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// `$VELLUM_CONFIG_DIR` when set and non-empty, else `<platform config>/vellum`.
/// Logs live under this directory too.
pub fn xdg_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join(APP_NAME)),
    }
}

fn plaintext_key_warnings(config: &VellumConfig) -> impl Iterator<Item = String> + '_ {
    Provider::ALL.into_iter().filter_map(move |provider| {
        config.ai.provider(provider)?.api_key.as_ref()?;
        let hint = provider
            .env_var()
            .map(|var| format!(" Prefer {}.", var))
            .unwrap_or_default();
        Some(format!(
            "API key for {} is stored in plaintext ([ai.providers.{}]).{}",
            provider.display_name(),
            provider,
            hint
        ))
    })
}
