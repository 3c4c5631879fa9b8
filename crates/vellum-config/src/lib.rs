//! Configuration system for Vellum.
//!
//! Provides TOML-based configuration with:
//! - Provider selection and generation defaults (`[ai]`)
//! - Per-provider API key and endpoint overrides (`[ai.providers.<name>]`)
//! - Config file layering (XDG user config + project-local overrides)
//! - API key resolution (env var → config file)
//! - A subscribable [`SettingsStore`] the adapter registry listens to

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod store;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource, resolve_api_key};
pub use store::{SettingsSource, SettingsStore};
pub use types::*;
