//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [ai]                          # provider selection and generation defaults
//! [ai.providers.openai]         # per-provider key / endpoint overrides
//! [ai.local]                    # LM Studio model + port
//! [ai.openrouter]               # attribution headers
//! [ai.gemini]                   # auth mode
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::secrets::{self, ResolvedSecret};

/// Temperature used when the configured value is missing or outside `[0, 1]`.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Max tokens used when the configured value is missing or not positive.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Default request timeout for hosted providers.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default request timeout for the local model server (local inference is slow).
pub const DEFAULT_LOCAL_TIMEOUT_SECS: u64 = 600;

// ─────────────────────────────────────────────────────────────────────────────
// Provider Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI chat completions.
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// Google Gemini.
    Google,
    /// Groq cloud inference (OpenAI-compatible).
    Groq,
    /// Mistral La Plateforme.
    Mistral,
    /// Perplexity.
    Perplexity,
    /// OpenRouter (OpenAI-compatible aggregator).
    OpenRouter,
    /// Local LM Studio server.
    #[serde(rename = "local")]
    LocalModel,
}

impl Provider {
    /// Every provider, in registration order.
    pub const ALL: [Provider; 8] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Google,
        Provider::Groq,
        Provider::Mistral,
        Provider::Perplexity,
        Provider::OpenRouter,
        Provider::LocalModel,
    ];

    /// Stable lowercase identifier used in config files and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Groq => "groq",
            Provider::Mistral => "mistral",
            Provider::Perplexity => "perplexity",
            Provider::OpenRouter => "openrouter",
            Provider::LocalModel => "local",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Google => "Google Gemini",
            Provider::Groq => "Groq",
            Provider::Mistral => "Mistral",
            Provider::Perplexity => "Perplexity",
            Provider::OpenRouter => "OpenRouter",
            Provider::LocalModel => "Local Model",
        }
    }

    /// Parse a provider from a name or common alias.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Some(Provider::OpenAi),
            "anthropic" | "claude" => Some(Provider::Anthropic),
            "google" | "gemini" => Some(Provider::Google),
            "groq" => Some(Provider::Groq),
            "mistral" => Some(Provider::Mistral),
            "perplexity" | "pplx" => Some(Provider::Perplexity),
            "openrouter" => Some(Provider::OpenRouter),
            "local" | "localmodel" | "lmstudio" | "lm-studio" => Some(Provider::LocalModel),
            _ => None,
        }
    }

    /// Whether requests to this provider need an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::LocalModel)
    }

    /// Environment variable consulted for this provider's API key.
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Google => Some("GEMINI_API_KEY"),
            Provider::Groq => Some("GROQ_API_KEY"),
            Provider::Mistral => Some("MISTRAL_API_KEY"),
            Provider::Perplexity => Some("PERPLEXITY_API_KEY"),
            Provider::OpenRouter => Some("OPENROUTER_API_KEY"),
            Provider::LocalModel => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Provider {
    type Err = crate::ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Provider::from_name(s).ok_or_else(|| crate::ConfigError::UnknownProvider(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VellumConfig {
    /// AI provider settings.
    pub ai: AiSettings,
}

impl VellumConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: VellumConfig) {
        self.ai.merge(other.ai);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AI Settings
// ─────────────────────────────────────────────────────────────────────────────

/// The `[ai]` section: everything the adapter layer reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Provider the user has selected as active.
    pub selected_provider: Option<Provider>,
    /// Model API name selected for the active provider.
    pub selected_model: Option<String>,
    /// Sampling temperature; values outside `[0, 1]` resolve to 0.7.
    pub temperature: Option<f64>,
    /// Max output tokens; values `<= 0` resolve to 1000.
    pub max_tokens: Option<i64>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Reject unknown model names for every provider instead of falling back.
    pub strict_models: Option<bool>,
    /// Per-provider overrides keyed by provider name.
    pub providers: BTreeMap<String, ProviderSettings>,
    /// LM Studio server settings.
    pub local: LocalModelSettings,
    /// OpenRouter attribution headers.
    pub openrouter: OpenRouterSettings,
    /// Gemini auth settings.
    pub gemini: GeminiSettings,
}

impl AiSettings {
    /// The selected provider, defaulting to OpenAI.
    pub fn selected_provider(&self) -> Provider {
        self.selected_provider.unwrap_or(Provider::OpenAi)
    }

    /// Configured temperature, clamped to the valid range by substitution.
    pub fn effective_temperature(&self) -> f64 {
        resolve_temperature(self.temperature)
    }

    /// Configured max tokens with the positive-value rule applied.
    pub fn effective_max_tokens(&self) -> u32 {
        resolve_max_tokens(None, self.max_tokens)
    }

    /// Request timeout for a provider.
    pub fn timeout_secs(&self, provider: Provider) -> u64 {
        match (self.request_timeout_secs, provider) {
            (Some(secs), _) if secs > 0 => secs,
            (_, Provider::LocalModel) => DEFAULT_LOCAL_TIMEOUT_SECS,
            _ => DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Whether unknown model names should be rejected for all providers.
    pub fn strict_models(&self) -> bool {
        self.strict_models.unwrap_or(false)
    }

    /// Settings block for a provider, if present.
    pub fn provider(&self, provider: Provider) -> Option<&ProviderSettings> {
        self.providers.get(provider.name())
    }

    /// Mutable settings block for a provider, created on demand.
    pub fn provider_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        self.providers.entry(provider.name().to_string()).or_default()
    }

    /// Custom base URL for a provider (proxies, tests).
    pub fn base_url(&self, provider: Provider) -> Option<&str> {
        self.provider(provider)
            .and_then(|p| p.base_url.as_deref())
            .filter(|url| !url.is_empty())
    }

    /// Resolve the API key for a provider (env var, then config file).
    pub fn resolve_api_key(&self, provider: Provider) -> Option<ResolvedSecret> {
        let config_value = self.provider(provider).and_then(|p| p.api_key.as_deref());
        secrets::resolve_api_key(provider, config_value)
    }

    /// Merge another settings block on top of this one (other takes priority).
    pub fn merge(&mut self, other: AiSettings) {
        if other.selected_provider.is_some() {
            self.selected_provider = other.selected_provider;
        }
        if other.selected_model.is_some() {
            self.selected_model = other.selected_model;
        }
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
        if other.max_tokens.is_some() {
            self.max_tokens = other.max_tokens;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.strict_models.is_some() {
            self.strict_models = other.strict_models;
        }
        for (name, settings) in other.providers {
            let entry = self.providers.entry(name).or_default();
            if settings.api_key.is_some() {
                entry.api_key = settings.api_key;
            }
            if settings.base_url.is_some() {
                entry.base_url = settings.base_url;
            }
        }
        if other.local.model.is_some() {
            self.local.model = other.local.model;
        }
        if other.local.port.is_some() {
            self.local.port = other.local.port;
        }
        if other.openrouter.referer.is_some() {
            self.openrouter.referer = other.openrouter.referer;
        }
        if other.openrouter.title.is_some() {
            self.openrouter.title = other.openrouter.title;
        }
        if other.gemini.legacy_bearer_auth.is_some() {
            self.gemini.legacy_bearer_auth = other.gemini.legacy_bearer_auth;
        }
    }
}

/// Per-provider overrides (`[ai.providers.<name>]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key (prefer the env var; warns if set here).
    pub api_key: Option<String>,
    /// Custom API base URL.
    pub base_url: Option<String>,
}

/// LM Studio settings (`[ai.local]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalModelSettings {
    /// Model loaded in LM Studio.
    pub model: Option<String>,
    /// Port the local server listens on.
    pub port: Option<u16>,
}

impl LocalModelSettings {
    /// Both model and port are set.
    pub fn is_configured(&self) -> bool {
        self.model.as_deref().is_some_and(|m| !m.is_empty()) && self.port.is_some()
    }
}

/// OpenRouter attribution headers (`[ai.openrouter]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterSettings {
    /// Value of the `HTTP-Referer` header.
    pub referer: Option<String>,
    /// Value of the `X-Title` header.
    pub title: Option<String>,
}

/// Gemini auth settings (`[ai.gemini]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// Send the key as a Bearer token instead of `x-goog-api-key`.
    pub legacy_bearer_auth: Option<bool>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared resolution rules
// ─────────────────────────────────────────────────────────────────────────────

/// Use the configured temperature if it lies within `[0, 1]`, else 0.7.
pub fn resolve_temperature(configured: Option<f64>) -> f64 {
    match configured {
        Some(t) if (0.0..=1.0).contains(&t) => t,
        _ => DEFAULT_TEMPERATURE,
    }
}

/// A positive per-call override wins; otherwise a positive configured value;
/// otherwise 1000.
pub fn resolve_max_tokens(override_tokens: Option<u32>, configured: Option<i64>) -> u32 {
    if let Some(n) = override_tokens.filter(|n| *n > 0) {
        return n;
    }
    match configured {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => DEFAULT_MAX_TOKENS,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
