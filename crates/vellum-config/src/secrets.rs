//! API key resolution.
//!
//! Resolution order:
//! 1. Environment variable (provider-specific, e.g. `OPENAI_API_KEY`)
//! 2. Config file (with warning at load time)

use crate::Provider;

/// Result of API key resolution with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    /// The secret value.
    pub value: String,
    /// Where the secret was found.
    pub source: SecretSource,
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve an API key for a provider.
///
/// Providers without an env var (the local model server) only resolve from
/// the config value. Empty values are treated as absent.
pub fn resolve_api_key(provider: Provider, config_value: Option<&str>) -> Option<ResolvedSecret> {
    if let Some(env_var) = provider.env_var()
        && let Ok(value) = std::env::var(env_var)
        && !value.trim().is_empty()
    {
        return Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(env_var.to_string()),
        });
    }

    config_value
        .filter(|v| !v.trim().is_empty())
        .map(|v| ResolvedSecret {
            value: v.to_string(),
            source: SecretSource::ConfigFile,
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_from_config_value() {
        // LocalModel has no env var, so the config value is the only source
        let resolved = resolve_api_key(Provider::LocalModel, Some("my-key")).unwrap();
        assert_eq!(resolved.value, "my-key");
        assert_eq!(resolved.source, SecretSource::ConfigFile);
    }

    #[test]
    fn test_resolve_ignores_empty_config_value() {
        assert!(resolve_api_key(Provider::LocalModel, Some("  ")).is_none());
        assert!(resolve_api_key(Provider::LocalModel, None).is_none());
    }

    #[test]
    fn test_secret_source_display() {
        assert_eq!(
            SecretSource::EnvVar("GROQ_API_KEY".to_string()).to_string(),
            "env var GROQ_API_KEY"
        );
        assert_eq!(
            SecretSource::ConfigFile.to_string(),
            "config file (plaintext)"
        );
    }
}
