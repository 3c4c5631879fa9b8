//! Static model catalog.
//!
//! One ordered list of models per provider. The first entry is the provider's
//! default: it is used for connection tests and as the fallback for unknown
//! model names.

use serde::Serialize;
use vellum_config::Provider;

/// What a model can do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ModelCapabilities {
    pub max_output_tokens: Option<u32>,
    pub supports_function_calls: Option<bool>,
    pub supports_streaming: Option<bool>,
    pub supports_vision: Option<bool>,
}

/// A single catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelDescriptor {
    /// Name shown to users.
    pub display_name: &'static str,
    /// Identifier sent to the provider API.
    pub api_name: &'static str,
    pub capabilities: ModelCapabilities,
    /// USD per million input tokens.
    pub input_cost_per_1m: Option<f64>,
    /// USD per million output tokens.
    pub output_cost_per_1m: Option<f64>,
    /// Context window in tokens.
    pub context_window: Option<u32>,
}

impl ModelDescriptor {
    /// Estimated USD cost of a call, when pricing is known.
    pub fn estimate_cost(&self, input_tokens: u64, output_tokens: u64) -> Option<f64> {
        let input = self.input_cost_per_1m?;
        let output = self.output_cost_per_1m?;
        Some((input_tokens as f64 * input + output_tokens as f64 * output) / 1_000_000.0)
    }
}

const fn hosted(
    display_name: &'static str,
    api_name: &'static str,
    context_window: u32,
    max_output_tokens: u32,
    input_cost: f64,
    output_cost: f64,
    vision: bool,
) -> ModelDescriptor {
    ModelDescriptor {
        display_name,
        api_name,
        capabilities: ModelCapabilities {
            max_output_tokens: Some(max_output_tokens),
            supports_function_calls: Some(true),
            supports_streaming: Some(true),
            supports_vision: Some(vision),
        },
        input_cost_per_1m: Some(input_cost),
        output_cost_per_1m: Some(output_cost),
        context_window: Some(context_window),
    }
}

static OPENAI_MODELS: [ModelDescriptor; 5] = [
    hosted("GPT-4o mini", "gpt-4o-mini", 128_000, 16_384, 0.15, 0.60, true),
    hosted("GPT-4o", "gpt-4o", 128_000, 16_384, 2.50, 10.00, true),
    hosted("GPT-4.1", "gpt-4.1", 1_047_576, 32_768, 2.00, 8.00, true),
    hosted("GPT-4.1 mini", "gpt-4.1-mini", 1_047_576, 32_768, 0.40, 1.60, true),
    hosted("o3-mini", "o3-mini", 200_000, 100_000, 1.10, 4.40, false),
];

static ANTHROPIC_MODELS: [ModelDescriptor; 4] = [
    hosted(
        "Claude Sonnet 4",
        "claude-sonnet-4-20250514",
        200_000,
        64_000,
        3.00,
        15.00,
        true,
    ),
    hosted(
        "Claude 3.7 Sonnet",
        "claude-3-7-sonnet-latest",
        200_000,
        64_000,
        3.00,
        15.00,
        true,
    ),
    hosted(
        "Claude 3.5 Haiku",
        "claude-3-5-haiku-latest",
        200_000,
        8_192,
        0.80,
        4.00,
        false,
    ),
    hosted(
        "Claude Opus 4",
        "claude-opus-4-20250514",
        200_000,
        32_000,
        15.00,
        75.00,
        true,
    ),
];

static GOOGLE_MODELS: [ModelDescriptor; 3] = [
    hosted("Gemini 2.0 Flash", "gemini-2.0-flash", 1_048_576, 8_192, 0.10, 0.40, true),
    hosted("Gemini 1.5 Pro", "gemini-1.5-pro", 2_097_152, 8_192, 1.25, 5.00, true),
    hosted("Gemini 1.5 Flash", "gemini-1.5-flash", 1_048_576, 8_192, 0.075, 0.30, true),
];

static GROQ_MODELS: [ModelDescriptor; 3] = [
    hosted(
        "Llama 3.3 70B Versatile",
        "llama-3.3-70b-versatile",
        128_000,
        32_768,
        0.59,
        0.79,
        false,
    ),
    hosted(
        "Llama 3.1 8B Instant",
        "llama-3.1-8b-instant",
        128_000,
        8_192,
        0.05,
        0.08,
        false,
    ),
    hosted("Gemma 2 9B", "gemma2-9b-it", 8_192, 8_192, 0.20, 0.20, false),
];

static MISTRAL_MODELS: [ModelDescriptor; 3] = [
    hosted(
        "Mistral Large",
        "mistral-large-latest",
        128_000,
        8_192,
        2.00,
        6.00,
        false,
    ),
    hosted(
        "Mistral Small",
        "mistral-small-latest",
        32_000,
        8_192,
        0.20,
        0.60,
        false,
    ),
    hosted(
        "Mistral Nemo",
        "open-mistral-nemo",
        128_000,
        8_192,
        0.15,
        0.15,
        false,
    ),
];

static PERPLEXITY_MODELS: [ModelDescriptor; 3] = [
    hosted("Sonar", "sonar", 127_072, 8_000, 1.00, 1.00, false),
    hosted("Sonar Pro", "sonar-pro", 200_000, 8_000, 3.00, 15.00, false),
    hosted(
        "Sonar Reasoning",
        "sonar-reasoning",
        127_072,
        8_000,
        1.00,
        5.00,
        false,
    ),
];

static OPENROUTER_MODELS: [ModelDescriptor; 4] = [
    hosted(
        "GPT-4o mini (OpenRouter)",
        "openai/gpt-4o-mini",
        128_000,
        16_384,
        0.15,
        0.60,
        true,
    ),
    hosted(
        "Claude 3.5 Sonnet (OpenRouter)",
        "anthropic/claude-3.5-sonnet",
        200_000,
        8_192,
        3.00,
        15.00,
        true,
    ),
    hosted(
        "Gemini 1.5 Flash (OpenRouter)",
        "google/gemini-flash-1.5",
        1_000_000,
        8_192,
        0.075,
        0.30,
        true,
    ),
    hosted(
        "Llama 3.1 70B Instruct (OpenRouter)",
        "meta-llama/llama-3.1-70b-instruct",
        131_072,
        8_192,
        0.40,
        0.40,
        false,
    ),
];

static LOCAL_MODELS: [ModelDescriptor; 1] = [ModelDescriptor {
    display_name: "Local Model (LM Studio)",
    api_name: "local-model",
    capabilities: ModelCapabilities {
        max_output_tokens: None,
        supports_function_calls: Some(false),
        supports_streaming: Some(false),
        supports_vision: Some(false),
    },
    input_cost_per_1m: None,
    output_cost_per_1m: None,
    context_window: None,
}];

/// All catalog models for a provider, in preference order.
pub fn models(provider: Provider) -> &'static [ModelDescriptor] {
    match provider {
        Provider::OpenAi => &OPENAI_MODELS,
        Provider::Anthropic => &ANTHROPIC_MODELS,
        Provider::Google => &GOOGLE_MODELS,
        Provider::Groq => &GROQ_MODELS,
        Provider::Mistral => &MISTRAL_MODELS,
        Provider::Perplexity => &PERPLEXITY_MODELS,
        Provider::OpenRouter => &OPENROUTER_MODELS,
        Provider::LocalModel => &LOCAL_MODELS,
    }
}

/// Look up a model by API name.
pub fn find(provider: Provider, api_name: &str) -> Option<&'static ModelDescriptor> {
    models(provider).iter().find(|m| m.api_name == api_name)
}

/// The provider's first catalog model.
pub fn default_model(provider: Provider) -> Option<&'static ModelDescriptor> {
    models(provider).first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_provider_has_models() {
        for provider in Provider::ALL {
            assert!(!models(provider).is_empty(), "{} has no models", provider);
            assert!(default_model(provider).is_some());
        }
    }

    #[test]
    fn test_api_names_unique_per_provider() {
        for provider in Provider::ALL {
            let mut seen = HashSet::new();
            for model in models(provider) {
                assert!(
                    seen.insert(model.api_name),
                    "duplicate {} in {}",
                    model.api_name,
                    provider
                );
            }
        }
    }

    #[test]
    fn test_find() {
        let model = find(Provider::Anthropic, "claude-3-5-haiku-latest").unwrap();
        assert_eq!(model.display_name, "Claude 3.5 Haiku");
        assert!(find(Provider::Anthropic, "gpt-4o").is_none());
    }

    #[test]
    fn test_estimate_cost() {
        let model = find(Provider::OpenAi, "gpt-4o").unwrap();
        let cost = model.estimate_cost(1_000_000, 500_000).unwrap();
        assert!((cost - 7.5).abs() < 1e-9);

        let local = default_model(Provider::LocalModel).unwrap();
        assert!(local.estimate_cost(100, 100).is_none());
    }
}
