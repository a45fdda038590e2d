//! LLM Client abstractions and provider management
//!
//! The research pipeline treats the language model as a black-box chat
//! completion capability: a system prompt and a user prompt in, text out.
//! - **Ollama**: local inference (default feature)
//! - **OpenAI**: OpenAI API and compatible endpoints (`openai` feature)

use crate::types::{AppError, Result};
use crate::utils::toml_config::{AnalystConfig, ProviderConfig};
use async_trait::async_trait;
use std::collections::HashMap;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing the research pipeline.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
///
/// | Provider | Feature | Notes |
/// |----------|---------|-------|
/// | Ollama | `ollama` (default) | Recommended for local |
/// | OpenAI | `openai` | Any OpenAI-compatible endpoint |
#[derive(Debug, Clone)]
pub enum Provider {
    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.1".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },

    /// OpenAI API provider (including Azure OpenAI and compatible APIs)
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        temperature: f32,
        max_tokens: u32,
    },
}

impl Provider {
    /// Resolve the configured provider, reading secrets from `env`
    pub fn from_config(config: &AnalystConfig, env: &HashMap<String, String>) -> Result<Self> {
        match &config.llm {
            ProviderConfig::Ollama { base_url, model } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            }),
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                model,
                temperature,
                max_tokens,
            } => Ok(Provider::OpenAI {
                api_key: AnalystConfig::resolve_env(env, api_key_env)?,
                api_base: api_base.clone(),
                model: model.clone(),
                temperature: *temperature,
                max_tokens: *max_tokens,
            }),
        }
    }

    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's cargo feature is disabled.
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?,
            )),

            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                temperature,
                max_tokens,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *temperature,
                *max_tokens,
            ))),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Config(format!(
                "{} provider requested but the '{}' feature is not enabled",
                other.name(),
                other.feature()
            ))),
        }
    }

    /// Check if this provider is compiled in
    pub fn is_implemented(&self) -> bool {
        match self {
            Provider::Ollama { .. } => cfg!(feature = "ollama"),
            Provider::OpenAI { .. } => cfg!(feature = "openai"),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Ollama { .. } => "Ollama",
            Provider::OpenAI { .. } => "OpenAI",
        }
    }

    fn feature(&self) -> &'static str {
        match self {
            Provider::Ollama { .. } => "ollama",
            Provider::OpenAI { .. } => "openai",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::load_config;

    #[test]
    fn test_provider_name() {
        let openai = Provider::OpenAI {
            api_key: "".to_string(),
            api_base: "".to_string(),
            model: "".to_string(),
            temperature: 0.4,
            max_tokens: 3000,
        };
        assert_eq!(openai.name(), "OpenAI");

        let ollama = Provider::Ollama {
            base_url: "".to_string(),
            model: "".to_string(),
        };
        assert_eq!(ollama.name(), "Ollama");
        assert_eq!(ollama.is_implemented(), cfg!(feature = "ollama"));
    }

    #[test]
    fn test_provider_from_config_resolves_key() {
        let toml = "[llm]\ntype = \"openai\"\nmodel = \"gpt-4o-mini\"\napi_key_env = \"TEST_KEY\"\n";
        let env: HashMap<String, String> =
            [("TEST_KEY".to_string(), "sk-test".to_string())].into();
        let config = load_config(Some(toml), &env).unwrap();

        match Provider::from_config(&config, &env).unwrap() {
            Provider::OpenAI { api_key, model, .. } => {
                assert_eq!(api_key, "sk-test");
                assert_eq!(model, "gpt-4o-mini");
            }
            other => panic!("unexpected provider {:?}", other),
        }
    }

    #[cfg(not(feature = "openai"))]
    #[tokio::test]
    async fn test_disabled_feature_returns_config_error() {
        let provider = Provider::OpenAI {
            api_key: "sk".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.4,
            max_tokens: 3000,
        };

        // Box<dyn LLMClient> doesn't implement Debug
        let err = match provider.create_client().await {
            Ok(_) => panic!("Expected error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("'openai' feature"));
    }
}
