//! Factory for creating LLM providers.

use std::sync::Arc;

use tracing::info;

use herald_core::config::{LlmProvider, LlmProviderConfig};
use herald_core::error::HeraldResult;
use herald_core::traits::{Llm, LlmConfig};

use crate::anthropic::AnthropicLlm;
use crate::ollama::OllamaLlm;
use crate::openai::OpenAIProvider;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> HeraldResult<Arc<dyn Llm>> {
        let llm: Arc<dyn Llm> = match provider {
            LlmProvider::OpenAI => Arc::new(OpenAIProvider::new(config)?),
            LlmProvider::Anthropic => Arc::new(AnthropicLlm::new(config)?),
            LlmProvider::Ollama => Arc::new(OllamaLlm::new(config)?),
        };
        info!(provider = ?provider, model = llm.model_name(), "Inference provider ready");
        Ok(llm)
    }

    /// Create the provider described by a herald config section.
    pub fn from_provider_config(config: &LlmProviderConfig) -> HeraldResult<Arc<dyn Llm>> {
        Self::create(config.provider, config.config.clone())
    }

    /// Create an OpenAI LLM provider with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> HeraldResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::OpenAI, Self::model_config(model))
    }

    /// Create an Anthropic LLM provider with a specific model.
    pub fn anthropic_with_model(model: impl Into<String>) -> HeraldResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::Anthropic, Self::model_config(model))
    }

    /// Create an Ollama LLM provider with a specific model.
    pub fn ollama_with_model(model: impl Into<String>) -> HeraldResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::Ollama, Self::model_config(model))
    }

    fn model_config(model: impl Into<String>) -> LlmConfig {
        LlmConfig {
            model: model.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_from_provider_config() {
        let config = LlmProviderConfig {
            provider: LlmProvider::Anthropic,
            config: LlmConfig {
                model: "claude-3-5-haiku-20241022".into(),
                api_key: Some("test-key".into()),
                ..Default::default()
            },
        };
        let llm = LlmFactory::from_provider_config(&config).unwrap();
        assert_eq!(llm.model_name(), "claude-3-5-haiku-20241022");
        assert!(!llm.supports_json_mode());
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let llm = LlmFactory::ollama_with_model("qwen2.5:7b").unwrap();
        assert_eq!(llm.model_name(), "qwen2.5:7b");
    }
}
