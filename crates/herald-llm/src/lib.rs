//! herald-llm - Inference provider implementations for herald.
//!
//! Every provider implements [`herald_core::Llm`] and reports failures as
//! classified [`herald_core::HeraldError`] variants, so the decision engine
//! can tell a throttled provider from a revoked key.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - GPT-4o, GPT-4o-mini, etc.
//! - **Anthropic** (feature: `anthropic`) - Claude models over the Messages API
//! - **Ollama** (feature: `ollama`) - Local models via Ollama
//!
//! # Example
//!
//! ```ignore
//! use herald_llm::LlmFactory;
//!
//! let llm = LlmFactory::openai_with_model("gpt-4o-mini")?;
//! let llm = LlmFactory::from_provider_config(&config.llm)?;
//! ```

mod anthropic;
mod factory;
mod http;
mod ollama;
mod openai;

pub use anthropic::AnthropicLlm;
pub use factory::LlmFactory;
pub use ollama::OllamaLlm;
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use herald_core::config::{LlmProvider, LlmProviderConfig};
pub use herald_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
