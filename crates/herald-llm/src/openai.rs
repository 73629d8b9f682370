//! OpenAI LLM provider implementation.

use async_trait::async_trait;
use tracing::debug;

use herald_core::error::{HeraldError, HeraldResult};
use herald_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse};
use herald_core::types::Message;

#[cfg(feature = "openai")]
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
        ResponseFormat as OpenAIResponseFormat,
    },
    Client,
};
#[cfg(feature = "openai")]
use herald_core::traits::{ResponseFormat, TokenUsage};
#[cfg(feature = "openai")]
use herald_core::types::MessageRole;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI LLM provider.
pub struct OpenAIProvider {
    #[cfg(feature = "openai")]
    client: Client<OpenAIConfig>,
    config: LlmConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI LLM provider.
    pub fn new(config: LlmConfig) -> HeraldResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                HeraldError::Configuration("OpenAI API key not found. Set OPENAI_API_KEY or HERALD_LLM_API_KEY, or provide api_key in config.".to_string())
            })?;

        #[cfg(feature = "openai")]
        let client = {
            let openai_config = match config.base_url {
                Some(ref base_url) => OpenAIConfig::new()
                    .with_api_key(api_key)
                    .with_api_base(base_url),
                None => OpenAIConfig::new().with_api_key(api_key),
            };
            Client::with_config(openai_config)
        };
        #[cfg(not(feature = "openai"))]
        let _ = api_key;

        let mut config = config;
        if config.model.is_empty() {
            config.model = DEFAULT_MODEL.to_string();
        }

        Ok(Self {
            #[cfg(feature = "openai")]
            client,
            config,
        })
    }

    /// Reasoning models reject sampling parameters.
    fn is_reasoning_model(&self) -> bool {
        let model_lower = self.config.model.to_lowercase();
        ["o1", "o3", "o4", "gpt-5"]
            .iter()
            .any(|m| model_lower.starts_with(m))
    }

    #[cfg(feature = "openai")]
    fn message_to_openai(msg: &Message) -> ChatCompletionRequestMessage {
        match msg.role {
            MessageRole::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            MessageRole::User => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            MessageRole::Assistant => {
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    ..Default::default()
                })
            }
        }
    }
}

/// Classify an OpenAI client error.
#[cfg(feature = "openai")]
fn classify_error(err: OpenAIError) -> HeraldError {
    match err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or_default();
            let kind = api.r#type.as_deref().unwrap_or_default();
            match (code, kind) {
                ("invalid_api_key", _) | (_, "authentication_error") => {
                    HeraldError::authentication(api.message)
                }
                ("rate_limit_exceeded", _) | (_, "rate_limit_error") => {
                    HeraldError::rate_limit(api.message)
                }
                // Out of credit does not fix itself.
                ("insufficient_quota", _) | (_, "insufficient_quota") => {
                    HeraldError::authentication(api.message)
                }
                _ => HeraldError::llm(format!("OpenAI API error: {}", api.message)),
            }
        }
        OpenAIError::Reqwest(e) => crate::http::classify_reqwest("OpenAI", e),
        OpenAIError::JSONDeserialize(e) => {
            HeraldError::llm(format!("Failed to parse OpenAI response: {}", e))
        }
        OpenAIError::InvalidArgument(msg) => HeraldError::Configuration(msg),
        other => HeraldError::llm(format!("OpenAI error: {}", other)),
    }
}

#[async_trait]
impl Llm for OpenAIProvider {
    #[cfg(feature = "openai")]
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> HeraldResult<LlmResponse> {
        let options = options.unwrap_or_default();

        let mut request = CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(Self::message_to_openai).collect(),
            ..Default::default()
        };

        if !self.is_reasoning_model() {
            request.temperature = Some(options.temperature.unwrap_or(self.config.temperature));
            request.top_p = Some(options.top_p.unwrap_or(self.config.top_p));
            request.max_tokens = Some(options.max_tokens.unwrap_or(self.config.max_tokens));
        }
        if matches!(options.response_format, Some(ResponseFormat::Json)) {
            request.response_format = Some(OpenAIResponseFormat::JsonObject);
        }

        debug!(model = %self.config.model, messages = messages.len(), "Calling OpenAI");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_error)?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| HeraldError::llm("No response choices returned"))?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse {
            content: choice.message.content.clone(),
            usage,
        })
    }

    #[cfg(not(feature = "openai"))]
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> HeraldResult<LlmResponse> {
        debug!(model = %self.config.model, "OpenAI support not compiled in");
        Err(HeraldError::Configuration(
            "OpenAI feature not enabled. Enable the 'openai' feature.".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn supports_json_mode(&self) -> bool {
        !self.is_reasoning_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(model: &str) -> OpenAIProvider {
        OpenAIProvider::new(LlmConfig {
            model: model.into(),
            api_key: Some("sk-test".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_model() {
        assert_eq!(provider("").model_name(), DEFAULT_MODEL);
    }

    #[test]
    fn test_reasoning_models_detected() {
        assert!(provider("o3-mini").is_reasoning_model());
        assert!(!provider("gpt-4o-mini").is_reasoning_model());
        assert!(!provider("o3-mini").supports_json_mode());
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_api_errors_classified() {
        use async_openai::error::ApiError;

        let api = |code: &str, kind: &str| {
            OpenAIError::ApiError(ApiError {
                message: "nope".into(),
                r#type: Some(kind.into()),
                param: None,
                code: Some(code.into()),
            })
        };

        assert!(classify_error(api("invalid_api_key", "invalid_request_error")).is_upstream_fatal());
        assert!(matches!(
            classify_error(api("rate_limit_exceeded", "requests")),
            HeraldError::RateLimit { .. }
        ));
        assert!(classify_error(api("insufficient_quota", "insufficient_quota")).is_upstream_fatal());
        assert!(classify_error(api("server_error", "server_error")).is_upstream_transient());
    }
}
