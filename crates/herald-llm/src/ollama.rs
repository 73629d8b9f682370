//! Ollama LLM provider implementation.

use async_trait::async_trait;
use tracing::debug;

use herald_core::error::{HeraldError, HeraldResult};
use herald_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse};
use herald_core::types::Message;

#[cfg(feature = "ollama")]
use herald_core::traits::ResponseFormat;
#[cfg(feature = "ollama")]
use herald_core::types::MessageRole;
#[cfg(feature = "ollama")]
use ollama_rs::{
    generation::chat::{ChatMessage, ChatMessageRequest, MessageRole as OllamaRole},
    Ollama,
};

const DEFAULT_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1:8b";

/// Ollama LLM provider.
pub struct OllamaLlm {
    #[cfg(feature = "ollama")]
    client: Ollama,
    config: LlmConfig,
    host: String,
    port: u16,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider.
    pub fn new(config: LlmConfig) -> HeraldResult<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let url = url::Url::parse(&base_url)
            .map_err(|e| HeraldError::Configuration(format!("Invalid Ollama URL: {}", e)))?;

        let host = format!("{}://{}", url.scheme(), url.host_str().unwrap_or("localhost"));
        let port = url.port().unwrap_or(11434);

        #[cfg(feature = "ollama")]
        let client = Ollama::new(host.clone(), port);

        let mut config = config;
        if config.model.is_empty() {
            config.model = DEFAULT_MODEL.to_string();
        }

        Ok(Self {
            #[cfg(feature = "ollama")]
            client,
            config,
            host,
            port,
        })
    }

    #[cfg(feature = "ollama")]
    fn message_to_ollama(msg: &Message) -> ChatMessage {
        let role = match msg.role {
            MessageRole::System => OllamaRole::System,
            MessageRole::User => OllamaRole::User,
            MessageRole::Assistant => OllamaRole::Assistant,
        };
        ChatMessage::new(role, msg.content.clone())
    }
}

#[async_trait]
impl Llm for OllamaLlm {
    #[cfg(feature = "ollama")]
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> HeraldResult<LlmResponse> {
        let options = options.unwrap_or_default();

        let mut ollama_messages: Vec<ChatMessage> =
            messages.iter().map(Self::message_to_ollama).collect();

        // Local models are only prompted into JSON.
        if matches!(options.response_format, Some(ResponseFormat::Json)) {
            if let Some(last) = ollama_messages.last_mut() {
                last.content.push_str("\n\nRespond with valid JSON only.");
            }
        }

        debug!(model = %self.config.model, host = %self.host, port = self.port, "Calling Ollama");

        let request = ChatMessageRequest::new(self.config.model.clone(), ollama_messages);

        // A local server that is down or still loading a model is transient.
        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| HeraldError::api(format!("Ollama API error: {}", e)))?;

        Ok(LlmResponse {
            content: response.message.map(|m| m.content),
            usage: None,
        })
    }

    #[cfg(not(feature = "ollama"))]
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> HeraldResult<LlmResponse> {
        debug!(host = %self.host, port = self.port, "Ollama support not compiled in");
        Err(HeraldError::Configuration(
            "Ollama feature not enabled. Enable the 'ollama' feature.".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
