//! Anthropic (Claude) provider over the Messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use herald_core::error::{HeraldError, HeraldResult};
use herald_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat, TokenUsage};
use herald_core::types::{Message, MessageRole};

use crate::http::classify_reqwest;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
const JSON_INSTRUCTION: &str = "Respond with a single JSON object and nothing else.";

/// Anthropic LLM provider.
pub struct AnthropicLlm {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type", default)]
    error_type: String,
    message: String,
}

impl AnthropicLlm {
    /// Create a new Anthropic LLM provider.
    pub fn new(config: LlmConfig) -> HeraldResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                HeraldError::Configuration("Anthropic API key not found. Set ANTHROPIC_API_KEY or HERALD_LLM_API_KEY, or provide api_key in config.".to_string())
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            api_key
                .parse()
                .map_err(|_| HeraldError::Configuration("Invalid API key format".to_string()))?,
        );
        headers.insert(
            "anthropic-version",
            reqwest::header::HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                HeraldError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| ANTHROPIC_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let mut config = config;
        if config.model.is_empty() {
            config.model = DEFAULT_MODEL.to_string();
        }

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    fn build_request(&self, messages: &[Message], options: &GenerationOptions) -> AnthropicRequest {
        // The Messages API takes the system prompt out of band.
        let mut system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        if matches!(options.response_format, Some(ResponseFormat::Json)) {
            system.push(JSON_INSTRUCTION);
        }

        let conversation = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| AnthropicMessage {
                role: match m.role {
                    MessageRole::Assistant => "assistant",
                    _ => "user",
                },
                content: m.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: Some(options.temperature.unwrap_or(self.config.temperature)),
            top_p: options.top_p,
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
            messages: conversation,
        }
    }
}

/// Turn a non-success response into a classified error.
fn classify_response(status: u16, body: &str) -> HeraldError {
    match serde_json::from_str::<AnthropicError>(body) {
        // 529 means the API is overloaded; treat it like throttling.
        Ok(e) if e.error.error_type == "overloaded_error" => HeraldError::rate_limit(e.error.message),
        Ok(e) => HeraldError::from_http_status(status, &e.error.message),
        Err(_) => HeraldError::from_http_status(status, body),
    }
}

#[async_trait]
impl Llm for AnthropicLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> HeraldResult<LlmResponse> {
        let options = options.unwrap_or_default();
        let request = self.build_request(messages, &options);

        debug!(model = %self.config.model, messages = request.messages.len(), "Calling Anthropic");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest("Anthropic", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest("Anthropic", e))?;

        if !status.is_success() {
            return Err(classify_response(status.as_u16(), &body));
        }

        let response: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| HeraldError::llm(format!("Failed to parse Anthropic response: {}", e)))?;

        let content = response
            .content
            .iter()
            .find(|c| c.content_type == "text")
            .and_then(|c| c.text.clone());

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });

        Ok(LlmResponse { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn supports_json_mode(&self) -> bool {
        // No native JSON mode; requested JSON is enforced through the system prompt.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm() -> AnthropicLlm {
        AnthropicLlm::new(LlmConfig {
            api_key: Some("test-key".into()),
            base_url: Some("http://127.0.0.1:9/".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let llm = llm();
        assert_eq!(llm.model_name(), DEFAULT_MODEL);
        assert_eq!(llm.base_url, "http://127.0.0.1:9");
    }

    #[test]
    fn test_system_prompt_moved_out_of_messages() {
        let llm = llm();
        let request = llm.build_request(
            &[Message::system("be brief"), Message::user("hi")],
            &GenerationOptions {
                response_format: Some(ResponseFormat::Json),
                ..Default::default()
            },
        );
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        let system = request.system.unwrap();
        assert!(system.starts_with("be brief"));
        assert!(system.ends_with(JSON_INSTRUCTION));
    }

    #[test]
    fn test_error_classification() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        assert!(classify_response(401, body).is_upstream_fatal());

        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert!(matches!(
            classify_response(529, body),
            HeraldError::RateLimit { .. }
        ));

        assert!(classify_response(502, "<html>bad gateway</html>").is_upstream_transient());
    }

    #[test]
    fn test_unreachable_provider_is_transient() {
        let llm = llm();
        let err = tokio_test::block_on(llm.generate(&[Message::user("hi")], None)).unwrap_err();
        assert!(err.is_upstream_transient());
    }
}
