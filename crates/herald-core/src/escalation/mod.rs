//! Escalation of ambiguous messages to external inference.
//!
//! The client never returns `Err`. Every way a call can end is a variant of
//! [`EscalationOutcome`] so the orchestrator can react to each one
//! deterministically: use the decision, fall back, or propagate.

mod json_parser;
mod prompts;

use std::sync::Arc;

use tracing::debug;

pub use json_parser::{extract_json, parse_decision};
pub use prompts::{build_decision_prompt, profile_context, NOTIFICATION_DECISION_PROMPT};

use crate::error::HeraldError;
use crate::traits::{GenerationOptions, Llm, ResponseFormat};
use crate::types::{ConversationMessage, Message, NotificationDecision, UserNotificationProfile};

/// Whether an upstream failure is worth degrading around or needs an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// Timeout, rate limit, connection trouble.
    Transient,
    /// Bad credentials or configuration.
    Fatal,
}

impl UpstreamKind {
    pub fn of(error: &HeraldError) -> Self {
        if error.is_upstream_fatal() {
            UpstreamKind::Fatal
        } else {
            UpstreamKind::Transient
        }
    }
}

/// How an escalation ended.
#[derive(Debug)]
pub enum EscalationOutcome {
    Decision(NotificationDecision),
    /// The service answered but the answer was not a usable decision.
    ParseError { raw: String, message: String },
    UpstreamError { kind: UpstreamKind, error: HeraldError },
}

/// Everything the inference service sees about one decision.
#[derive(Debug, Clone, Copy)]
pub struct EscalationRequest<'a> {
    pub recipient_name: &'a str,
    pub sender_name: &'a str,
    pub message_text: &'a str,
    /// Recent conversation, oldest first.
    pub transcript: &'a [ConversationMessage],
    pub profile: Option<&'a UserNotificationProfile>,
}

/// Client for the external inference service.
#[derive(Clone)]
pub struct EscalationClient {
    llm: Arc<dyn Llm>,
}

impl EscalationClient {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Ask the service for a decision.
    pub async fn evaluate(&self, request: &EscalationRequest<'_>) -> EscalationOutcome {
        let messages = vec![
            Message::system(NOTIFICATION_DECISION_PROMPT),
            Message::user(build_decision_prompt(
                request.recipient_name,
                request.sender_name,
                request.message_text,
                request.transcript,
                request.profile,
            )),
        ];
        let options = GenerationOptions {
            response_format: self
                .llm
                .supports_json_mode()
                .then_some(ResponseFormat::Json),
            ..Default::default()
        };

        let response = match self.llm.generate(&messages, Some(options)).await {
            Ok(response) => response,
            Err(e) => {
                let kind = UpstreamKind::of(&e);
                // The caller decides between fallback and failure and logs it.
                debug!(model = self.llm.model_name(), ?kind, error = %e, "Inference call failed");
                return EscalationOutcome::UpstreamError { kind, error: e };
            }
        };

        let raw = response.content_or_empty().to_string();
        match parse_decision(&raw, request.sender_name, request.message_text) {
            Ok(decision) => {
                debug!(should_notify = decision.should_notify, "Parsed inference decision");
                EscalationOutcome::Decision(decision)
            }
            Err(e) => {
                debug!(error = %e, raw_len = raw.len(), "Unusable inference response");
                EscalationOutcome::ParseError {
                    raw,
                    message: e.to_string(),
                }
            }
        }
    }
}
