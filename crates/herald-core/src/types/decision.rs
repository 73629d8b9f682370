//! Notification decisions produced by the decision pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{HeraldError, HeraldResult};

/// Maximum characters of message text carried into a notification preview.
pub const PREVIEW_CHARS: usize = 120;

/// Priority of a notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// Whether and how to alert a recipient about a message.
///
/// Always fully populated. `notification_text` is empty whenever
/// `should_notify` is false. Decisions are values: re-evaluating a message
/// produces a new decision rather than changing an old one. `priority` is
/// required on the wire; `notificationText` may be omitted only for a
/// suppressed decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDecision {
    pub should_notify: bool,
    pub reason: String,
    #[serde(default)]
    pub notification_text: String,
    pub priority: Priority,
}

impl NotificationDecision {
    /// Decision to alert the recipient.
    pub fn notify(
        reason: impl Into<String>,
        notification_text: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            should_notify: true,
            reason: reason.into(),
            notification_text: notification_text.into(),
            priority,
        }
    }

    /// Decision to stay silent.
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            should_notify: false,
            reason: reason.into(),
            notification_text: String::new(),
            priority: Priority::Low,
        }
    }

    /// Check the decision is well formed.
    pub fn validate(&self) -> HeraldResult<()> {
        if self.reason.trim().is_empty() {
            return Err(HeraldError::missing_field("decision.reason"));
        }
        if self.should_notify && self.notification_text.trim().is_empty() {
            return Err(HeraldError::missing_field("decision.notificationText"));
        }
        if !self.should_notify && !self.notification_text.is_empty() {
            return Err(HeraldError::validation_with_suggestion(
                "Suppressed decision carries notification text",
                "Leave notificationText empty when shouldNotify is false",
            ));
        }
        Ok(())
    }
}

/// Build the text shown in a push notification: `"{sender}: {preview}"`.
pub fn notification_text(sender_name: &str, text: &str) -> String {
    let text = text.trim();
    let preview = if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut.trim_end())
    } else {
        text.to_string()
    };
    format!("{}: {}", sender_name, preview)
}

/// Which stage of the pipeline produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolutionPath {
    /// Resolved by a rule without external inference.
    Heuristic,
    /// Resolved by the external inference service.
    Inference,
    /// Served from a usable cache entry.
    Cache,
    /// Inference failed transiently and the configured safe default was used.
    Fallback,
}

/// A decision together with how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedDecision {
    pub decision: NotificationDecision,
    pub path: ResolutionPath,
    pub cached: bool,
    /// Conversation items produced since the cached decision was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_since_cache: Option<u64>,
}
