//! User feedback on past notification decisions.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::NotificationDecision;

/// A user's verdict on a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeedbackKind {
    Helpful,
    NotHelpful,
}

/// One stored piece of feedback.
///
/// Identity is `(user_id, conversation_id, message_id)`, so a second
/// submission for the same message replaces the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub user_id: String,
    pub conversation_id: String,
    pub message_id: String,
    pub decision: NotificationDecision,
    pub feedback: FeedbackKind,
    /// Original message text, when the client sends it along.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_text: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Deterministic storage key for this record.
    pub fn id(&self) -> String {
        feedback_id(&self.user_id, &self.conversation_id, &self.message_id)
    }

    pub fn is_helpful(&self) -> bool {
        self.feedback == FeedbackKind::Helpful
    }

    /// Whether the decision being rated alerted the user.
    pub fn was_notified(&self) -> bool {
        self.decision.should_notify
    }
}

/// Storage key: `userId_conversationId_messageId`.
///
/// `_` and `%` inside a part are percent-encoded, so `_` only ever separates
/// parts and distinct triples never share a key.
pub fn feedback_id(user_id: &str, conversation_id: &str, message_id: &str) -> String {
    format!(
        "{}_{}_{}",
        escape_id_part(user_id),
        escape_id_part(conversation_id),
        escape_id_part(message_id)
    )
}

fn escape_id_part(part: &str) -> Cow<'_, str> {
    if part.contains(['%', '_']) {
        Cow::Owned(part.replace('%', "%25").replace('_', "%5F"))
    } else {
        Cow::Borrowed(part)
    }
}
