//! Message types for LLM interactions and conversation context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message in an LLM exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    #[default]
    User,
    Assistant,
}

/// A message sent to an inference provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// A chat message as seen in a conversation (owned by the external message store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub message_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Render recent conversation messages as a transcript for prompts.
pub fn format_transcript(messages: &[ConversationMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.sender_name, m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_transcript() {
        let now = Utc::now();
        let messages = vec![
            ConversationMessage {
                message_id: "m1".into(),
                sender_id: "u1".into(),
                sender_name: "Bob".into(),
                text: "standup in 5".into(),
                timestamp: now,
            },
            ConversationMessage {
                message_id: "m2".into(),
                sender_id: "u2".into(),
                sender_name: "Alice".into(),
                text: "joining".into(),
                timestamp: now,
            },
        ];
        assert_eq!(format_transcript(&messages), "Bob: standup in 5\nAlice: joining");
    }
}
