//! Inbound message events and per-recipient results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EvaluatedDecision;
use crate::error::{HeraldError, HeraldResult};

/// A newly arrived conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub conversation_id: String,
    pub message_id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageEvent {
    /// Reject events with missing identity fields.
    pub fn validate(&self) -> HeraldResult<()> {
        for (field, value) in [
            ("conversationId", &self.conversation_id),
            ("messageId", &self.message_id),
            ("senderId", &self.sender_id),
        ] {
            if value.trim().is_empty() {
                return Err(HeraldError::missing_field(field));
            }
        }
        Ok(())
    }
}

/// A conversation member known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub display_name: String,
}

/// Result of evaluating one recipient of a fanned-out message.
#[derive(Debug)]
pub struct RecipientOutcome {
    pub recipient_id: String,
    pub result: HeraldResult<EvaluatedDecision>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_requires_ids() {
        let event = MessageEvent {
            conversation_id: "c1".into(),
            message_id: " ".into(),
            sender_id: "u1".into(),
            text: "hello".into(),
            timestamp: Utc::now(),
        };
        assert!(event.validate().is_err());
    }
}
