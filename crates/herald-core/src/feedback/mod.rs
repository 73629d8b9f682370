//! Feedback ingestion.
//!
//! Feedback is keyed by `(user, conversation, message)`, so submitting twice
//! for the same message overwrites the first verdict.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HeraldError, HeraldResult};
use crate::traits::{ConversationDirectory, FeedbackStore};
use crate::types::{FeedbackKind, FeedbackRecord, NotificationDecision};

/// Feedback as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    pub conversation_id: String,
    pub message_id: String,
    pub decision: NotificationDecision,
    /// `helpful` or `not_helpful`.
    pub feedback: String,
    /// Text of the rated message, used for keyword learning.
    #[serde(default)]
    pub message_text: Option<String>,
}

/// Validates and stores user feedback on decisions.
#[derive(Clone)]
pub struct FeedbackIngestor {
    store: Arc<dyn FeedbackStore>,
    directory: Arc<dyn ConversationDirectory>,
}

impl FeedbackIngestor {
    pub fn new(store: Arc<dyn FeedbackStore>, directory: Arc<dyn ConversationDirectory>) -> Self {
        Self { store, directory }
    }

    /// Store feedback from `caller`. Returns the feedback id.
    ///
    /// Input is validated before membership is checked, and nothing is
    /// written unless both pass.
    pub async fn submit(&self, caller: &str, submission: FeedbackSubmission) -> HeraldResult<String> {
        for (field, value) in [
            ("userId", caller),
            ("conversationId", submission.conversation_id.as_str()),
            ("messageId", submission.message_id.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(HeraldError::missing_field(field));
            }
        }
        let feedback: FeedbackKind = submission.feedback.trim().parse().map_err(|_| {
            HeraldError::validation_with_suggestion(
                format!("Invalid feedback value '{}'", submission.feedback),
                "Use 'helpful' or 'not_helpful'",
            )
        })?;
        submission.decision.validate()?;

        if !self
            .directory
            .is_participant(&submission.conversation_id, caller)
            .await?
        {
            return Err(HeraldError::not_participant(caller, &submission.conversation_id));
        }

        let record = FeedbackRecord {
            user_id: caller.to_string(),
            conversation_id: submission.conversation_id,
            message_id: submission.message_id,
            decision: submission.decision,
            feedback,
            message_text: submission.message_text.filter(|t| !t.trim().is_empty()),
            timestamp: Utc::now(),
        };
        let id = self.store.upsert(&record)?;
        info!(
            user_id = caller,
            conversation_id = %record.conversation_id,
            feedback_id = %id,
            feedback = %feedback,
            "Feedback stored"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryDirectory, InMemoryStore};
    use crate::types::{Participant, Priority};

    async fn ingestor() -> (FeedbackIngestor, Arc<InMemoryStore>) {
        let directory = Arc::new(InMemoryDirectory::new());
        directory
            .set_participants(
                "c1",
                vec![Participant {
                    user_id: "alice".into(),
                    display_name: "Alice".into(),
                }],
            )
            .await;
        let store = Arc::new(InMemoryStore::new());
        (FeedbackIngestor::new(store.clone(), directory), store)
    }

    fn submission(feedback: &str) -> FeedbackSubmission {
        FeedbackSubmission {
            conversation_id: "c1".into(),
            message_id: "m1".into(),
            decision: NotificationDecision::notify("Urgent message", "Bob: asap", Priority::High),
            feedback: feedback.into(),
            message_text: Some("need this asap".into()),
        }
    }

    #[tokio::test]
    async fn test_resubmission_overwrites() {
        let (ingestor, store) = ingestor().await;
        let first = ingestor.submit("alice", submission("helpful")).await.unwrap();
        let second = ingestor.submit("alice", submission("not_helpful")).await.unwrap();

        assert_eq!(first, "alice_c1_m1");
        assert_eq!(first, second);
        assert_eq!(store.feedback_count().unwrap(), 1);
        let stored = FeedbackStore::get(store.as_ref(), &first).unwrap().unwrap();
        assert_eq!(stored.feedback, FeedbackKind::NotHelpful);
    }

    #[tokio::test]
    async fn test_non_participant_rejected() {
        let (ingestor, store) = ingestor().await;
        let err = ingestor.submit("mallory", submission("helpful")).await.unwrap_err();
        assert!(matches!(err, HeraldError::PermissionDenied { .. }));
        assert_eq!(store.feedback_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_without_side_effects() {
        let (ingestor, store) = ingestor().await;

        let err = ingestor.submit("alice", submission("meh")).await.unwrap_err();
        assert!(matches!(err, HeraldError::Validation { .. }));

        let mut bad_decision = submission("helpful");
        bad_decision.decision.reason = String::new();
        assert!(ingestor.submit("alice", bad_decision).await.is_err());

        let mut no_text = submission("helpful");
        no_text.decision.notification_text = String::new();
        let err = ingestor.submit("alice", no_text).await.unwrap_err();
        assert!(matches!(err, HeraldError::Validation { .. }));

        let mut no_message = submission("helpful");
        no_message.message_id = " ".into();
        assert!(ingestor.submit("alice", no_message).await.is_err());

        assert_eq!(store.feedback_count().unwrap(), 0);
    }
}
