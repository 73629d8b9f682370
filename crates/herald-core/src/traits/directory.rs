//! Conversation directory: who is in a conversation and what was said.
//!
//! Conversations, users and messages live in an external store; this trait is
//! the read-only view the engine needs of them.

use async_trait::async_trait;

use crate::error::HeraldResult;
use crate::types::{ConversationMessage, Participant};

#[async_trait]
pub trait ConversationDirectory: Send + Sync {
    /// All participants of a conversation (empty if it is unknown).
    async fn participants(&self, conversation_id: &str) -> HeraldResult<Vec<Participant>>;

    /// Whether `user_id` is a participant of the conversation.
    async fn is_participant(&self, conversation_id: &str, user_id: &str) -> HeraldResult<bool> {
        Ok(self
            .participants(conversation_id)
            .await?
            .iter()
            .any(|p| p.user_id == user_id))
    }

    /// Display name of a user, if known.
    async fn display_name(&self, user_id: &str) -> HeraldResult<Option<String>>;

    /// The most recent `limit` messages, oldest first.
    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> HeraldResult<Vec<ConversationMessage>>;

    /// Number of messages in the conversation so far.
    async fn message_count(&self, conversation_id: &str) -> HeraldResult<u64>;
}
