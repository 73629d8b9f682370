//! In-memory implementations of the store and directory traits.
//!
//! Used by tests and single-process deployments. Every operation takes one
//! lock, which is what makes `atomic_increment` atomic here.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{HeraldError, HeraldResult};
use crate::traits::{ConversationDirectory, FeedbackStore, KvStore, ProfileStore};
use crate::types::{ConversationMessage, FeedbackRecord, Participant, UserNotificationProfile};

fn lock<T>(mutex: &Mutex<T>) -> HeraldResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| HeraldError::database(format!("store lock poisoned: {}", e)))
}

#[derive(Debug, Clone)]
struct KvEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl KvEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Process-local store implementing every storage trait.
#[derive(Default)]
pub struct InMemoryStore {
    kv: Mutex<HashMap<String, KvEntry>>,
    feedback: Mutex<HashMap<String, FeedbackRecord>>,
    profiles: Mutex<HashMap<String, UserNotificationProfile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored feedback records.
    pub fn feedback_count(&self) -> HeraldResult<usize> {
        Ok(lock(&self.feedback)?.len())
    }
}

impl KvStore for InMemoryStore {
    fn get(&self, key: &str) -> HeraldResult<Option<String>> {
        let now = Utc::now();
        let kv = lock(&self.kv)?;
        Ok(kv
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn put(&self, key: &str, value: String, expires_at: Option<DateTime<Utc>>) -> HeraldResult<()> {
        lock(&self.kv)?.insert(key.to_string(), KvEntry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> HeraldResult<bool> {
        Ok(lock(&self.kv)?.remove(key).is_some())
    }

    fn atomic_increment(&self, key: &str, expires_at: Option<DateTime<Utc>>) -> HeraldResult<u64> {
        let now = Utc::now();
        let mut kv = lock(&self.kv)?;
        let current = match kv.get(key) {
            Some(entry) if entry.is_live(now) => entry.value.parse::<u64>().map_err(|e| {
                HeraldError::parse(format!("counter '{}' is not numeric: {}", key, e))
            })?,
            _ => 0,
        };
        let next = current + 1;
        kv.insert(
            key.to_string(),
            KvEntry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    fn purge_expired(&self) -> HeraldResult<usize> {
        let now = Utc::now();
        let mut kv = lock(&self.kv)?;
        let before = kv.len();
        kv.retain(|_, entry| entry.is_live(now));
        Ok(before - kv.len())
    }
}

impl FeedbackStore for InMemoryStore {
    fn upsert(&self, record: &FeedbackRecord) -> HeraldResult<String> {
        let id = record.id();
        lock(&self.feedback)?.insert(id.clone(), record.clone());
        Ok(id)
    }

    fn get(&self, id: &str) -> HeraldResult<Option<FeedbackRecord>> {
        Ok(lock(&self.feedback)?.get(id).cloned())
    }

    fn list_for_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> HeraldResult<Vec<FeedbackRecord>> {
        let mut records: Vec<FeedbackRecord> = lock(&self.feedback)?
            .values()
            .filter(|r| r.user_id == user_id && r.timestamp >= since)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    fn users_with_feedback_since(&self, since: DateTime<Utc>) -> HeraldResult<Vec<String>> {
        let mut users: Vec<String> = lock(&self.feedback)?
            .values()
            .filter(|r| r.timestamp >= since)
            .map(|r| r.user_id.clone())
            .collect();
        users.sort();
        users.dedup();
        Ok(users)
    }
}

impl ProfileStore for InMemoryStore {
    fn get(&self, user_id: &str) -> HeraldResult<Option<UserNotificationProfile>> {
        Ok(lock(&self.profiles)?.get(user_id).cloned())
    }

    fn merge_upsert(
        &self,
        mut profile: UserNotificationProfile,
    ) -> HeraldResult<UserNotificationProfile> {
        let mut profiles = lock(&self.profiles)?;
        profile.version = profiles
            .get(&profile.user_id)
            .map_or(1, |existing| existing.version + 1);
        profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }
}

/// Messages kept per conversation when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Default)]
struct ConversationState {
    participants: Vec<Participant>,
    /// Newest last, at most `history_limit` long.
    messages: VecDeque<ConversationMessage>,
    /// Every message ever recorded, including evicted ones.
    total: u64,
}

/// Directory kept in process memory, fed by whoever owns the conversations.
///
/// Only the most recent messages of each conversation are kept; the item
/// count keeps growing past them.
pub struct InMemoryDirectory {
    conversations: RwLock<HashMap<String, ConversationState>>,
    names: RwLock<HashMap<String, String>>,
    history_limit: usize,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` messages per conversation.
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
            history_limit: limit.max(1),
        }
    }

    /// Replace the participant list of a conversation.
    pub async fn set_participants(&self, conversation_id: &str, participants: Vec<Participant>) {
        {
            let mut names = self.names.write().await;
            for p in &participants {
                names.insert(p.user_id.clone(), p.display_name.clone());
            }
        }
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(conversation_id.to_string())
            .or_default()
            .participants = participants;
    }

    /// Append a message to a conversation's history.
    ///
    /// Messages already held, or older than everything held by a full
    /// history, were seen before and are ignored.
    pub async fn record_message(&self, conversation_id: &str, message: ConversationMessage) {
        let mut conversations = self.conversations.write().await;
        let state = conversations.entry(conversation_id.to_string()).or_default();
        if state.messages.iter().any(|m| m.message_id == message.message_id) {
            return;
        }
        let full = state.messages.len() >= self.history_limit;
        if full
            && state
                .messages
                .front()
                .is_some_and(|oldest| message.timestamp < oldest.timestamp)
        {
            return;
        }
        if full {
            state.messages.pop_front();
        }
        state.messages.push_back(message);
        state.total += 1;
    }
}

#[async_trait]
impl ConversationDirectory for InMemoryDirectory {
    async fn participants(&self, conversation_id: &str) -> HeraldResult<Vec<Participant>> {
        Ok(self
            .conversations
            .read()
            .await
            .get(conversation_id)
            .map(|c| c.participants.clone())
            .unwrap_or_default())
    }

    async fn display_name(&self, user_id: &str) -> HeraldResult<Option<String>> {
        Ok(self.names.read().await.get(user_id).cloned())
    }

    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> HeraldResult<Vec<ConversationMessage>> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(conversation_id)
            .map(|c| {
                let skip = c.messages.len().saturating_sub(limit);
                c.messages.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default())
    }

    async fn message_count(&self, conversation_id: &str) -> HeraldResult<u64> {
        Ok(self
            .conversations
            .read()
            .await
            .get(conversation_id)
            .map_or(0, |c| c.total))
    }
}
