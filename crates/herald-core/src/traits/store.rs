//! Storage traits.
//!
//! The cache and rate limiter only need a minimal key-value interface with an
//! atomic counter primitive. Feedback and profiles get their own narrow
//! traits. All of them are implemented by the in-memory store (tests) and the
//! SQLite store (deployment).

use chrono::{DateTime, Utc};

use crate::error::HeraldResult;
use crate::types::{FeedbackRecord, UserNotificationProfile};

/// Minimal shared key-value store.
pub trait KvStore: Send + Sync {
    /// Get a value. Entries past their expiry are reported as absent.
    fn get(&self, key: &str) -> HeraldResult<Option<String>>;

    /// Store a value, replacing any previous one (last write wins).
    fn put(&self, key: &str, value: String, expires_at: Option<DateTime<Utc>>) -> HeraldResult<()>;

    /// Remove a value. Returns whether something was removed.
    fn delete(&self, key: &str) -> HeraldResult<bool>;

    /// Atomically add one to the counter at `key` and return the new value.
    ///
    /// A missing or expired counter starts from zero. Concurrent callers on
    /// the same key each observe a distinct value.
    fn atomic_increment(&self, key: &str, expires_at: Option<DateTime<Utc>>) -> HeraldResult<u64>;

    /// Drop every entry past its expiry. Returns how many were removed.
    fn purge_expired(&self) -> HeraldResult<usize>;
}

/// Persistence for feedback records.
pub trait FeedbackStore: Send + Sync {
    /// Insert or replace the record with the same identity. Returns its id.
    fn upsert(&self, record: &FeedbackRecord) -> HeraldResult<String>;

    /// Get a record by id.
    fn get(&self, id: &str) -> HeraldResult<Option<FeedbackRecord>>;

    /// All records of a user with `timestamp >= since`, newest first.
    fn list_for_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> HeraldResult<Vec<FeedbackRecord>>;

    /// Distinct users with at least one record since `since`.
    fn users_with_feedback_since(&self, since: DateTime<Utc>) -> HeraldResult<Vec<String>>;
}

/// Persistence for learned profiles.
pub trait ProfileStore: Send + Sync {
    /// Get a user's profile.
    fn get(&self, user_id: &str) -> HeraldResult<Option<UserNotificationProfile>>;

    /// Merge the profile into the stored document and bump its version.
    ///
    /// Returns the profile as stored.
    fn merge_upsert(&self, profile: UserNotificationProfile)
        -> HeraldResult<UserNotificationProfile>;
}
