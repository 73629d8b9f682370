//! Staleness-aware result cache over a [`KvStore`].
//!
//! An entry is usable only while it is unexpired *and* not stale. Staleness
//! is measured in new conversation items since caching and in entry age, with
//! thresholds taken from the feature's [`CachePolicy`]. Entries are never
//! mutated; a recomputed result replaces the previous one wholesale.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::HeraldResult;
use crate::traits::KvStore;
use crate::types::{CachePolicy, FeatureType};

/// One stored result with its staleness metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub serialized_result: String,
    pub feature_type: FeatureType,
    pub context_id: String,
    pub item_count_at_cache: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Why a lookup did not produce a usable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Absent,
    Expired,
    /// Too many new items or too old.
    Stale,
    /// Entry or payload could not be decoded.
    Corrupt,
}

/// Outcome of checking an entry against a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Usability {
    Usable { items_since: u64 },
    Unusable(MissReason),
}

impl CacheEntry {
    /// Check whether this entry may be served.
    pub fn usability(
        &self,
        now: DateTime<Utc>,
        current_item_count: u64,
        policy: &CachePolicy,
    ) -> Usability {
        if now >= self.expires_at {
            return Usability::Unusable(MissReason::Expired);
        }
        let items_since = current_item_count.saturating_sub(self.item_count_at_cache);
        if let Some(threshold) = policy.stale_item_threshold {
            if items_since >= threshold {
                return Usability::Unusable(MissReason::Stale);
            }
        }
        if let Some(stale_secs) = policy.stale_time_secs {
            if now - self.created_at >= Duration::seconds(stale_secs as i64) {
                return Usability::Unusable(MissReason::Stale);
            }
        }
        Usability::Usable { items_since }
    }
}

/// A usable cached value.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult<T> {
    pub value: T,
    /// Always true; carried for callers that forward it to clients.
    pub cached: bool,
    /// Conversation items produced since the value was cached.
    pub new_items_since: u64,
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit(CachedResult<T>),
    Miss(MissReason),
}

impl<T> CacheLookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

/// Build a cache key from a feature and its identifying parts.
///
/// The parts are hashed so keys stay short and free of user-controlled
/// separators.
pub fn fingerprint(feature: FeatureType, parts: &[&str]) -> String {
    let joined = parts.join("\u{1f}");
    format!("cache:{}:{:x}", feature, md5::compute(joined.as_bytes()))
}

/// Cache store shared by every feature.
#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KvStore>,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Look up a value, applying the policy's expiry and staleness rules.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        current_item_count: u64,
        policy: &CachePolicy,
    ) -> HeraldResult<CacheLookup<T>> {
        self.get_at(key, current_item_count, policy, Utc::now())
    }

    /// [`get`](Self::get) with an explicit clock.
    pub fn get_at<T: DeserializeOwned>(
        &self,
        key: &str,
        current_item_count: u64,
        policy: &CachePolicy,
        now: DateTime<Utc>,
    ) -> HeraldResult<CacheLookup<T>> {
        let Some(raw) = self.kv.get(key)? else {
            return Ok(CacheLookup::Miss(MissReason::Absent));
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Discarding corrupt cache entry");
                return Ok(CacheLookup::Miss(MissReason::Corrupt));
            }
        };

        match entry.usability(now, current_item_count, policy) {
            Usability::Usable { items_since } => {
                match serde_json::from_str::<T>(&entry.serialized_result) {
                    Ok(value) => Ok(CacheLookup::Hit(CachedResult {
                        value,
                        cached: true,
                        new_items_since: items_since,
                    })),
                    Err(e) => {
                        warn!(key, error = %e, "Discarding undecodable cached payload");
                        Ok(CacheLookup::Miss(MissReason::Corrupt))
                    }
                }
            }
            Usability::Unusable(reason) => {
                debug!(key, ?reason, "Cache entry not usable");
                Ok(CacheLookup::Miss(reason))
            }
        }
    }

    /// Store a value, replacing whatever was cached under the key.
    pub fn put<T: Serialize>(
        &self,
        key: &str,
        feature: FeatureType,
        context_id: &str,
        item_count: u64,
        policy: &CachePolicy,
        value: &T,
    ) -> HeraldResult<CacheEntry> {
        self.put_at(key, feature, context_id, item_count, policy, value, Utc::now())
    }

    /// [`put`](Self::put) with an explicit clock.
    #[allow(clippy::too_many_arguments)]
    pub fn put_at<T: Serialize>(
        &self,
        key: &str,
        feature: FeatureType,
        context_id: &str,
        item_count: u64,
        policy: &CachePolicy,
        value: &T,
        now: DateTime<Utc>,
    ) -> HeraldResult<CacheEntry> {
        let entry = CacheEntry {
            key: key.to_string(),
            serialized_result: serde_json::to_string(value)?,
            feature_type: feature,
            context_id: context_id.to_string(),
            item_count_at_cache: item_count,
            created_at: now,
            expires_at: now + Duration::seconds(policy.ttl_secs as i64),
        };
        self.kv
            .put(key, serde_json::to_string(&entry)?, Some(entry.expires_at))?;
        Ok(entry)
    }

    /// Drop an entry.
    pub fn invalidate(&self, key: &str) -> HeraldResult<bool> {
        self.kv.delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn summary_policy() -> CachePolicy {
        FeatureType::ConversationSummary.default_cache_policy()
    }

    fn store() -> CacheStore {
        CacheStore::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn test_fresh_entry_is_a_hit() {
        let cache = store();
        let policy = summary_policy();
        cache
            .put("k", FeatureType::ConversationSummary, "c1", 20, &policy, &"summary")
            .unwrap();

        match cache.get::<String>("k", 23, &policy).unwrap() {
            CacheLookup::Hit(hit) => {
                assert_eq!(hit.value, "summary");
                assert!(hit.cached);
                assert_eq!(hit.new_items_since, 3);
            }
            miss => panic!("expected hit, got {:?}", miss),
        }
    }

    #[test]
    fn test_threshold_new_items_make_entry_stale() {
        let cache = store();
        let policy = summary_policy();
        cache
            .put("k", FeatureType::ConversationSummary, "c1", 20, &policy, &"summary")
            .unwrap();

        assert!(cache.get::<String>("k", 29, &policy).unwrap().is_hit());
        assert_eq!(
            cache.get::<String>("k", 30, &policy).unwrap(),
            CacheLookup::Miss(MissReason::Stale)
        );
    }

    #[test]
    fn test_age_makes_entry_stale_before_expiry() {
        let cache = store();
        // TTL longer than the staleness window
        let policy = FeatureType::ActionItems.default_cache_policy();
        let created = Utc::now() - Duration::hours(25);
        cache
            .put_at("k", FeatureType::ActionItems, "c1", 0, &policy, &vec!["a"], created)
            .unwrap();

        assert_eq!(
            cache.get::<Vec<String>>("k", 0, &policy).unwrap(),
            CacheLookup::Miss(MissReason::Stale)
        );
    }

    #[test]
    fn test_expiry_is_checked_independently() {
        let entry = CacheEntry {
            key: "k".into(),
            serialized_result: "1".into(),
            feature_type: FeatureType::NotificationDecision,
            context_id: "c1".into(),
            item_count_at_cache: 0,
            created_at: Utc::now() - Duration::minutes(10),
            expires_at: Utc::now() - Duration::minutes(5),
        };
        let policy = FeatureType::NotificationDecision.default_cache_policy();
        assert_eq!(
            entry.usability(Utc::now(), 0, &policy),
            Usability::Unusable(MissReason::Expired)
        );
    }

    #[test]
    fn test_corrupt_payload_is_a_miss() {
        let kv = Arc::new(InMemoryStore::new());
        kv.put("k", "{not json".into(), None).unwrap();
        let cache = CacheStore::new(kv);
        let policy = summary_policy();
        assert_eq!(
            cache.get::<String>("k", 0, &policy).unwrap(),
            CacheLookup::Miss(MissReason::Corrupt)
        );
    }

    #[test]
    fn test_put_overwrites() {
        let cache = store();
        let policy = summary_policy();
        cache
            .put("k", FeatureType::ConversationSummary, "c1", 0, &policy, &"old")
            .unwrap();
        cache
            .put("k", FeatureType::ConversationSummary, "c1", 15, &policy, &"new")
            .unwrap();
        match cache.get::<String>("k", 15, &policy).unwrap() {
            CacheLookup::Hit(hit) => {
                assert_eq!(hit.value, "new");
                assert_eq!(hit.new_items_since, 0);
            }
            miss => panic!("expected hit, got {:?}", miss),
        }
    }

    #[test]
    fn test_fingerprint_depends_on_every_part() {
        let a = fingerprint(FeatureType::NotificationDecision, &["c1", "m1", "alice", "1"]);
        let b = fingerprint(FeatureType::NotificationDecision, &["c1", "m1", "alice", "2"]);
        let c = fingerprint(FeatureType::SmartReply, &["c1", "m1", "alice", "1"]);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("cache:notification_decision:"));
    }
}
