//! Features that produce expensive results and their default policies.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A feature producing cacheable, rate-limited results.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureType {
    /// Per-recipient notify / skip decisions.
    NotificationDecision,
    /// Suggested quick replies.
    SmartReply,
    /// Rolling summary of a conversation.
    ConversationSummary,
    /// Action items extracted from a conversation.
    ActionItems,
    /// Analysis of an uploaded document.
    DocumentAnalysis,
}

/// Expiry and staleness rules for one feature's cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Absolute lifetime of an entry in seconds.
    pub ttl_secs: u64,
    /// Entry is stale once this many new items arrived since caching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_item_threshold: Option<u64>,
    /// Entry is stale once it is this old, even if not yet expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_time_secs: Option<u64>,
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

impl FeatureType {
    /// Default cache policy for this feature.
    pub fn default_cache_policy(&self) -> CachePolicy {
        match self {
            FeatureType::NotificationDecision | FeatureType::SmartReply => CachePolicy {
                ttl_secs: 5 * MINUTE,
                stale_item_threshold: None,
                stale_time_secs: None,
            },
            FeatureType::ConversationSummary => CachePolicy {
                ttl_secs: DAY,
                stale_item_threshold: Some(10),
                stale_time_secs: Some(DAY),
            },
            FeatureType::ActionItems => CachePolicy {
                ttl_secs: 7 * DAY,
                stale_item_threshold: Some(10),
                stale_time_secs: Some(DAY),
            },
            FeatureType::DocumentAnalysis => CachePolicy {
                ttl_secs: 30 * DAY,
                stale_item_threshold: None,
                stale_time_secs: None,
            },
        }
    }

    /// Default number of requests a user may make per UTC day.
    pub fn default_daily_limit(&self) -> u64 {
        match self {
            FeatureType::NotificationDecision => 500,
            FeatureType::SmartReply => 100,
            FeatureType::ConversationSummary | FeatureType::ActionItems => 50,
            FeatureType::DocumentAnalysis => 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_feature_names_are_snake_case() {
        assert_eq!(FeatureType::NotificationDecision.to_string(), "notification_decision");
        assert_eq!(
            "conversation_summary".parse::<FeatureType>().unwrap(),
            FeatureType::ConversationSummary
        );
    }

    #[test]
    fn test_summary_policy_matches_staleness_defaults() {
        let policy = FeatureType::ConversationSummary.default_cache_policy();
        assert_eq!(policy.stale_item_threshold, Some(10));
        assert_eq!(policy.stale_time_secs, Some(24 * 3600));
    }

    #[test]
    fn test_every_feature_has_positive_limits() {
        for feature in FeatureType::iter() {
            assert!(feature.default_daily_limit() > 0);
            assert!(feature.default_cache_policy().ttl_secs > 0);
        }
    }
}
