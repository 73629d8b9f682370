//! Learned per-user notification preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How eagerly a user wants to be notified.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationRate {
    High,
    #[default]
    Medium,
    Low,
}

/// A weighted term learned from feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTerm {
    pub term: String,
    pub score: f64,
}

/// Per-user materialized view over the user's feedback history.
///
/// Only the profile learner writes it. It can always be rebuilt from the
/// feedback records alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotificationProfile {
    pub user_id: String,
    pub preferred_notification_rate: NotificationRate,
    /// Ranked terms from helpful decisions (at most 15).
    pub learned_keywords: Vec<String>,
    /// Ranked terms from unhelpful decisions (at most 15).
    pub suppressed_topics: Vec<String>,
    pub accuracy: f64,
    pub notify_accuracy: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
    pub total_feedback: u64,
    pub helpful_count: u64,
    pub not_helpful_count: u64,
    pub helpful_notified: u64,
    pub helpful_suppressed: u64,
    pub not_helpful_notified: u64,
    pub not_helpful_suppressed: u64,
    pub last_updated: DateTime<Utc>,
    /// Bumped on every write; part of the decision cache fingerprint.
    #[serde(default)]
    pub version: u64,
}

impl UserNotificationProfile {
    /// Profile of a user nothing has been learned about yet.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            preferred_notification_rate: NotificationRate::Medium,
            learned_keywords: Vec::new(),
            suppressed_topics: Vec::new(),
            accuracy: 0.0,
            notify_accuracy: 0.0,
            false_positive_rate: 0.0,
            false_negative_rate: 0.0,
            total_feedback: 0,
            helpful_count: 0,
            not_helpful_count: 0,
            helpful_notified: 0,
            helpful_suppressed: 0,
            not_helpful_notified: 0,
            not_helpful_suppressed: 0,
            last_updated: Utc::now(),
            version: 0,
        }
    }
}
