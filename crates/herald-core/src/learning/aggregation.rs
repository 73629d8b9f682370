//! Aggregation of a user's feedback into a profile.
//!
//! Pure: the same records and clock always give the same profile. Both the
//! scheduled batch and the on-demand recompute go through [`aggregate`].

use chrono::{DateTime, Utc};

use super::keywords::{TermCounter, HELPFUL_WEIGHT, NOT_HELPFUL_WEIGHT};
use crate::classifier::Rule;
use crate::types::{FeedbackRecord, NotificationRate, UserNotificationProfile};

/// Outcome counts over a feedback set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackCounts {
    pub total: u64,
    pub helpful: u64,
    pub not_helpful: u64,
    pub helpful_notified: u64,
    pub helpful_suppressed: u64,
    pub not_helpful_notified: u64,
    pub not_helpful_suppressed: u64,
}

impl FeedbackCounts {
    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.total += 1;
            match (record.is_helpful(), record.was_notified()) {
                (true, true) => counts.helpful_notified += 1,
                (true, false) => counts.helpful_suppressed += 1,
                (false, true) => counts.not_helpful_notified += 1,
                (false, false) => counts.not_helpful_suppressed += 1,
            }
        }
        counts.helpful = counts.helpful_notified + counts.helpful_suppressed;
        counts.not_helpful = counts.not_helpful_notified + counts.not_helpful_suppressed;
        counts
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.helpful, self.total)
    }

    /// Share of correct outcomes: helpful alerts plus correctly skipped noise.
    pub fn notify_accuracy(&self) -> f64 {
        ratio(self.helpful_notified + self.not_helpful_suppressed, self.total)
    }

    pub fn false_positive_rate(&self) -> f64 {
        ratio(
            self.not_helpful_notified,
            self.not_helpful_notified + self.helpful_notified,
        )
    }

    pub fn false_negative_rate(&self) -> f64 {
        ratio(
            self.helpful_suppressed,
            self.helpful_suppressed + self.not_helpful_suppressed,
        )
    }
}

/// Zero when the denominator is zero.
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Preferred notification rate; the first matching rule wins.
pub fn preferred_rate(accuracy: f64, false_positive_rate: f64, false_negative_rate: f64) -> NotificationRate {
    if accuracy >= 0.8 && false_positive_rate < 0.2 {
        NotificationRate::High
    } else if false_positive_rate > 0.4 {
        NotificationRate::Low
    } else if false_negative_rate > 0.3 {
        NotificationRate::High
    } else {
        NotificationRate::Medium
    }
}

/// Message text of a record: the original text when it was supplied,
/// otherwise the notification preview without its `"{sender}: "` prefix.
fn record_text(record: &FeedbackRecord) -> Option<&str> {
    let text = match record.message_text.as_deref() {
        Some(text) => text,
        None => {
            let preview = record.decision.notification_text.as_str();
            preview.split_once(": ").map_or(preview, |(_, rest)| rest)
        }
    };
    Some(text).filter(|t| !t.trim().is_empty())
}

/// Reason of a record when inference wrote it. Rule reasons are fixed
/// templates and say nothing about the user.
fn record_reason(record: &FeedbackRecord) -> Option<&str> {
    let reason = record.decision.reason.as_str();
    Some(reason).filter(|r| !r.is_empty() && !Rule::is_rule_reason(r))
}

/// Build a user's profile from their feedback.
///
/// The returned profile has version 0; the store assigns the real version on
/// write.
pub fn aggregate(
    user_id: &str,
    records: &[FeedbackRecord],
    now: DateTime<Utc>,
) -> UserNotificationProfile {
    let counts = FeedbackCounts::from_records(records);

    let mut helpful_terms = TermCounter::new(HELPFUL_WEIGHT);
    let mut unhelpful_terms = TermCounter::new(NOT_HELPFUL_WEIGHT);
    for record in records {
        let counter = if record.is_helpful() {
            &mut helpful_terms
        } else {
            &mut unhelpful_terms
        };
        if let Some(reason) = record_reason(record) {
            counter.add_reason(reason);
        }
        if let Some(text) = record_text(record) {
            counter.add_text(text);
        }
    }

    let accuracy = counts.accuracy();
    let false_positive_rate = counts.false_positive_rate();
    let false_negative_rate = counts.false_negative_rate();

    UserNotificationProfile {
        user_id: user_id.to_string(),
        preferred_notification_rate: preferred_rate(
            accuracy,
            false_positive_rate,
            false_negative_rate,
        ),
        learned_keywords: helpful_terms.top_terms(),
        suppressed_topics: unhelpful_terms.top_terms(),
        accuracy,
        notify_accuracy: counts.notify_accuracy(),
        false_positive_rate,
        false_negative_rate,
        total_feedback: counts.total,
        helpful_count: counts.helpful,
        not_helpful_count: counts.not_helpful,
        helpful_notified: counts.helpful_notified,
        helpful_suppressed: counts.helpful_suppressed,
        not_helpful_notified: counts.not_helpful_notified,
        not_helpful_suppressed: counts.not_helpful_suppressed,
        last_updated: now,
        version: 0,
    }
}
