//! Read-only feedback analytics for a user's own history.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HeraldError, HeraldResult};
use crate::traits::FeedbackStore;
use crate::types::FeedbackRecord;

/// Number of reasons listed per pattern list.
pub const TOP_REASONS: usize = 5;

/// A decision reason and how often it was rated wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: u64,
}

/// Aggregated feedback of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub user_id: String,
    pub window_days: i64,
    pub total_notifications: u64,
    pub helpful_count: u64,
    pub not_helpful_count: u64,
    pub accuracy: f64,
    /// Reasons of notifications rated not helpful.
    pub common_false_positives: Vec<ReasonCount>,
    /// Reasons of suppressions rated helpful, meaning the user wanted the alert.
    pub common_false_negatives: Vec<ReasonCount>,
}

/// Most frequent reasons, count descending then reason ascending.
fn top_reasons<'a>(records: impl Iterator<Item = &'a FeedbackRecord>) -> Vec<ReasonCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for record in records {
        *counts.entry(record.decision.reason.as_str()).or_default() += 1;
    }
    let mut reasons: Vec<ReasonCount> = counts
        .into_iter()
        .map(|(reason, count)| ReasonCount {
            reason: reason.to_string(),
            count,
        })
        .collect();
    reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    reasons.truncate(TOP_REASONS);
    reasons
}

/// Build a report from already-fetched records.
pub fn summarize(user_id: &str, window_days: i64, records: &[FeedbackRecord]) -> AnalyticsReport {
    let helpful = records.iter().filter(|r| r.is_helpful()).count() as u64;
    let total = records.len() as u64;
    AnalyticsReport {
        user_id: user_id.to_string(),
        window_days,
        total_notifications: total,
        helpful_count: helpful,
        not_helpful_count: total - helpful,
        accuracy: if total == 0 {
            0.0
        } else {
            helpful as f64 / total as f64
        },
        common_false_positives: top_reasons(
            records.iter().filter(|r| !r.is_helpful() && r.was_notified()),
        ),
        common_false_negatives: top_reasons(
            records.iter().filter(|r| r.is_helpful() && !r.was_notified()),
        ),
    }
}

/// Serves analytics reports.
#[derive(Clone)]
pub struct AnalyticsReporter {
    feedback: Arc<dyn FeedbackStore>,
    window_days: i64,
}

impl AnalyticsReporter {
    pub fn new(feedback: Arc<dyn FeedbackStore>, window_days: i64) -> Self {
        Self {
            feedback,
            window_days: window_days.max(1),
        }
    }

    /// Report on `subject`. Only the subject may ask.
    pub fn report(&self, caller: &str, subject: &str) -> HeraldResult<AnalyticsReport> {
        self.report_at(caller, subject, Utc::now())
    }

    pub fn report_at(
        &self,
        caller: &str,
        subject: &str,
        now: DateTime<Utc>,
    ) -> HeraldResult<AnalyticsReport> {
        if subject.trim().is_empty() {
            return Err(HeraldError::missing_field("userId"));
        }
        if caller != subject {
            return Err(HeraldError::not_owner(
                "Analytics are only available for your own account",
            ));
        }
        let since = now - Duration::days(self.window_days);
        let records = self.feedback.list_for_user_since(subject, since)?;
        debug!(user_id = subject, records = records.len(), "Building analytics report");
        Ok(summarize(subject, self.window_days, &records))
    }
}
