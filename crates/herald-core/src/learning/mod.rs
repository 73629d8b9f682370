//! Profile learner.
//!
//! Recomputes per-user notification profiles from the trailing feedback
//! window. The weekly batch and the on-demand recompute share
//! [`ProfileLearner::recompute_user`], which in turn is a thin wrapper around
//! the pure [`aggregate`] function.

mod aggregation;
mod keywords;
mod scheduler;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use aggregation::{aggregate, preferred_rate, FeedbackCounts};
pub use keywords::{tokenize, TermCounter, HELPFUL_WEIGHT, MAX_TERMS, NOT_HELPFUL_WEIGHT};
pub use scheduler::{LearningScheduler, SchedulerConfig};

use crate::config::LearningConfig;
use crate::error::{HeraldError, HeraldResult};
use crate::traits::{FeedbackStore, ProfileStore};
use crate::types::UserNotificationProfile;

/// Result of recomputing one user.
#[derive(Debug, Clone, PartialEq)]
pub enum RecomputeOutcome {
    /// Profile written; carries the stored version.
    Updated(UserNotificationProfile),
    /// No feedback in the window, nothing written.
    NoFeedback,
}

/// A user the batch could not recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub user_id: String,
    pub error: String,
}

/// Summary of one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub users_total: usize,
    pub updated: usize,
    pub no_feedback: usize,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Aggregates feedback into stored profiles.
#[derive(Clone)]
pub struct ProfileLearner {
    feedback: Arc<dyn FeedbackStore>,
    profiles: Arc<dyn ProfileStore>,
    window_days: i64,
    max_concurrent_users: usize,
}

impl ProfileLearner {
    pub fn new(
        feedback: Arc<dyn FeedbackStore>,
        profiles: Arc<dyn ProfileStore>,
        config: &LearningConfig,
    ) -> Self {
        Self {
            feedback,
            profiles,
            window_days: config.window_days.max(1),
            max_concurrent_users: config.max_concurrent_users.max(1),
        }
    }

    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.window_days)
    }

    /// Recompute and store one user's profile.
    pub fn recompute_user(&self, user_id: &str) -> HeraldResult<RecomputeOutcome> {
        if user_id.trim().is_empty() {
            return Err(HeraldError::missing_field("userId"));
        }
        let now = Utc::now();
        let records = self
            .feedback
            .list_for_user_since(user_id, self.window_start(now))?;
        if records.is_empty() {
            debug!(user_id, "No feedback in window, profile left unchanged");
            return Ok(RecomputeOutcome::NoFeedback);
        }

        let profile = aggregate(user_id, &records, now);
        let stored = self.profiles.merge_upsert(profile)?;
        info!(
            user_id,
            version = stored.version,
            total_feedback = stored.total_feedback,
            rate = %stored.preferred_notification_rate,
            "Profile recomputed"
        );
        Ok(RecomputeOutcome::Updated(stored))
    }

    /// Recompute every user with feedback in the window.
    ///
    /// A failing user is recorded in the report and the batch moves on.
    pub async fn run_batch(&self) -> HeraldResult<BatchReport> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let users = self
            .feedback
            .users_with_feedback_since(self.window_start(started_at))?;
        info!(run_id = %run_id, users = users.len(), "Starting profile batch");

        let results = stream::iter(users.iter().cloned())
            .map(|user_id| {
                let learner = self.clone();
                async move {
                    let uid = user_id.clone();
                    let result = tokio::task::spawn_blocking(move || learner.recompute_user(&uid))
                        .await
                        .unwrap_or_else(|e| {
                            Err(HeraldError::internal(format!("recompute task failed: {}", e)))
                        });
                    (user_id, result)
                }
            })
            .buffer_unordered(self.max_concurrent_users)
            .collect::<Vec<_>>()
            .await;

        let mut report = BatchReport {
            run_id,
            started_at,
            finished_at: started_at,
            users_total: users.len(),
            updated: 0,
            no_feedback: 0,
            failed: Vec::new(),
        };
        for (user_id, result) in results {
            match result {
                Ok(RecomputeOutcome::Updated(_)) => report.updated += 1,
                Ok(RecomputeOutcome::NoFeedback) => report.no_feedback += 1,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Profile recompute failed, skipping user");
                    report.failed.push(BatchFailure {
                        user_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        report.failed.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        report.finished_at = Utc::now();

        info!(
            run_id = %report.run_id,
            users = report.users_total,
            updated = report.updated,
            failed = report.failed.len(),
            duration_ms = report.duration_ms(),
            "Profile batch complete"
        );
        Ok(report)
    }
}
