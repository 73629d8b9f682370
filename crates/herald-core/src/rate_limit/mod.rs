//! Per-user, per-feature daily quotas.
//!
//! One counter per `(user, feature, UTC date)`. A new day means a new key, so
//! counters never need explicit resets; the stored counter expires at the
//! following UTC midnight.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{HeraldError, HeraldResult};
use crate::traits::KvStore;
use crate::types::FeatureType;

/// A counter value observed after an increment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitCounter {
    pub user_id: String,
    pub feature_type: FeatureType,
    pub window_date: NaiveDate,
    pub count: u64,
}

/// Storage key of a counter.
pub fn counter_key(user_id: &str, feature: FeatureType, date: NaiveDate) -> String {
    format!("ratelimit:{}:{}:{}", user_id, feature, date.format("%Y-%m-%d"))
}

fn next_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    (date + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// Daily quota gate.
#[derive(Clone)]
pub struct RateLimiter {
    kv: Arc<dyn KvStore>,
}

impl RateLimiter {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Count one request and reject it if it exceeds `daily_limit`.
    ///
    /// The increment happens before the comparison, so concurrent callers on
    /// the same key each see a distinct count and at most `daily_limit` of
    /// them are accepted.
    pub fn check_and_increment(
        &self,
        user_id: &str,
        feature: FeatureType,
        daily_limit: u64,
    ) -> HeraldResult<RateLimitCounter> {
        self.check_and_increment_at(user_id, feature, daily_limit, Utc::now())
    }

    /// [`check_and_increment`](Self::check_and_increment) with an explicit clock.
    pub fn check_and_increment_at(
        &self,
        user_id: &str,
        feature: FeatureType,
        daily_limit: u64,
        now: DateTime<Utc>,
    ) -> HeraldResult<RateLimitCounter> {
        if user_id.trim().is_empty() {
            return Err(HeraldError::missing_field("userId"));
        }
        let window_date = now.date_naive();
        let key = counter_key(user_id, feature, window_date);
        let count = self.kv.atomic_increment(&key, next_midnight(window_date))?;

        if count > daily_limit {
            warn!(user_id, feature = %feature, count, daily_limit, "Daily quota exceeded");
            return Err(HeraldError::quota_exceeded(
                format!("Daily limit for {} reached", feature),
                count,
                daily_limit,
            ));
        }

        debug!(user_id, feature = %feature, count, daily_limit, "Quota check passed");
        Ok(RateLimitCounter {
            user_id: user_id.to_string(),
            feature_type: feature,
            window_date,
            count,
        })
    }

    /// Current count without incrementing.
    pub fn usage(&self, user_id: &str, feature: FeatureType) -> HeraldResult<u64> {
        let key = counter_key(user_id, feature, Utc::now().date_naive());
        Ok(self
            .kv
            .get(&key)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn test_limit_th_call_accepted_next_rejected() {
        let limiter = limiter();
        for i in 1..=3 {
            let counter = limiter
                .check_and_increment("u1", FeatureType::SmartReply, 3)
                .unwrap();
            assert_eq!(counter.count, i);
        }
        let err = limiter
            .check_and_increment("u1", FeatureType::SmartReply, 3)
            .unwrap_err();
        assert!(matches!(
            err,
            HeraldError::QuotaExceeded {
                current_usage: Some(4),
                limit: Some(3),
                ..
            }
        ));
    }

    #[test]
    fn test_counters_are_per_feature_and_user() {
        let limiter = limiter();
        limiter
            .check_and_increment("u1", FeatureType::SmartReply, 1)
            .unwrap();
        assert!(limiter
            .check_and_increment("u1", FeatureType::ActionItems, 1)
            .is_ok());
        assert!(limiter
            .check_and_increment("u2", FeatureType::SmartReply, 1)
            .is_ok());
        assert_eq!(limiter.usage("u1", FeatureType::SmartReply).unwrap(), 1);
    }

    #[test]
    fn test_new_day_starts_new_window() {
        let limiter = limiter();
        let day1 = Utc.with_ymd_and_hms(2030, 3, 1, 23, 59, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2030, 3, 2, 0, 1, 0).unwrap();

        limiter
            .check_and_increment_at("u1", FeatureType::DocumentAnalysis, 1, day1)
            .unwrap();
        assert!(limiter
            .check_and_increment_at("u1", FeatureType::DocumentAnalysis, 1, day1)
            .is_err());
        let counter = limiter
            .check_and_increment_at("u1", FeatureType::DocumentAnalysis, 1, day2)
            .unwrap();
        assert_eq!(counter.count, 1);
        assert_eq!(counter.window_date, day2.date_naive());
    }

    #[test]
    fn test_concurrent_burst_never_exceeds_limit() {
        let limiter = limiter();
        let accepted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let limiter = limiter.clone();
                    s.spawn(move || {
                        (0..10)
                            .filter(|_| {
                                limiter
                                    .check_and_increment("u1", FeatureType::SmartReply, 50)
                                    .is_ok()
                            })
                            .count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(accepted, 50);
    }

    #[test]
    fn test_key_format() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 9).unwrap();
        assert_eq!(
            counter_key("u1", FeatureType::NotificationDecision, date),
            "ratelimit:u1:notification_decision:2030-01-09"
        );
    }
}
