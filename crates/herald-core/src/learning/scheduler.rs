//! Periodic scheduler for profile learning.
//!
//! Uses tokio-cron-scheduler to run the profile batch at a fixed interval,
//! weekly by default.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, error, info};

use super::{BatchReport, ProfileLearner};
use crate::error::HeraldResult;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Configuration for the learning scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between batch runs in days (default: 7)
    pub interval_days: u64,
    /// Whether to run a batch immediately on start (default: false)
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_days: 7,
            run_on_start: false,
        }
    }
}

impl SchedulerConfig {
    /// Create config with custom interval.
    pub fn with_interval(interval_days: u64) -> Self {
        Self {
            interval_days: interval_days.max(1),
            ..Default::default()
        }
    }

    /// Enable running a batch immediately on start.
    pub fn with_run_on_start(mut self) -> Self {
        self.run_on_start = true;
        self
    }
}

/// Scheduler for the periodic profile batch.
pub struct LearningScheduler {
    scheduler: JobScheduler,
    learner: Arc<ProfileLearner>,
    config: SchedulerConfig,
}

impl LearningScheduler {
    /// Create a new scheduler. Call `start()` to begin periodic execution.
    pub async fn new(
        learner: Arc<ProfileLearner>,
        config: SchedulerConfig,
    ) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            learner,
            config,
        })
    }

    /// Get the scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        let learner = self.learner.clone();
        let interval_secs = self.config.interval_days * SECS_PER_DAY;

        let job = Job::new_repeated_async(
            std::time::Duration::from_secs(interval_secs),
            move |_uuid, _lock| {
                let learner = learner.clone();
                Box::pin(async move {
                    debug!("Starting scheduled profile batch");
                    if let Err(e) = learner.run_batch().await {
                        error!(error = %e, "Scheduled profile batch failed");
                    }
                })
            },
        )?;

        self.scheduler.add(job).await?;

        if self.config.run_on_start {
            debug!("Running initial profile batch on start");
            if let Err(e) = self.learner.run_batch().await {
                error!(error = %e, "Initial profile batch failed");
            }
        }

        self.scheduler.start().await?;

        info!(
            interval_days = self.config.interval_days,
            "Learning scheduler started"
        );

        Ok(())
    }

    /// Stop the scheduler gracefully.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        info!("Shutting down learning scheduler");
        self.scheduler.shutdown().await
    }

    /// Run a batch now, outside of the schedule.
    pub async fn run_now(&self) -> HeraldResult<BatchReport> {
        self.learner.run_batch().await
    }

    /// Get the underlying learner.
    pub fn learner(&self) -> &Arc<ProfileLearner> {
        &self.learner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LearningConfig;
    use crate::store::InMemoryStore;

    #[test]
    fn test_scheduler_config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval_days, 7);
        assert!(!config.run_on_start);
    }

    #[test]
    fn test_scheduler_config_interval_minimum() {
        assert_eq!(SchedulerConfig::with_interval(0).interval_days, 1);
        assert!(SchedulerConfig::with_interval(3).with_run_on_start().run_on_start);
    }

    #[tokio::test]
    async fn test_run_now_on_empty_store() {
        let store = Arc::new(InMemoryStore::new());
        let learner = Arc::new(ProfileLearner::new(
            store.clone(),
            store,
            &LearningConfig::default(),
        ));
        let scheduler = LearningScheduler::new(learner, SchedulerConfig::default())
            .await
            .unwrap();
        let report = scheduler.run_now().await.unwrap();
        assert_eq!(report.users_total, 0);
        assert!(report.failed.is_empty());
    }
}
