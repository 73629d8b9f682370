//! Periodic removal of expired cache entries and rate-limit counters.
//!
//! Expired entries are already invisible to readers; this only reclaims the
//! space they take.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, info, warn};

use crate::error::{HeraldError, HeraldResult};
use crate::traits::KvStore;

/// Interval between purges when none is configured (one hour).
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 60 * 60;

async fn purge(kv: Arc<dyn KvStore>) -> HeraldResult<usize> {
    tokio::task::spawn_blocking(move || kv.purge_expired())
        .await
        .map_err(|e| HeraldError::internal(format!("purge task failed: {}", e)))?
}

/// Scheduler for the key-value purge job.
pub struct PurgeScheduler {
    scheduler: JobScheduler,
    kv: Arc<dyn KvStore>,
    interval_secs: u64,
}

impl PurgeScheduler {
    /// Create a new scheduler. Call `start()` to begin periodic execution.
    pub async fn new(kv: Arc<dyn KvStore>, interval_secs: u64) -> Result<Self, JobSchedulerError> {
        Ok(Self {
            scheduler: JobScheduler::new().await?,
            kv,
            interval_secs: interval_secs.max(1),
        })
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        let kv = self.kv.clone();
        let job = Job::new_repeated_async(
            Duration::from_secs(self.interval_secs),
            move |_uuid, _lock| {
                let kv = kv.clone();
                Box::pin(async move {
                    match purge(kv).await {
                        Ok(removed) => debug!(removed, "Purged expired entries"),
                        Err(e) => warn!(error = %e, "Purge of expired entries failed"),
                    }
                })
            },
        )?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;

        info!(interval_secs = self.interval_secs, "Purge scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        info!("Shutting down purge scheduler");
        self.scheduler.shutdown().await
    }

    /// Purge now, outside of the schedule.
    pub async fn run_now(&self) -> HeraldResult<usize> {
        purge(self.kv.clone()).await
    }
}
