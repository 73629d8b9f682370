//! Background runtime for the profile learner and store maintenance.
//!
//! Owns the lifecycle of the [`LearningScheduler`] and the [`PurgeScheduler`]:
//! unified startup, manual runs and graceful shutdown.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::LearningConfig;
use crate::error::{HeraldError, HeraldResult};
use crate::learning::{BatchReport, LearningScheduler, ProfileLearner, SchedulerConfig};
use crate::store::{PurgeScheduler, DEFAULT_PURGE_INTERVAL_SECS};
use crate::traits::KvStore;

/// Configuration for the BackgroundRuntime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Interval between learning runs in days (default: 7).
    pub learning_interval_days: u64,
    /// Whether to run a batch immediately on start (default: false).
    pub learning_run_on_start: bool,
    /// Whether to enable the learning scheduler (default: true).
    pub enable_learning: bool,
    /// Seconds between purges of expired key-value entries (default: 3600).
    pub purge_interval_secs: u64,
    /// Whether to enable the purge scheduler (default: true).
    pub enable_purge: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            learning_interval_days: 7,
            learning_run_on_start: false,
            enable_learning: true,
            purge_interval_secs: DEFAULT_PURGE_INTERVAL_SECS,
            enable_purge: true,
        }
    }
}

impl RuntimeConfig {
    /// Set the learning interval.
    pub fn with_learning_interval(mut self, days: u64) -> Self {
        self.learning_interval_days = days.max(1);
        self
    }

    /// Enable running a batch immediately on start.
    pub fn with_run_on_start(mut self) -> Self {
        self.learning_run_on_start = true;
        self
    }

    /// Disable the learning scheduler.
    pub fn without_learning(mut self) -> Self {
        self.enable_learning = false;
        self
    }

    /// Set the purge interval.
    pub fn with_purge_interval(mut self, secs: u64) -> Self {
        self.purge_interval_secs = secs.max(1);
        self
    }

    /// Disable the purge scheduler.
    pub fn without_purge(mut self) -> Self {
        self.enable_purge = false;
        self
    }

    /// Take interval and start behavior from the learner's config section.
    pub fn from_learning(learning: &LearningConfig) -> Self {
        Self {
            learning_interval_days: learning.interval_days.max(1),
            learning_run_on_start: learning.run_on_start,
            ..Self::default()
        }
    }

    /// Create config from environment variables.
    ///
    /// Reads:
    /// - `HERALD_LEARNING_INTERVAL_DAYS` (default: 7)
    /// - `HERALD_LEARNING_RUN_ON_START` (default: false)
    /// - `HERALD_DISABLE_LEARNING` (default: unset)
    /// - `HERALD_PURGE_INTERVAL_SECS` (default: 3600)
    /// - `HERALD_DISABLE_PURGE` (default: unset)
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Override fields with whatever the environment sets.
    pub fn apply_env(mut self) -> Self {
        if let Ok(interval) = std::env::var("HERALD_LEARNING_INTERVAL_DAYS") {
            if let Ok(days) = interval.parse::<u64>() {
                self.learning_interval_days = days.max(1);
            }
        }

        if std::env::var("HERALD_LEARNING_RUN_ON_START").is_ok() {
            self.learning_run_on_start = true;
        }

        if std::env::var("HERALD_DISABLE_LEARNING").is_ok() {
            self.enable_learning = false;
        }

        if let Ok(interval) = std::env::var("HERALD_PURGE_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse::<u64>() {
                self.purge_interval_secs = secs.max(1);
            }
        }

        if std::env::var("HERALD_DISABLE_PURGE").is_ok() {
            self.enable_purge = false;
        }

        self
    }
}

/// Background runtime managing the learning and purge schedulers.
///
/// # Example
///
/// ```ignore
/// use herald_core::{BackgroundRuntime, RuntimeConfig};
///
/// let mut runtime = BackgroundRuntime::new(RuntimeConfig::from_env(), learner, store).await?;
/// runtime.start().await?;
/// // ... application runs ...
/// runtime.shutdown().await?;
/// ```
pub struct BackgroundRuntime {
    scheduler: Option<LearningScheduler>,
    purge: Option<PurgeScheduler>,
    learner: Arc<ProfileLearner>,
    config: RuntimeConfig,
}

impl BackgroundRuntime {
    /// Create the runtime. Schedulers are created but not started.
    pub async fn new(
        config: RuntimeConfig,
        learner: Arc<ProfileLearner>,
        kv: Arc<dyn KvStore>,
    ) -> HeraldResult<Self> {
        debug!(
            learning_enabled = config.enable_learning,
            interval_days = config.learning_interval_days,
            purge_enabled = config.enable_purge,
            "Creating BackgroundRuntime"
        );

        let scheduler = if config.enable_learning {
            let scheduler_config = SchedulerConfig {
                interval_days: config.learning_interval_days,
                run_on_start: config.learning_run_on_start,
            };
            let scheduler = LearningScheduler::new(learner.clone(), scheduler_config)
                .await
                .map_err(|e| {
                    HeraldError::internal(format!("Failed to create learning scheduler: {}", e))
                })?;
            Some(scheduler)
        } else {
            None
        };

        let purge = if config.enable_purge {
            let purge = PurgeScheduler::new(kv, config.purge_interval_secs)
                .await
                .map_err(|e| {
                    HeraldError::internal(format!("Failed to create purge scheduler: {}", e))
                })?;
            Some(purge)
        } else {
            None
        };

        Ok(Self {
            scheduler,
            purge,
            learner,
            config,
        })
    }

    /// Start the background schedulers.
    pub async fn start(&self) -> HeraldResult<()> {
        if let Some(ref scheduler) = self.scheduler {
            scheduler.start().await.map_err(|e| {
                HeraldError::internal(format!("Failed to start learning scheduler: {}", e))
            })?;
        }
        if let Some(ref purge) = self.purge {
            purge.start().await.map_err(|e| {
                HeraldError::internal(format!("Failed to start purge scheduler: {}", e))
            })?;
        }
        info!(
            learning_enabled = self.scheduler.is_some(),
            purge_enabled = self.purge.is_some(),
            "Background schedulers started"
        );
        Ok(())
    }

    /// Stop the background schedulers gracefully.
    pub async fn shutdown(&mut self) -> HeraldResult<()> {
        if let Some(ref mut scheduler) = self.scheduler {
            scheduler.shutdown().await.map_err(|e| {
                HeraldError::internal(format!("Failed to shutdown learning scheduler: {}", e))
            })?;
            debug!("Learning scheduler stopped");
        }
        if let Some(ref mut purge) = self.purge {
            purge.shutdown().await.map_err(|e| {
                HeraldError::internal(format!("Failed to shutdown purge scheduler: {}", e))
            })?;
            debug!("Purge scheduler stopped");
        }
        info!("Background schedulers stopped");
        Ok(())
    }

    /// Run a batch now, regardless of whether the scheduler is enabled.
    pub async fn run_now(&self) -> HeraldResult<BatchReport> {
        self.learner.run_batch().await
    }

    /// Purge expired entries now, if the purge scheduler is enabled.
    pub async fn purge_now(&self) -> HeraldResult<Option<usize>> {
        match self.purge {
            Some(ref purge) => purge.run_now().await.map(Some),
            None => Ok(None),
        }
    }

    /// Get the learning scheduler.
    pub fn scheduler(&self) -> Option<&LearningScheduler> {
        self.scheduler.as_ref()
    }

    /// Get the runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}
