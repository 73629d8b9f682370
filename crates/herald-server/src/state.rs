//! Server state management.

use std::sync::Arc;

use tokio::sync::RwLock;

use herald_core::{
    AnalyticsReporter, BackgroundRuntime, DecisionEngine, FeedbackIngestor, FeedbackStore,
    HeraldConfig, InMemoryDirectory, KvStore, Llm, ProfileLearner, ProfileStore,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
    runtime: Arc<RwLock<Option<BackgroundRuntime>>>,
}

pub struct AppStateInner {
    pub engine: DecisionEngine,
    pub ingestor: FeedbackIngestor,
    pub learner: Arc<ProfileLearner>,
    pub reporter: AnalyticsReporter,
    pub profiles: Arc<dyn ProfileStore>,
    /// Cache entries and rate-limit counters, purged by the runtime.
    pub kv: Arc<dyn KvStore>,
    /// Conversation snapshots registered by inbound events.
    pub directory: Arc<InMemoryDirectory>,
}

impl AppState {
    /// Wire every component onto one store and one inference provider.
    pub fn new<S>(config: &HeraldConfig, store: Arc<S>, llm: Arc<dyn Llm>) -> Self
    where
        S: KvStore + FeedbackStore + ProfileStore + 'static,
    {
        // Only the transcript window is ever read back.
        let directory = Arc::new(InMemoryDirectory::with_history_limit(
            config.escalation.context_messages + 1,
        ));
        let engine = DecisionEngine::new(
            config,
            store.clone(),
            store.clone(),
            directory.clone(),
            llm,
        );
        let ingestor = FeedbackIngestor::new(store.clone(), directory.clone());
        let learner = Arc::new(ProfileLearner::new(
            store.clone(),
            store.clone(),
            &config.learning,
        ));
        let reporter = AnalyticsReporter::new(store.clone(), config.analytics_window_days);

        Self {
            inner: Arc::new(AppStateInner {
                engine,
                ingestor,
                learner,
                reporter,
                profiles: store.clone(),
                kv: store,
                directory,
            }),
            runtime: Arc::new(RwLock::new(None)),
        }
    }

    /// Hand the background runtime to the state so it lives as long as the server.
    pub async fn attach_runtime(&self, runtime: BackgroundRuntime) {
        *self.runtime.write().await = Some(runtime);
    }

    /// Take the background runtime back out, for shutdown.
    pub async fn take_runtime(&self) -> Option<BackgroundRuntime> {
        self.runtime.write().await.take()
    }

    pub fn learner(&self) -> Arc<ProfileLearner> {
        self.inner.learner.clone()
    }

    pub fn kv(&self) -> Arc<dyn KvStore> {
        self.inner.kv.clone()
    }
}
