//! herald-core - Core library for herald.
//!
//! Decides whether a chat participant should be notified about a new message,
//! learns from their feedback, and reports how well it is doing.
//!
//! # Example
//!
//! ```ignore
//! use herald_core::{DecisionEngine, HeraldConfig, InMemoryDirectory, InMemoryStore};
//!
//! let config = HeraldConfig::default();
//! let store = Arc::new(InMemoryStore::new());
//! let engine = DecisionEngine::new(&config, store.clone(), store, directory, llm);
//!
//! for outcome in engine.fan_out(&event, &viewing_now).await? {
//!     println!("{}: {:?}", outcome.recipient_id, outcome.result);
//! }
//! ```

pub mod analytics;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod feedback;
pub mod learning;
pub mod rate_limit;
pub mod runtime;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use analytics::{AnalyticsReport, AnalyticsReporter, ReasonCount};
pub use cache::{CacheEntry, CacheLookup, CacheStore, CachedResult, MissReason};
pub use classifier::{Classification, ClassifierInput, HeuristicClassifier, Rule, Verdict};
pub use config::{
    EscalationConfig, FallbackPolicy, HeraldConfig, LearningConfig, LlmProvider,
    LlmProviderConfig,
};
pub use engine::{fallback_decision, DecisionEngine, FALLBACK_REASON};
pub use error::{ErrorCode, HeraldError, HeraldResult};
pub use escalation::{EscalationClient, EscalationOutcome, EscalationRequest, UpstreamKind};
pub use feedback::{FeedbackIngestor, FeedbackSubmission};
pub use learning::{
    aggregate, BatchFailure, BatchReport, LearningScheduler, ProfileLearner, RecomputeOutcome,
};
pub use rate_limit::{RateLimitCounter, RateLimiter};
pub use runtime::{BackgroundRuntime, RuntimeConfig};
pub use store::{InMemoryDirectory, InMemoryStore, PurgeScheduler, SqliteStore};
pub use traits::{
    ConversationDirectory, FeedbackStore, GenerationOptions, KvStore, Llm, LlmConfig,
    LlmResponse, ProfileStore, ResponseFormat, TokenUsage,
};
pub use types::{
    ConversationMessage, EvaluatedDecision, FeatureType, FeedbackKind, FeedbackRecord,
    MessageEvent, Message, MessageRole, NotificationDecision, NotificationRate, Participant,
    Priority, RecipientOutcome, ResolutionPath, UserNotificationProfile,
};
