//! Integration tests for the decision pipeline.
//!
//! The conversation directory is mocked; the inference service is a fake that
//! counts how often it is called.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use mockall::predicate::eq;

use herald_core::{
    ConversationDirectory, ConversationMessage, DecisionEngine, FeatureType, GenerationOptions,
    HeraldConfig, HeraldError, HeraldResult, InMemoryStore, Llm, LlmResponse, Message,
    MessageEvent, Participant, Priority, ResolutionPath,
};

mock! {
    pub Directory {}

    #[async_trait]
    impl ConversationDirectory for Directory {
        async fn participants(&self, conversation_id: &str) -> HeraldResult<Vec<Participant>>;
        async fn display_name(&self, user_id: &str) -> HeraldResult<Option<String>>;
        async fn recent_messages(
            &self,
            conversation_id: &str,
            limit: usize,
        ) -> HeraldResult<Vec<ConversationMessage>>;
        async fn message_count(&self, conversation_id: &str) -> HeraldResult<u64>;
    }
}

/// Inference fake returning a fixed decision.
struct CountingLlm {
    calls: AtomicUsize,
    response: String,
}

impl CountingLlm {
    fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            response: response.to_string(),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Llm for CountingLlm {
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> HeraldResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse {
            content: Some(self.response.clone()),
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

fn participant(id: &str, name: &str) -> Participant {
    Participant {
        user_id: id.into(),
        display_name: name.into(),
    }
}

fn directory() -> MockDirectory {
    let mut directory = MockDirectory::new();
    directory
        .expect_participants()
        .with(eq("c1"))
        .returning(|_| Ok(vec![participant("bob", "Bob"), participant("alice", "Alice")]));
    directory
        .expect_display_name()
        .with(eq("bob"))
        .returning(|_| Ok(Some("Bob".to_string())));
    directory.expect_message_count().returning(|_| Ok(12));
    directory.expect_recent_messages().returning(|_, limit| {
        assert_eq!(limit, 10);
        Ok(vec![ConversationMessage {
            message_id: "m0".into(),
            sender_id: "alice".into(),
            sender_name: "Alice".into(),
            text: "how is planning going?".into(),
            timestamp: Utc::now(),
        }])
    });
    directory
}

fn engine(llm: Arc<CountingLlm>, config: HeraldConfig) -> DecisionEngine {
    let store = Arc::new(InMemoryStore::new());
    DecisionEngine::new(&config, store.clone(), store, Arc::new(directory()), llm)
}

fn event(id: &str, text: &str) -> MessageEvent {
    MessageEvent {
        conversation_id: "c1".into(),
        message_id: id.into(),
        sender_id: "bob".into(),
        text: text.into(),
        timestamp: Utc::now(),
    }
}

const INFERENCE_SAYS_NOTIFY: &str =
    r#"{"shouldNotify": true, "reason": "Roadmap affects your team", "priority": "medium"}"#;

#[tokio::test]
async fn test_mention_resolves_heuristically() {
    let llm = CountingLlm::new(INFERENCE_SAYS_NOTIFY);
    let engine = engine(llm.clone(), HeraldConfig::default());

    let outcomes = engine
        .fan_out(&event("m1", "@alice can you review this ASAP?"), &[])
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].recipient_id, "alice");
    let evaluated = outcomes[0].result.as_ref().unwrap();
    assert_eq!(evaluated.path, ResolutionPath::Heuristic);
    assert!(evaluated.decision.should_notify);
    assert_eq!(evaluated.decision.reason, "Direct @mention");
    assert_eq!(evaluated.decision.priority, Priority::High);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_acknowledgement_is_skipped() {
    let llm = CountingLlm::new(INFERENCE_SAYS_NOTIFY);
    let engine = engine(llm.clone(), HeraldConfig::default());

    let outcomes = engine.fan_out(&event("m1", "thanks!"), &[]).await.unwrap();
    let decision = &outcomes[0].result.as_ref().unwrap().decision;

    assert!(!decision.should_notify);
    assert_eq!(decision.reason, "Common acknowledgment/reaction");
    assert!(decision.notification_text.is_empty());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_ambiguous_message_escalates_exactly_once() {
    let llm = CountingLlm::new(INFERENCE_SAYS_NOTIFY);
    let engine = engine(llm.clone(), HeraldConfig::default());

    let outcomes = engine
        .fan_out(
            &event("m1", "I think we should revisit the roadmap sometime"),
            &[],
        )
        .await
        .unwrap();

    let evaluated = outcomes[0].result.as_ref().unwrap();
    assert_eq!(evaluated.path, ResolutionPath::Inference);
    assert_eq!(evaluated.decision.reason, "Roadmap affects your team");
    assert_eq!(
        evaluated.decision.notification_text,
        "Bob: I think we should revisit the roadmap sometime"
    );
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_presence_exclusion_leaves_nobody() {
    let llm = CountingLlm::new(INFERENCE_SAYS_NOTIFY);
    let engine = engine(llm, HeraldConfig::default());

    let outcomes = engine
        .fan_out(&event("m1", "@alice ping"), &["alice".to_string()])
        .await
        .unwrap();
    assert!(outcomes.is_empty());
}

#[tokio::test]
async fn test_quota_exhaustion_is_reported_per_recipient() {
    let llm = CountingLlm::new(INFERENCE_SAYS_NOTIFY);
    let config = HeraldConfig::builder()
        .daily_limit(FeatureType::NotificationDecision, 2)
        .build();
    let engine = engine(llm.clone(), config);

    for id in ["m1", "m2"] {
        let outcomes = engine
            .fan_out(&event(id, "I think we should revisit the roadmap sometime"), &[])
            .await
            .unwrap();
        assert!(outcomes[0].result.is_ok());
    }
    let outcomes = engine
        .fan_out(&event("m3", "I think we should revisit the roadmap sometime"), &[])
        .await
        .unwrap();

    assert!(matches!(
        outcomes[0].result,
        Err(HeraldError::QuotaExceeded { .. })
    ));
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn test_invalid_event_rejected_before_lookup() {
    let llm = CountingLlm::new(INFERENCE_SAYS_NOTIFY);
    let store = Arc::new(InMemoryStore::new());
    // no expectations: any directory call would panic
    let engine = DecisionEngine::new(
        &HeraldConfig::default(),
        store.clone(),
        store,
        Arc::new(MockDirectory::new()),
        llm,
    );

    let err = engine.fan_out(&event("", "hello"), &[]).await.unwrap_err();
    assert!(matches!(err, HeraldError::Validation { .. }));
}
