//! Integration tests for the feedback loop: ingestion, learning, analytics,
//! and learned keywords flowing back into decisions. Runs on SQLite.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use herald_core::{
    AnalyticsReporter, DecisionEngine, FeedbackIngestor, FeedbackKind, FeedbackStore,
    FeedbackSubmission, GenerationOptions, HeraldConfig, HeraldError, HeraldResult,
    InMemoryDirectory, LearningConfig, Llm, LlmResponse, Message, MessageEvent,
    NotificationDecision, NotificationRate, Participant, Priority, ProfileLearner, ProfileStore,
    RecomputeOutcome, ResolutionPath, SqliteStore,
};

struct SilentLlm {
    calls: AtomicUsize,
}

#[async_trait]
impl Llm for SilentLlm {
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> HeraldResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse {
            content: Some(r#"{"shouldNotify": false, "reason": "Not relevant"}"#.to_string()),
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        "silent"
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<SqliteStore>,
    directory: Arc<InMemoryDirectory>,
    ingestor: FeedbackIngestor,
    learner: ProfileLearner,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::new(dir.path().join("herald.db")).unwrap());
    let directory = Arc::new(InMemoryDirectory::new());
    directory
        .set_participants(
            "c1",
            vec![
                Participant {
                    user_id: "alice".into(),
                    display_name: "Alice".into(),
                },
                Participant {
                    user_id: "bob".into(),
                    display_name: "Bob".into(),
                },
            ],
        )
        .await;

    Harness {
        ingestor: FeedbackIngestor::new(store.clone(), directory.clone()),
        learner: ProfileLearner::new(store.clone(), store.clone(), &LearningConfig::default()),
        _dir: dir,
        store,
        directory,
    }
}

fn submission(message_id: &str, decision: NotificationDecision, feedback: &str, text: &str) -> FeedbackSubmission {
    FeedbackSubmission {
        conversation_id: "c1".into(),
        message_id: message_id.into(),
        decision,
        feedback: feedback.into(),
        message_text: Some(text.into()),
    }
}

fn notified(text: &str) -> NotificationDecision {
    NotificationDecision::notify("Requires contextual analysis", format!("Bob: {}", text), Priority::Medium)
}

#[tokio::test]
async fn test_resubmitted_feedback_keeps_second_value() {
    let h = harness().await;
    let decision = notified("standup moved");
    h.ingestor
        .submit("alice", submission("m1", decision.clone(), "helpful", "standup moved"))
        .await
        .unwrap();
    let id = h
        .ingestor
        .submit("alice", submission("m1", decision, "not_helpful", "standup moved"))
        .await
        .unwrap();

    let records = h
        .store
        .list_for_user_since("alice", Utc::now() - chrono::Duration::days(1))
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id(), id);
    assert_eq!(records[0].feedback, FeedbackKind::NotHelpful);
}

#[tokio::test]
async fn test_false_positives_lower_preferred_rate() {
    let h = harness().await;
    // 2 unhelpful and 2 helpful notifications: fpr = 0.5
    for (id, feedback) in [("m1", "not_helpful"), ("m2", "not_helpful"), ("m3", "helpful"), ("m4", "helpful")] {
        h.ingestor
            .submit("alice", submission(id, notified("lunch plans"), feedback, "lunch plans"))
            .await
            .unwrap();
    }

    let outcome = h.learner.recompute_user("alice").unwrap();
    let RecomputeOutcome::Updated(profile) = outcome else {
        panic!("expected a profile");
    };
    assert_eq!(profile.false_positive_rate, 0.5);
    assert_eq!(profile.preferred_notification_rate, NotificationRate::Low);

    let stored = ProfileStore::get(h.store.as_ref(), "alice").unwrap().unwrap();
    assert_eq!(stored, profile);
}

#[tokio::test]
async fn test_learned_keyword_feeds_back_into_decisions() {
    let h = harness().await;
    for id in ["m1", "m2", "m3"] {
        h.ingestor
            .submit(
                "alice",
                submission(id, notified("invoice approved"), "helpful", "invoice approved"),
            )
            .await
            .unwrap();
    }
    let report = h.learner.run_batch().await.unwrap();
    assert_eq!(report.updated, 1);
    assert!(report.failed.is_empty());

    let profile = ProfileStore::get(h.store.as_ref(), "alice").unwrap().unwrap();
    assert!(profile.learned_keywords.contains(&"invoice".to_string()));
    assert!(!profile.learned_keywords.contains(&"analysis".to_string()));

    let llm = Arc::new(SilentLlm {
        calls: AtomicUsize::new(0),
    });
    let engine = DecisionEngine::new(
        &HeraldConfig::default(),
        h.store.clone(),
        h.store.clone(),
        h.directory.clone(),
        llm.clone(),
    );
    let event = MessageEvent {
        conversation_id: "c1".into(),
        message_id: "m9".into(),
        sender_id: "bob".into(),
        text: "the invoice for march is attached".into(),
        timestamp: Utc::now(),
    };
    let recipient = Participant {
        user_id: "alice".into(),
        display_name: "Alice".into(),
    };

    let evaluated = engine.evaluate(&event, &recipient).await.unwrap();
    assert_eq!(evaluated.path, ResolutionPath::Heuristic);
    assert_eq!(evaluated.decision.reason, "Matches learned keyword: invoice");
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_analytics_are_private_and_ranked() {
    let h = harness().await;
    h.ingestor
        .submit("alice", submission("m1", notified("a"), "not_helpful", "a"))
        .await
        .unwrap();
    h.ingestor
        .submit(
            "alice",
            submission("m2", NotificationDecision::skip("Message too short"), "helpful", "ping"),
        )
        .await
        .unwrap();

    let reporter = AnalyticsReporter::new(h.store.clone(), 30);
    let report = reporter.report("alice", "alice").unwrap();
    assert_eq!(report.total_notifications, 2);
    assert_eq!(report.common_false_positives[0].reason, "Requires contextual analysis");
    assert_eq!(report.common_false_negatives[0].reason, "Message too short");

    assert!(matches!(
        reporter.report("bob", "alice"),
        Err(HeraldError::PermissionDenied { .. })
    ));
}

#[tokio::test]
async fn test_outsider_feedback_rejected() {
    let h = harness().await;
    let err = h
        .ingestor
        .submit("mallory", submission("m1", notified("x"), "helpful", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, HeraldError::PermissionDenied { .. }));
    assert!(h
        .store
        .users_with_feedback_since(Utc::now() - chrono::Duration::days(1))
        .unwrap()
        .is_empty());
}
