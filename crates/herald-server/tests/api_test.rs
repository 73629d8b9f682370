//! End-to-end tests of the REST API over an in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use herald_core::{
    GenerationOptions, HeraldConfig, HeraldResult, InMemoryStore, Llm, LlmResponse, Message,
};
use herald_server::{create_server, AppState};

struct StaticLlm;

#[async_trait]
impl Llm for StaticLlm {
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> HeraldResult<LlmResponse> {
        Ok(LlmResponse {
            content: Some(r#"{"shouldNotify": false, "reason": "Small talk"}"#.to_string()),
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        "static"
    }
}

fn app() -> Router {
    let state = AppState::new(
        &HeraldConfig::default(),
        Arc::new(InMemoryStore::new()),
        Arc::new(StaticLlm),
    );
    create_server(state)
}

async fn send(app: &Router, method: &str, uri: &str, caller: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header("x-user-id", caller);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn message_event(id: &str, text: &str) -> Value {
    json!({
        "conversationId": "c1",
        "messageId": id,
        "senderId": "bob",
        "text": text,
        "timestamp": "2026-10-19T09:00:00Z",
        "participants": [
            {"userId": "alice", "displayName": "Alice"},
            {"userId": "bob", "displayName": "Bob"},
            {"userId": "carol", "displayName": "Carol"}
        ],
    })
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "static");
}

#[tokio::test]
async fn test_event_fans_out_to_recipients() {
    let app = app();
    let mut event = message_event("m1", "@alice are you around?");
    event["activeViewers"] = json!(["carol"]);

    let (status, body) = send(&app, "POST", "/events/messages", None, Some(event)).await;
    assert_eq!(status, StatusCode::OK);

    let decisions = body["decisions"].as_array().unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0]["recipientId"], "alice");
    assert_eq!(decisions[0]["path"], "heuristic");
    assert_eq!(decisions[0]["decision"]["shouldNotify"], true);
    assert_eq!(decisions[0]["decision"]["priority"], "high");
}

#[tokio::test]
async fn test_invalid_event_is_unprocessable() {
    let (status, body) = send(
        &app(),
        "POST",
        "/events/messages",
        None,
        Some(message_event("", "hello there")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["code"].as_str().unwrap().starts_with("VAL"));
}

#[tokio::test]
async fn test_feedback_then_recompute_then_analytics() {
    let app = app();
    send(&app, "POST", "/events/messages", None, Some(message_event("m1", "thanks!"))).await;

    let feedback = json!({
        "conversationId": "c1",
        "messageId": "m1",
        "decision": {"shouldNotify": true, "reason": "Urgent message", "notificationText": "Bob: deploy now", "priority": "high"},
        "feedback": "not_helpful",
        "messageText": "deploy now"
    });
    let (status, body) = send(&app, "POST", "/feedback", Some("alice"), Some(feedback)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["feedbackId"], "alice_c1_m1");

    let (status, body) = send(&app, "POST", "/profiles/recompute", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], true);
    assert_eq!(body["profile"]["preferredNotificationRate"], "low");

    let (status, body) = send(&app, "GET", "/profiles/alice", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 1);

    let (status, body) = send(&app, "GET", "/analytics/alice", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalNotifications"], 1);
    assert_eq!(body["commonFalsePositives"][0]["reason"], "Urgent message");
}

#[tokio::test]
async fn test_outsider_feedback_forbidden() {
    let app = app();
    send(&app, "POST", "/events/messages", None, Some(message_event("m1", "hello team"))).await;

    let feedback = json!({
        "conversationId": "c1",
        "messageId": "m1",
        "decision": {"shouldNotify": false, "reason": "Small talk", "priority": "low"},
        "feedback": "helpful"
    });
    let (status, body) = send(&app, "POST", "/feedback", Some("mallory"), Some(feedback)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "AUTHZ_001");
}

#[tokio::test]
async fn test_other_users_data_is_private() {
    let app = app();
    let (status, _) = send(&app, "GET", "/analytics/alice", Some("bob"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/profiles/alice", Some("bob"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/profiles/alice", Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_caller_rejected() {
    let (status, body) = send(&app(), "GET", "/analytics/alice", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}
