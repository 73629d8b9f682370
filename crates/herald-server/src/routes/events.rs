//! Inbound message events.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use herald_core::{
    ConversationDirectory, ConversationMessage, MessageEvent, NotificationDecision, Participant, RecipientOutcome,
    ResolutionPath,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for an inbound message.
///
/// The message service may send a snapshot of the conversation along with
/// the event; it is registered before the event is evaluated.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEventRequest {
    #[serde(flatten)]
    pub event: MessageEvent,
    /// Current participant list, replacing the registered one.
    #[serde(default)]
    pub participants: Option<Vec<Participant>>,
    /// Messages preceding this one, oldest first.
    #[serde(default)]
    pub recent_messages: Vec<ConversationMessage>,
    /// Users currently viewing the conversation; they are not evaluated.
    #[serde(default)]
    pub active_viewers: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientDecision {
    pub recipient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<NotificationDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<ResolutionPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_since_cache: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RecipientError>,
}

#[derive(Debug, Serialize)]
pub struct RecipientError {
    pub code: String,
    pub message: String,
}

impl From<RecipientOutcome> for RecipientDecision {
    fn from(outcome: RecipientOutcome) -> Self {
        let mut out = Self {
            recipient_id: outcome.recipient_id,
            decision: None,
            path: None,
            cached: None,
            items_since_cache: None,
            error: None,
        };
        match outcome.result {
            Ok(evaluated) => {
                out.decision = Some(evaluated.decision);
                out.path = Some(evaluated.path);
                out.cached = Some(evaluated.cached);
                out.items_since_cache = evaluated.items_since_cache;
            }
            Err(err) => {
                let api = ApiError::from(err);
                out.error = Some(RecipientError {
                    code: api.code,
                    message: api.message,
                });
            }
        }
        out
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEventResponse {
    pub conversation_id: String,
    pub message_id: String,
    pub decisions: Vec<RecipientDecision>,
}

/// Evaluate an inbound message for every recipient.
/// POST /events/messages
pub async fn handle_message_event(
    State(state): State<AppState>,
    Json(request): Json<MessageEventRequest>,
) -> ApiResult<Json<MessageEventResponse>> {
    let MessageEventRequest {
        event,
        participants,
        recent_messages,
        active_viewers,
    } = request;
    event.validate()?;

    let directory = &state.inner.directory;
    if let Some(participants) = participants {
        directory
            .set_participants(&event.conversation_id, participants)
            .await;
    }
    for message in recent_messages {
        directory
            .record_message(&event.conversation_id, message)
            .await;
    }

    let outcomes = state.inner.engine.fan_out(&event, &active_viewers).await?;
    debug!(
        conversation_id = %event.conversation_id,
        message_id = %event.message_id,
        recipients = outcomes.len(),
        "Evaluated inbound message"
    );

    // The message becomes part of the history once it has been evaluated.
    let sender_name = directory
        .display_name(&event.sender_id)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| event.sender_id.clone());
    directory
        .record_message(
            &event.conversation_id,
            ConversationMessage {
                message_id: event.message_id.clone(),
                sender_id: event.sender_id.clone(),
                sender_name,
                text: event.text.clone(),
                timestamp: event.timestamp,
            },
        )
        .await;

    Ok(Json(MessageEventResponse {
        conversation_id: event.conversation_id,
        message_id: event.message_id,
        decisions: outcomes.into_iter().map(RecipientDecision::from).collect(),
    }))
}
