//! Feedback API.

use axum::{extract::State, Json};
use serde::Serialize;

use herald_core::FeedbackSubmission;

use crate::error::ApiResult;
use crate::middleware::CallerId;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub success: bool,
    pub feedback_id: String,
}

/// Rate a past decision.
/// POST /feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Json(submission): Json<FeedbackSubmission>,
) -> ApiResult<Json<FeedbackResponse>> {
    let feedback_id = state.inner.ingestor.submit(&caller, submission).await?;
    Ok(Json(FeedbackResponse {
        success: true,
        feedback_id,
    }))
}
