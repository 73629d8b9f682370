//! Learned profile endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use herald_core::{HeraldError, ProfileStore, RecomputeOutcome, UserNotificationProfile};

use crate::error::{ApiError, ApiResult};
use crate::middleware::CallerId;
use crate::state::AppState;

/// Read the caller's learned profile.
/// GET /profiles/:user_id
pub async fn get_profile(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserNotificationProfile>> {
    if caller != user_id {
        return Err(HeraldError::not_owner("Profiles are only visible to their owner").into());
    }
    let profile = state
        .inner
        .profiles
        .get(&user_id)?
        .ok_or_else(|| HeraldError::not_found(format!("No profile learned for {}", user_id)))?;
    Ok(Json(profile))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeResponse {
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserNotificationProfile>,
}

/// Recompute the caller's profile now.
/// POST /profiles/recompute
pub async fn recompute_profile(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
) -> ApiResult<Json<RecomputeResponse>> {
    let learner = state.learner();
    let user_id = caller.clone();
    let outcome = tokio::task::spawn_blocking(move || learner.recompute_user(&user_id))
        .await
        .map_err(|e| ApiError::internal(format!("Recompute task failed: {}", e)))??;

    let response = match outcome {
        RecomputeOutcome::Updated(profile) => {
            info!(user_id = %caller, version = profile.version, "Profile recomputed on demand");
            RecomputeResponse {
                updated: true,
                profile: Some(profile),
            }
        }
        RecomputeOutcome::NoFeedback => RecomputeResponse {
            updated: false,
            profile: None,
        },
    };
    Ok(Json(response))
}
