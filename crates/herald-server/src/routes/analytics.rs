//! Analytics API.

use axum::{
    extract::{Path, State},
    Json,
};

use herald_core::AnalyticsReport;

use crate::error::ApiResult;
use crate::middleware::CallerId;
use crate::state::AppState;

/// Feedback statistics of the caller.
/// GET /analytics/:user_id
pub async fn get_analytics(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(user_id): Path<String>,
) -> ApiResult<Json<AnalyticsReport>> {
    Ok(Json(state.inner.reporter.report(&caller, &user_id)?))
}
