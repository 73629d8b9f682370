//! Route definitions for the REST API.

mod analytics;
mod events;
mod feedback;
mod health;
mod profiles;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Inbound messages
        .route("/events/messages", post(events::handle_message_event))
        // Feedback loop
        .route("/feedback", post(feedback::submit_feedback))
        .route("/analytics/:user_id", get(analytics::get_analytics))
        .route("/profiles/recompute", post(profiles::recompute_profile))
        .route("/profiles/:user_id", get(profiles::get_profile))
        // Attach state
        .with_state(state)
}

pub use analytics::*;
pub use events::*;
pub use feedback::*;
pub use health::*;
pub use profiles::*;
