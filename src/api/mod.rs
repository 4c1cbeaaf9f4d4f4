//! API routes and handlers
//!
//! This module defines the JSON relay endpoints and their routing.

use axum::{routing::get, Router};

use crate::AppState;

mod health;
mod info;
mod prompt;

pub use health::*;

/// Public relay routes; keys are checked per request by the prompt handler
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(info::root))
        .route("/api", get(info::api_info))
        .route(
            "/prompt",
            get(prompt::relay_prompt_get).post(prompt::relay_prompt_post),
        )
        // Health check endpoints
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
}
