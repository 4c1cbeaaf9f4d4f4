//! Root greeting and service description

use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::StandardResponse;

use super::health::SERVICE_NAME;

/// Service description returned by `GET /api`
#[derive(Serialize)]
pub struct ApiInfo {
    pub service: String,
    pub version: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// `GET /`
pub async fn root() -> Json<StandardResponse> {
    Json(StandardResponse::greeting())
}

/// `GET /api`
pub async fn api_info() -> Json<ApiInfo> {
    let endpoints = BTreeMap::from([
        ("GET /", "Greeting"),
        ("GET /api", "This description"),
        ("GET /prompt", "Relay a prompt given as ?text=&api_key="),
        ("POST /prompt", "Relay a prompt given as JSON {text, api_key}"),
        ("GET /health", "Service health"),
        ("GET /admin", "Key management panel"),
    ]);

    Json(ApiInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints,
    })
}
