//! Health and service description endpoints

use crate::common::TestApp;

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = TestApp::new().await;
    let response = app.get("/health").await;

    response.assert_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "pollinations-relay");
    assert!(json.get("version").is_some());
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_liveness_endpoint() {
    let app = TestApp::new().await;
    app.get("/health/live").await.assert_ok();
}

#[tokio::test]
async fn test_readiness_with_database() {
    let app = TestApp::new().await;
    app.get("/health/ready").await.assert_ok();
}

#[tokio::test]
async fn test_readiness_after_pool_closed() {
    let app = TestApp::new().await;
    app.state.db.close().await;

    let response = app.get("/health/ready").await;
    response.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_root_returns_greeting() {
    let app = TestApp::new().await;
    let response = app.get("/").await;

    response.assert_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], pollinations_relay::models::GREETING);
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn test_api_info_describes_service() {
    let app = TestApp::new().await;
    let response = app.get("/api").await;

    response.assert_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["service"], "pollinations-relay");
    assert!(json["endpoints"].get("POST /prompt").is_some());
}

#[tokio::test]
async fn test_unknown_route_returns_not_found() {
    let app = TestApp::new().await;
    app.get("/nonexistent").await.assert_not_found();
}
