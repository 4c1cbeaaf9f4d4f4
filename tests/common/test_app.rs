//! Test application setup utilities
//!
//! Provides utilities for setting up test instances of the application
//! with a temporary SQLite database and a mock upstream.

use std::path::PathBuf;

use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use tower::ServiceExt;
use uuid::Uuid;

use pollinations_relay::{
    config::{AppConfig, DatabaseConfig, UpstreamConfig},
    create_router, db,
    db::ApiKeyRepository,
    models::ApiKey,
    services::AdminService,
    AppState,
};

use super::MockUpstream;

/// Admin account seeded into every test database
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub upstream: MockUpstream,
    /// SQLite file backing this app, removed on drop
    pub db_path: Option<PathBuf>,
}

impl TestApp {
    /// Create a new test application with default settings
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test application after adjusting the default test configuration
    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let upstream = MockUpstream::start().await;
        let mut config = test_config(&upstream.base_url());
        customize(&mut config);
        let db_path = sqlite_file(&config.database.url);

        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        AdminService::new(db.clone())
            .ensure_admin(ADMIN_USERNAME, Some(ADMIN_PASSWORD))
            .await
            .expect("Failed to seed admin");

        let state = AppState::new(config, db).expect("Failed to build state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            upstream,
            db_path,
        }
    }

    /// Issue a key directly through the key service
    pub async fn issue_key(&self, owner: &str) -> ApiKey {
        self.state.keys.issue(owner).await.expect("Failed to issue key")
    }

    /// Current database row for a key
    pub async fn key(&self, id: i64) -> Option<ApiKey> {
        ApiKeyRepository::new(&self.state.db)
            .get_by_id(id)
            .await
            .expect("Failed to load key")
    }

    /// Make a GET request to the test application
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with a JSON body and a bearer token
    pub async fn post_json_with_bearer(
        &self,
        uri: &str,
        body: serde_json::Value,
        token: &str,
    ) -> TestResponse {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Make a GET request carrying a session cookie
    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a form POST, optionally carrying a session cookie
    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }

    /// Log in as the seeded admin and return the `Cookie` header value
    pub async fn login(&self) -> String {
        let response = self
            .post_form(
                "/admin/login",
                &format!("username={}&password={}", ADMIN_USERNAME, ADMIN_PASSWORD),
                None,
            )
            .await;
        response.assert_redirect_to("/admin/dashboard");
        response
            .session_cookie()
            .expect("Login did not set a session cookie")
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let Some(path) = &self.db_path else {
            return;
        };
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

/// Filesystem path of a `sqlite://` URL, without query parameters
fn sqlite_file(url: &str) -> Option<PathBuf> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    (!path.is_empty() && path != ":memory:").then(|| PathBuf::from(path))
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// A response header as a string
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// `name=value` of the session cookie set by this response
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("session_id="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Assert the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    /// Assert the response status is Bad Request (400)
    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::BAD_REQUEST)
    }

    /// Assert the response status is Unauthorized (401)
    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNAUTHORIZED)
    }

    /// Assert the response status is Not Found (404)
    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }

    /// Assert a 303 redirect to `location`
    pub fn assert_redirect_to(&self, location: &str) -> &Self {
        self.assert_status(axum::http::StatusCode::SEE_OTHER);
        assert_eq!(self.header("location").as_deref(), Some(location));
        self
    }
}

/// Create a test configuration with a temporary SQLite database
pub fn test_config(upstream_url: &str) -> AppConfig {
    // Use a unique temp file for each test to avoid conflicts
    let db_path = std::env::temp_dir().join(format!(
        "relay_test_{}.db",
        Uuid::new_v4().to_string().replace('-', "")
    ));

    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.database = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", db_path.display()),
        max_connections: 1,
        connect_timeout_secs: 30,
    };
    config.upstream = UpstreamConfig {
        base_url: upstream_url.to_string(),
        timeout_secs: 2,
    };
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_creation() {
        let app = TestApp::new().await;
        assert_eq!(app.state.config.relay.max_prompt_chars, 1000);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = TestApp::new().await;
        let response = app.get("/health").await;
        response.assert_ok();
    }

    #[tokio::test]
    async fn test_database_file_removed_on_drop() {
        let app = TestApp::new().await;
        let path = app.db_path.clone().unwrap();
        assert!(path.exists());

        drop(app);
        assert!(!path.exists());
    }

    #[test]
    fn test_sqlite_file_strips_query() {
        assert_eq!(
            sqlite_file("sqlite:///tmp/relay.db?mode=rwc"),
            Some(PathBuf::from("/tmp/relay.db"))
        );
        assert_eq!(sqlite_file("sqlite::memory:"), None);
    }

    #[tokio::test]
    async fn test_login_helper_returns_cookie() {
        let app = TestApp::new().await;
        let cookie = app.login().await;
        assert!(cookie.starts_with("session_id="));
    }
}
