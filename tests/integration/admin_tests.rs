//! Admin panel: login, sessions and key management

use axum::http::StatusCode;
use rstest::rstest;

use pollinations_relay::models::ApiKey;

use crate::common::{TestApp, ADMIN_PASSWORD, ADMIN_USERNAME};

#[tokio::test]
async fn test_login_page_renders() {
    let app = TestApp::new().await;
    let response = app.get("/admin").await;

    response.assert_ok();
    assert!(response.text().contains(r#"action="/admin/login""#));
    assert_eq!(response.header("x-frame-options").as_deref(), Some("DENY"));
}

#[tokio::test]
async fn test_login_sets_http_only_cookie() {
    let app = TestApp::new().await;
    let response = app
        .post_form(
            "/admin/login",
            &format!("username={}&password={}", ADMIN_USERNAME, ADMIN_PASSWORD),
            None,
        )
        .await;

    response.assert_redirect_to("/admin/dashboard");
    let set_cookie = response.header("set-cookie").unwrap();
    assert!(set_cookie.starts_with("session_id="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
}

#[rstest]
#[case("admin", "wrong-password")]
#[case("nobody", "correct-horse-battery")]
#[tokio::test]
async fn test_bad_credentials_rerender_login(#[case] username: &str, #[case] password: &str) {
    let app = TestApp::new().await;
    let response = app
        .post_form(
            "/admin/login",
            &format!("username={}&password={}", username, password),
            None,
        )
        .await;

    response.assert_ok();
    assert!(response.text().contains("Invalid credentials"));
    assert!(response.session_cookie().is_none());
}

#[tokio::test]
async fn test_login_attempts_are_throttled() {
    let app = TestApp::with_config(|config| {
        config.admin.login_requests_per_second = 1;
        config.admin.login_burst = 2;
    })
    .await;

    for _ in 0..2 {
        app.post_form("/admin/login", "username=admin&password=nope", None)
            .await
            .assert_ok();
    }

    let response = app
        .post_form("/admin/login", "username=admin&password=nope", None)
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert!(response.header("retry-after").is_some());
}

#[rstest]
#[case("/admin/dashboard")]
#[case("/admin/keys/search?q=x")]
#[tokio::test]
async fn test_admin_pages_redirect_without_session(#[case] uri: &str) {
    let app = TestApp::new().await;
    app.get(uri).await.assert_redirect_to("/admin");
}

#[tokio::test]
async fn test_unknown_session_redirects() {
    let app = TestApp::new().await;
    app.get_with_cookie("/admin/dashboard", "session_id=forged")
        .await
        .assert_redirect_to("/admin");
}

#[rstest]
#[case("/admin/keys/create", "name=eve")]
#[case("/admin/keys/1/toggle", "")]
#[case("/admin/keys/1/delete", "")]
#[tokio::test]
async fn test_mutations_redirect_without_session(#[case] uri: &str, #[case] form: &str) {
    let app = TestApp::new().await;
    let key = app.issue_key("victim").await;

    app.post_form(uri, form, None).await.assert_redirect_to("/admin");

    let stats = pollinations_relay::db::ApiKeyRepository::new(&app.state.db)
        .stats()
        .await
        .unwrap();
    assert_eq!(stats.total_keys, 1);
    assert!(app.key(key.id).await.unwrap().is_active);
}

#[tokio::test]
async fn test_dashboard_shows_stats_and_escaped_keys() {
    let app = TestApp::new().await;
    app.issue_key("<b>mallory</b>").await;
    let inactive = app.issue_key("oscar").await;
    app.state.keys.set_active(inactive.id, false).await.unwrap();
    let cookie = app.login().await;

    let response = app.get_with_cookie("/admin/dashboard", &cookie).await;

    response.assert_ok();
    let page = response.text();
    assert!(page.contains("&lt;b&gt;mallory&lt;/b&gt;"));
    assert!(!page.contains("<b>mallory</b>"));
    assert!(page.contains(&inactive.token));
    assert!(page.contains(r#"<div class="value">2</div>"#));
    assert!(page.contains(r#"<div class="value">1</div>"#));
    assert_eq!(response.header("cache-control").as_deref(), Some("no-store, no-cache, must-revalidate, private"));
}

#[tokio::test]
async fn test_create_key_from_dashboard() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    app.post_form("/admin/keys/create", "name=++Team+Rocket++", Some(&cookie))
        .await
        .assert_redirect_to("/admin/dashboard");

    let response = app.get_with_cookie("/admin/keys/search?q=Rocket", &cookie).await;
    response.assert_ok();
    let keys: Vec<ApiKey> = response.json();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].owner_label, "Team Rocket");
    assert!(keys[0].token.starts_with("pk_"));
    assert!(keys[0].is_active);
    assert_eq!(keys[0].request_count, 0);
}

#[rstest]
#[case("name=")]
#[case("name=+++")]
#[tokio::test]
async fn test_create_key_requires_name(#[case] form: &str) {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    app.post_form("/admin/keys/create", form, Some(&cookie))
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_create_key_rejects_long_name() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let form = format!("name={}", "x".repeat(101));
    app.post_form("/admin/keys/create", &form, Some(&cookie))
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_toggle_key_flips_state() {
    let app = TestApp::new().await;
    let key = app.issue_key("peggy").await;
    let cookie = app.login().await;
    let uri = format!("/admin/keys/{}/toggle", key.id);

    app.post_form(&uri, "", Some(&cookie))
        .await
        .assert_redirect_to("/admin/dashboard");
    assert!(!app.key(key.id).await.unwrap().is_active);

    app.post_form(&uri, "", Some(&cookie))
        .await
        .assert_redirect_to("/admin/dashboard");
    assert!(app.key(key.id).await.unwrap().is_active);
}

#[tokio::test]
async fn test_toggle_unknown_key_is_not_found() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    app.post_form("/admin/keys/9999/toggle", "", Some(&cookie))
        .await
        .assert_not_found();
}

#[tokio::test]
async fn test_deactivated_key_cannot_relay() {
    let app = TestApp::new().await;
    app.upstream.reply_with("ok").await;
    let key = app.issue_key("rupert").await;
    let cookie = app.login().await;

    app.post_form(&format!("/admin/keys/{}/toggle", key.id), "", Some(&cookie))
        .await;

    app.post_json(
        "/prompt",
        serde_json::json!({ "text": "hello", "api_key": key.token }),
    )
    .await
    .assert_unauthorized();
}

#[tokio::test]
async fn test_delete_key_removes_it() {
    let app = TestApp::new().await;
    let key = app.issue_key("sybil").await;
    let cookie = app.login().await;

    app.post_form(&format!("/admin/keys/{}/delete", key.id), "", Some(&cookie))
        .await
        .assert_redirect_to("/admin/dashboard");
    assert!(app.key(key.id).await.is_none());

    // Deleting again is harmless
    app.post_form(&format!("/admin/keys/{}/delete", key.id), "", Some(&cookie))
        .await
        .assert_redirect_to("/admin/dashboard");
}

#[tokio::test]
async fn test_search_matches_label_and_token() {
    let app = TestApp::new().await;
    let alpha = app.issue_key("alpha team").await;
    app.issue_key("beta team").await;
    let cookie = app.login().await;

    let by_label: Vec<ApiKey> = app
        .get_with_cookie("/admin/keys/search?q=alpha", &cookie)
        .await
        .json();
    assert_eq!(by_label.len(), 1);
    assert_eq!(by_label[0].id, alpha.id);

    let fragment = &alpha.token[3..15];
    let by_token: Vec<ApiKey> = app
        .get_with_cookie(&format!("/admin/keys/search?q={}", fragment), &cookie)
        .await
        .json();
    assert!(by_token.iter().any(|k| k.id == alpha.id));

    let both: Vec<ApiKey> = app
        .get_with_cookie("/admin/keys/search?q=team", &cookie)
        .await
        .json();
    assert_eq!(both.len(), 2);

    let none: Vec<ApiKey> = app
        .get_with_cookie("/admin/keys/search?q=zzz-no-match", &cookie)
        .await
        .json();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let response = app.get_with_cookie("/admin/logout", &cookie).await;
    response.assert_redirect_to("/admin");
    assert!(response.header("set-cookie").unwrap().starts_with("session_id="));

    app.get_with_cookie("/admin/dashboard", &cookie)
        .await
        .assert_redirect_to("/admin");
}

#[tokio::test]
async fn test_expired_session_redirects() {
    let app = TestApp::with_config(|config| config.admin.session_ttl_minutes = 0).await;
    let cookie = app.login().await;

    app.get_with_cookie("/admin/dashboard", &cookie)
        .await
        .assert_redirect_to("/admin");
}
