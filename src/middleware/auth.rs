//! Admin session authentication
//!
//! Admin routes take an [`AdminSession`] argument. Requests without a live
//! session cookie are sent back to the login page.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use crate::{models::Session, AppState};

/// Cookie carrying the admin session id
pub const SESSION_COOKIE: &str = "session_id";

/// Where unauthenticated admin requests are redirected
pub const LOGIN_PATH: &str = "/admin";

/// Authenticated admin extracted from the session cookie
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            debug!(path = %parts.uri.path(), "No admin session cookie");
            return Err(Redirect::to(LOGIN_PATH));
        };

        match state.sessions.lookup(cookie.value()).await {
            Some(session) => Ok(AdminSession(session)),
            None => {
                debug!(path = %parts.uri.path(), "Admin session missing or expired");
                Err(Redirect::to(LOGIN_PATH))
            }
        }
    }
}

/// Session cookie set after a successful login
pub fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie that clears the session on logout
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
