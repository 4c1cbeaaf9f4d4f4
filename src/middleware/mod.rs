//! Middleware components
//!
//! This module contains middleware for:
//! - Admin session authentication
//! - Login rate limiting
//! - Admin panel response headers

pub mod auth;
pub mod rate_limit;
pub mod security_headers;

pub use auth::{removal_cookie, session_cookie, AdminSession, LOGIN_PATH, SESSION_COOKIE};
pub use rate_limit::{login_rate_limit_middleware, spawn_login_limit_cleanup, LoginRateLimit};
pub use security_headers::admin_headers_middleware;
