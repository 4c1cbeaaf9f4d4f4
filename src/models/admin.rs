//! Admin account and session models

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Admin panel account
#[derive(Debug, Clone)]
pub struct AdminPrincipal {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// Authenticated admin panel session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub admin_id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Login form submitted from the admin login page
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}
