//! API key models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An issued relay key with its usage counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiKey {
    pub id: i64,
    pub token: String,
    pub owner_label: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub request_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Shortened token safe to echo back to clients and into logs
    pub fn token_prefix(&self) -> String {
        token_prefix(&self.token)
    }
}

/// First eight characters of a token followed by an ellipsis
pub fn token_prefix(token: &str) -> String {
    let head: String = token.chars().take(8).collect();
    format!("{}...", head)
}

/// Why a token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotFound,
    Inactive,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NotFound => write!(f, "not_found"),
            RejectReason::Inactive => write!(f, "inactive"),
        }
    }
}

/// Outcome of looking up a presented token
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValidation {
    Valid(ApiKey),
    Rejected(RejectReason),
}

/// Dashboard summary counters
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct KeyStats {
    pub total_keys: i64,
    pub active_keys: i64,
    pub total_requests: i64,
}

/// Admin form for issuing a key
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateKeyForm {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
}

/// Query for the admin key search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeySearchQuery {
    #[serde(default)]
    pub q: String,
}
