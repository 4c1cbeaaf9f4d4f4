//! Key issuance, validation and usage accounting

use anyhow::Result;
use base64::Engine;
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::ApiKeyRepository;
use crate::models::{token_prefix, ApiKey, KeyValidation, RejectReason};
use crate::utils::validation::is_plausible_token;

/// Prefix carried by every issued token
pub const TOKEN_PREFIX: &str = "pk_";

/// Failure issuing a key
#[derive(Debug, Error)]
pub enum KeyError {
    /// The generated token already exists; retry with a fresh one
    #[error("generated token collides with an existing key")]
    Conflict,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Generate an opaque token from 32 bytes of OS randomness
pub fn generate_token() -> String {
    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut secret);
    format!(
        "{}{}",
        TOKEN_PREFIX,
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(secret)
    )
}

/// Service over the `api_keys` table
#[derive(Clone)]
pub struct KeyService {
    pool: SqlitePool,
}

impl KeyService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue a new active key for `owner_label`
    pub async fn issue(&self, owner_label: &str) -> Result<ApiKey, KeyError> {
        self.issue_with_token(&generate_token(), owner_label).await
    }

    /// Insert a key with a caller-supplied token
    pub async fn issue_with_token(&self, token: &str, owner_label: &str) -> Result<ApiKey, KeyError> {
        let repo = ApiKeyRepository::new(&self.pool);
        match repo.insert(token, owner_label).await {
            Ok(key) => {
                info!(key_id = key.id, owner = %key.owner_label, "Issued API key");
                Ok(key)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(KeyError::Conflict)
            }
            Err(e) => Err(KeyError::Database(e)),
        }
    }

    /// Look up a presented token
    pub async fn validate(&self, token: &str) -> Result<KeyValidation> {
        if !is_plausible_token(token) {
            return Ok(KeyValidation::Rejected(RejectReason::NotFound));
        }

        let repo = ApiKeyRepository::new(&self.pool);
        let validation = match repo.find_by_token(token).await? {
            None => KeyValidation::Rejected(RejectReason::NotFound),
            Some(key) if !key.is_active => KeyValidation::Rejected(RejectReason::Inactive),
            Some(key) => KeyValidation::Valid(key),
        };

        if let KeyValidation::Rejected(reason) = &validation {
            debug!(token = %token_prefix(token), reason = %reason, "Token rejected");
        }
        Ok(validation)
    }

    /// Count one successful relay against `token`
    pub async fn record_usage(&self, token: &str) -> Result<()> {
        let repo = ApiKeyRepository::new(&self.pool);
        if !repo.record_usage(token, Utc::now()).await? {
            // Deleted between validation and completion
            debug!(token = %token_prefix(token), "Usage not recorded, key no longer exists");
        }
        Ok(())
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<bool> {
        ApiKeyRepository::new(&self.pool).set_active(id, active).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        ApiKeyRepository::new(&self.pool).delete(id).await
    }
}
