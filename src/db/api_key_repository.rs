//! API key repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::parse_db_timestamp;
use crate::models::{ApiKey, KeyStats};

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyRow {
    id: i64,
    key: String,
    name: String,
    created_at: String,
    is_active: bool,
    requests_count: i64,
    last_used: Option<String>,
}

impl From<ApiKeyRow> for ApiKey {
    fn from(row: ApiKeyRow) -> Self {
        ApiKey {
            id: row.id,
            token: row.key,
            owner_label: row.name,
            created_at: parse_db_timestamp(&row.created_at),
            is_active: row.is_active,
            request_count: row.requests_count,
            last_used_at: row.last_used.as_deref().map(parse_db_timestamp),
        }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, key, name, created_at, is_active, requests_count, last_used FROM api_keys";

pub struct ApiKeyRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ApiKeyRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new active key with zeroed counters.
    ///
    /// Returns the raw `sqlx::Error` so callers can tell a UNIQUE violation
    /// apart from other failures.
    pub async fn insert(&self, token: &str, owner_label: &str) -> Result<ApiKey, sqlx::Error> {
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO api_keys (key, name, created_at, is_active, requests_count)
            VALUES (?, ?, ?, 1, 0)
            "#,
        )
        .bind(token)
        .bind(owner_label)
        .bind(created_at.to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(ApiKey {
            id: result.last_insert_rowid(),
            token: token.to_string(),
            owner_label: owner_label.to_string(),
            created_at,
            is_active: true,
            request_count: 0,
            last_used_at: None,
        })
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<ApiKey>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(&format!("{SELECT_COLUMNS} WHERE key = ?"))
            .bind(token)
            .fetch_optional(self.pool)
            .await
            .context("Failed to look up api key by token")?;

        Ok(row.map(ApiKey::from))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ApiKey>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .context("Failed to get api key")?;

        Ok(row.map(ApiKey::from))
    }

    /// All keys, newest first
    pub async fn list(&self) -> Result<Vec<ApiKey>> {
        let rows = sqlx::query_as::<_, ApiKeyRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await
        .context("Failed to list api keys")?;

        Ok(rows.into_iter().map(ApiKey::from).collect())
    }

    /// Keys whose label or token contains `needle`, newest first
    pub async fn search(&self, needle: &str) -> Result<Vec<ApiKey>> {
        let pattern = format!("%{}%", escape_like(needle));
        let rows = sqlx::query_as::<_, ApiKeyRow>(&format!(
            "{SELECT_COLUMNS} WHERE name LIKE ?1 ESCAPE '\\' OR key LIKE ?1 ESCAPE '\\' \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(pattern)
        .fetch_all(self.pool)
        .await
        .context("Failed to search api keys")?;

        Ok(rows.into_iter().map(ApiKey::from).collect())
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE api_keys SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to update api key status")?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip the active flag in a single statement; returns the new state
    pub async fn toggle(&self, id: i64) -> Result<Option<bool>> {
        let row: Option<(bool,)> = sqlx::query_as(
            "UPDATE api_keys SET is_active = NOT is_active WHERE id = ? RETURNING is_active",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .context("Failed to toggle api key")?;

        Ok(row.map(|(active,)| active))
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to delete api key")?;

        Ok(result.rows_affected() > 0)
    }

    /// Increment the request counter and stamp the last-used time
    pub async fn record_usage(&self, token: &str, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE api_keys SET requests_count = requests_count + 1, last_used = ? WHERE key = ?",
        )
        .bind(at.to_rfc3339())
        .bind(token)
        .execute(self.pool)
        .await
        .context("Failed to record api key usage")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn stats(&self) -> Result<KeyStats> {
        let (total_keys, active_keys, total_requests): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN is_active THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(requests_count), 0)
            FROM api_keys
            "#,
        )
        .fetch_one(self.pool)
        .await
        .context("Failed to compute api key stats")?;

        Ok(KeyStats {
            total_keys,
            active_keys,
            total_requests,
        })
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
