//! Admin account repository

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::AdminPrincipal;

#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    id: i64,
    username: String,
    password_hash: String,
}

pub struct AdminRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AdminRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<AdminPrincipal>> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, username, password_hash FROM admin_users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await
        .context("Failed to fetch admin by username")?;

        Ok(row.map(|r| AdminPrincipal {
            id: r.id,
            username: r.username,
            password_hash: r.password_hash,
        }))
    }

    /// Insert the account unless the username is taken; returns whether a row was added
    pub async fn insert_if_absent(&self, username: &str, password_hash: &str) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO admin_users (username, password_hash) VALUES (?, ?)")
                .bind(username)
                .bind(password_hash)
                .execute(self.pool)
                .await
                .context("Failed to create admin user")?;

        Ok(result.rows_affected() > 0)
    }
}
