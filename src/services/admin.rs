//! Admin account service
//!
//! Provides password hashing with Argon2 and admin authentication.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::AdminRepository;
use crate::models::AdminPrincipal;

/// Outcome of seeding the admin account at startup
#[derive(Debug, Clone, PartialEq)]
pub enum AdminSeed {
    /// The account already existed; nothing changed
    Existing,
    /// Created with the configured password
    Created,
    /// Created with a generated password, which is returned so it can be shown once
    Generated(String),
}

/// Service over the `admin_users` table
pub struct AdminService {
    pool: SqlitePool,
}

impl AdminService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Hash a password using Argon2id
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Make sure `username` exists, creating it on first start.
    ///
    /// An existing account is never modified, so a configured password only
    /// takes effect for a fresh database.
    pub async fn ensure_admin(&self, username: &str, password: Option<&str>) -> Result<AdminSeed> {
        let repo = AdminRepository::new(&self.pool);
        if repo.get_by_username(username).await?.is_some() {
            return Ok(AdminSeed::Existing);
        }

        let (password, seed) = match password {
            Some(p) => (p.to_string(), AdminSeed::Created),
            None => {
                let generated = generate_password();
                (generated.clone(), AdminSeed::Generated(generated))
            }
        };

        let hash = Self::hash_password(&password)?;
        if !repo
            .insert_if_absent(username, &hash)
            .await
            .context("Failed to seed admin account")?
        {
            // Another instance created it concurrently
            return Ok(AdminSeed::Existing);
        }

        match &seed {
            AdminSeed::Generated(_) => warn!(
                username = username,
                "Created admin account with a generated password; set admin.password or RELAY_ADMIN_PASSWORD to choose one"
            ),
            _ => info!(username = username, "Created admin account"),
        }
        Ok(seed)
    }

    /// Authenticate an admin by username and password
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<AdminPrincipal>> {
        let admin = AdminRepository::new(&self.pool)
            .get_by_username(username)
            .await?;

        match admin {
            Some(admin) if Self::verify_password(password, &admin.password_hash)? => Ok(Some(admin)),
            _ => Ok(None),
        }
    }
}

fn generate_password() -> String {
    let mut bytes = [0u8; 18];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
