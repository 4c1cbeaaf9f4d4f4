//! Pollinations Relay Library
//!
//! API-key gated relay for the Pollinations.ai text generation API, with an
//! HTML admin panel for issuing and managing keys.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;

pub mod api;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
use services::{
    InMemorySessionStore, KeyService, RateLimiter, SessionStore, SlidingWindowLimiter,
    UpstreamClient,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Key issuance and validation
    pub keys: KeyService,
    /// Upstream text API client
    pub upstream: Arc<UpstreamClient>,
    /// Per-key request quotas
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Admin panel sessions
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Build state with the in-memory rate limiter and session store
    pub fn new(config: AppConfig, db: DbPool) -> Result<Self> {
        let rate_limiter: Arc<dyn RateLimiter> = Arc::new(SlidingWindowLimiter::new());
        let sessions: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::new(config.admin.session_ttl()));
        Self::with_components(config, db, rate_limiter, sessions)
    }

    /// Build state around caller-provided quota and session backends
    pub fn with_components(
        config: AppConfig,
        db: DbPool,
        rate_limiter: Arc<dyn RateLimiter>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let upstream = Arc::new(UpstreamClient::new(&config.upstream)?);
        Ok(Self {
            keys: KeyService::new(db.clone()),
            config,
            db,
            upstream,
            rate_limiter,
            sessions,
        })
    }
}

/// Router with every relay and admin route, without transport-level layers
pub fn create_router(state: AppState) -> Router {
    let login_limit = middleware::LoginRateLimit::new(
        state.config.admin.login_requests_per_second,
        state.config.admin.login_burst,
    );
    middleware::spawn_login_limit_cleanup(login_limit.clone());

    Router::new()
        .merge(api::routes())
        .nest("/admin", handlers::admin::routes(login_limit))
        .with_state(state)
}
