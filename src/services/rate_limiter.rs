//! Per-key request quotas
//!
//! Relay requests are capped per token with a sliding window: every check
//! re-evaluates the trailing interval, so a burst cannot be doubled by
//! straddling a fixed window boundary. State lives in process memory only; it
//! is reset on restart and not shared between instances.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

/// Request quota enforcement, keyed by token
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Admit one request for `token` if fewer than `limit` were admitted in
    /// the trailing `window`; admitted requests are recorded.
    async fn allow(&self, token: &str, limit: u32, window: Duration) -> bool;

    /// Forget all recorded requests for `token`
    async fn reset(&self, token: &str);

    /// Seconds until the oldest recorded request for `token` leaves the window
    async fn retry_after(&self, token: &str, window: Duration) -> u64 {
        let _ = token;
        window.as_secs()
    }
}

/// In-memory sliding-window limiter.
///
/// A single mutex serializes all access, which is enough for the expected
/// request volume.
#[derive(Debug, Default)]
pub struct SlidingWindowLimiter {
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// [`RateLimiter::allow`] evaluated at an explicit instant
    pub async fn allow_at(&self, token: &str, limit: u32, window: Duration, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;
        let entry = windows.entry(token.to_string()).or_default();

        evict_expired(entry, window, now);

        if entry.len() >= limit as usize {
            debug!(
                count = entry.len(),
                limit = limit,
                "Sliding window full, rejecting request"
            );
            return false;
        }

        entry.push_back(now);
        true
    }

    /// Seconds until a slot frees up, evaluated at an explicit instant
    pub async fn retry_after_at(&self, token: &str, window: Duration, now: Instant) -> u64 {
        let windows = self.windows.lock().await;
        windows
            .get(token)
            .and_then(|entry| entry.front())
            .map(|oldest| {
                let elapsed = now.saturating_duration_since(*oldest);
                window.saturating_sub(elapsed).as_secs().max(1)
            })
            .unwrap_or(1)
    }

    /// Drop tokens whose windows no longer hold any request
    pub async fn prune(&self, window: Duration) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();

        windows.retain(|_, entry| {
            evict_expired(entry, window, now);
            !entry.is_empty()
        });

        if windows.len() != before {
            debug!(
                "Rate limiter prune: {} -> {} tracked keys",
                before,
                windows.len()
            );
        }
    }

    /// Number of tokens currently tracked
    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }
}

fn evict_expired(entry: &mut VecDeque<Instant>, window: Duration, now: Instant) {
    while let Some(oldest) = entry.front() {
        if now.saturating_duration_since(*oldest) >= window {
            entry.pop_front();
        } else {
            break;
        }
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn allow(&self, token: &str, limit: u32, window: Duration) -> bool {
        self.allow_at(token, limit, window, Instant::now()).await
    }

    async fn reset(&self, token: &str) {
        self.windows.lock().await.remove(token);
    }

    async fn retry_after(&self, token: &str, window: Duration) -> u64 {
        self.retry_after_at(token, window, Instant::now()).await
    }
}

/// Spawn a background task to periodically prune idle keys
pub fn spawn_prune_task(limiter: Arc<SlidingWindowLimiter>, window: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            limiter.prune(window).await;
        }
    });
}
