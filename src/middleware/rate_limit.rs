//! Login throttling middleware
//!
//! Per-IP limit on admin login attempts to slow down password guessing.
//! Uses a keyed governor rate limiter.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};
use tracing::{debug, warn};

/// Keyed limiter tracking one bucket per client address
pub type IpRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Shared login limiter state
#[derive(Clone)]
pub struct LoginRateLimit {
    limiter: Arc<IpRateLimiter>,
}

impl LoginRateLimit {
    /// `requests_per_second` sustained, `burst` attempts at once
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    /// Admit one attempt from `ip`, or return how long it must wait
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        self.limiter
            .check_key(&ip)
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }

    /// Forget addresses whose buckets have refilled
    pub fn cleanup(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(
            "Login rate limiter cleanup: {} -> {} entries",
            before,
            self.limiter.len()
        );
    }
}

/// Client address from the connection, when the server provides it
fn client_ip(request: &Request<Body>) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Throttle requests per client address
pub async fn login_rate_limit_middleware(
    State(limit): State<LoginRateLimit>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&request);

    match limit.check(ip) {
        Ok(()) => next.run(request).await,
        Err(wait) => {
            warn!(ip = %ip, "Login rate limit exceeded");
            LoginRateLimited {
                retry_after_secs: wait.as_secs().max(1),
            }
            .into_response()
        }
    }
}

/// Too many login attempts
pub struct LoginRateLimited {
    pub retry_after_secs: u64,
}

impl IntoResponse for LoginRateLimited {
    fn into_response(self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, self.retry_after_secs.to_string())],
            "Too many login attempts. Please try again later.",
        )
            .into_response()
    }
}

/// Spawn a background task to periodically drop idle login buckets
pub fn spawn_login_limit_cleanup(limit: LoginRateLimit) {
    if tokio::runtime::Handle::try_current().is_err() {
        return;
    }
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            limit.cleanup();
        }
    });
}
