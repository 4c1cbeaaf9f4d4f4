//! Business logic services

pub mod admin;
pub mod keys;
pub mod rate_limiter;
pub mod session;
pub mod upstream;

pub use admin::{AdminSeed, AdminService};
pub use keys::{generate_token, KeyError, KeyService};
pub use rate_limiter::{RateLimiter, SlidingWindowLimiter};
pub use session::{InMemorySessionStore, SessionStore};
pub use upstream::{UpstreamClient, UpstreamError};
