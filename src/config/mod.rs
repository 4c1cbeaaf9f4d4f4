//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_database_url() -> String {
    "sqlite://./data/api_keys.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Upstream text generation endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL; the escaped prompt is appended as the last path segment
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    /// Timeout in seconds (supports both timeout_secs and timeout field names)
    #[serde(default = "default_timeout", alias = "timeout")]
    pub timeout_secs: u64,
}

fn default_upstream_url() -> String {
    "https://text.pollinations.ai/prompt".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Prompt relay limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Maximum prompt length in characters
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    /// Requests allowed per key within the sliding window
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,
    /// Sliding window length in seconds
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,
}

fn default_max_prompt_chars() -> usize {
    1000
}

fn default_rate_limit_requests() -> u32 {
    100
}

fn default_rate_limit_window() -> u64 {
    3600
}

impl RelayConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window(),
        }
    }
}

/// Admin panel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    /// Initial password for the admin account. When unset a random one is
    /// generated on first start and logged once.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: u64,
    /// Login attempts per second allowed from a single IP
    #[serde(default = "default_login_rps")]
    pub login_requests_per_second: u32,
    #[serde(default = "default_login_burst")]
    pub login_burst: u32,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_session_ttl() -> u64 {
    480
}

/// Longest accepted admin session lifetime (one year)
pub const MAX_SESSION_TTL_MINUTES: u64 = 525_600;

fn default_login_rps() -> u32 {
    1
}

fn default_login_burst() -> u32 {
    5
}

impl AdminConfig {
    /// Session lifetime, clamped to [`MAX_SESSION_TTL_MINUTES`]
    pub fn session_ttl(&self) -> chrono::Duration {
        i64::try_from(self.session_ttl_minutes.min(MAX_SESSION_TTL_MINUTES))
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or_else(|| chrono::Duration::minutes(default_session_ttl() as i64))
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: None,
            session_ttl_minutes: default_session_ttl(),
            login_requests_per_second: default_login_rps(),
            login_burst: default_login_burst(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default)]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file" or "both")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_prefix() -> String {
    "pollinations-relay".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            upstream: UpstreamConfig::default(),
            relay: RelayConfig::default(),
            admin: AdminConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables (prefixed with RELAY_)
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("RELAY_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                Self::from_file(path)?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/pollinations-relay/config.yaml"),
            dirs::config_dir()
                .map(|p| p.join("pollinations-relay/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("RELAY_HOST") {
            self.server.host = host;
        }
        // PORT is what most PaaS runtimes inject; RELAY_PORT wins when both are set
        for var in ["PORT", "RELAY_PORT"] {
            if let Ok(port) = std::env::var(var) {
                if let Ok(p) = port.parse() {
                    self.server.port = p;
                }
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(url) = std::env::var("RELAY_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Ok(timeout) = std::env::var("RELAY_UPSTREAM_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.upstream.timeout_secs = t;
            }
        }

        if let Ok(limit) = std::env::var("RELAY_RATE_LIMIT") {
            if let Ok(n) = limit.parse() {
                self.relay.rate_limit_requests = n;
            }
        }
        if let Ok(window) = std::env::var("RELAY_RATE_WINDOW_SECS") {
            if let Ok(w) = window.parse() {
                self.relay.rate_limit_window_secs = w;
            }
        }

        if let Ok(username) = std::env::var("RELAY_ADMIN_USERNAME") {
            self.admin.username = username;
        }
        if let Ok(password) = std::env::var("RELAY_ADMIN_PASSWORD") {
            if !password.is_empty() {
                self.admin.password = Some(password);
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("RELAY_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
        if let Ok(target) = std::env::var("RELAY_LOG_TARGET") {
            self.logging.target = match target.to_lowercase().as_str() {
                "file" => LogTarget::File,
                "both" => LogTarget::Both,
                _ => LogTarget::Console,
            };
        }
        if let Ok(dir) = std::env::var("RELAY_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if !self.upstream.base_url.starts_with("http://")
            && !self.upstream.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "Upstream URL must start with http:// or https://: {}",
                self.upstream.base_url
            );
        }
        if self.upstream.timeout_secs == 0 {
            anyhow::bail!("Upstream timeout must be greater than 0");
        }

        if self.relay.max_prompt_chars == 0 {
            anyhow::bail!("max_prompt_chars must be greater than 0");
        }
        if self.relay.rate_limit_requests == 0 {
            anyhow::bail!("rate_limit_requests must be greater than 0");
        }
        if self.relay.rate_limit_window_secs == 0 {
            anyhow::bail!("rate_limit_window_secs must be greater than 0");
        }

        if self.admin.username.trim().is_empty() {
            anyhow::bail!("Admin username cannot be empty");
        }
        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&self.admin.session_ttl_minutes) {
            anyhow::bail!(
                "session_ttl_minutes must be between 1 and {}: {}",
                MAX_SESSION_TTL_MINUTES,
                self.admin.session_ttl_minutes
            );
        }

        Ok(())
    }
}
