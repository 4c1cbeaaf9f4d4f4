//! Pollinations text API client
//!
//! One GET per relayed prompt. The prompt becomes the final path segment of
//! the configured base URL. No retries.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;

/// Failure talking to the upstream text API
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream returned status {0}")]
    Status(StatusCode),
    #[error("upstream request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if let Some(status) = err.status() {
            UpstreamError::Status(status)
        } else if err.is_connect() {
            UpstreamError::Transport("failed to connect to upstream".to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// HTTP client for the upstream text generation endpoint
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let timeout = config.timeout();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pollinations-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL for a prompt, escaped as a single path segment
    pub fn prompt_url(&self, prompt: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(prompt))
    }

    /// Send `prompt` upstream and return the response body verbatim
    pub async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let url = self.prompt_url(prompt);
        debug!(chars = prompt.chars().count(), "Dispatching prompt upstream");

        let response = self.client.get(&url).send().await.map_err(|e| {
            let err = UpstreamError::from(e);
            warn!(error = %err, timeout_secs = self.timeout.as_secs(), "Upstream request failed");
            err
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Upstream returned non-success status");
            return Err(UpstreamError::Status(status));
        }

        let body = response.text().await.map_err(UpstreamError::from)?;
        debug!(bytes = body.len(), "Upstream response received");
        Ok(body)
    }
}
