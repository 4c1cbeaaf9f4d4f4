//! Relay request and response envelopes

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Greeting returned for empty prompts and the root endpoint
pub const GREETING: &str =
    "Hey! What's on your mind? Looking to start a chat, brainstorm something, or just say hi?";

/// Prompt relay request (JSON body or query string)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Metadata attached to a successful relay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayData {
    pub original_prompt: String,
    pub token_prefix: String,
}

/// Standard success envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<RelayData>,
    pub timestamp: String,
}

impl StandardResponse {
    pub fn success(message: impl Into<String>, data: Option<RelayData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn greeting() -> Self {
        Self::success(GREETING, None)
    }
}
