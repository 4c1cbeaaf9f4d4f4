//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Shape of tokens issued by this service: `pk_` followed by unpadded base64url
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^pk_[A-Za-z0-9_-]{16,128}$").unwrap());

/// Result of checking prompt text before any token handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptCheck {
    /// Nothing but whitespace; answer with the greeting
    Empty,
    /// More characters than allowed
    TooLong { chars: usize, max: usize },
    Ok,
}

/// Classify prompt text. Length is counted in characters, not bytes.
pub fn check_prompt(text: &str, max_chars: usize) -> PromptCheck {
    if text.trim().is_empty() {
        return PromptCheck::Empty;
    }
    let chars = text.chars().count();
    if chars > max_chars {
        return PromptCheck::TooLong {
            chars,
            max: max_chars,
        };
    }
    PromptCheck::Ok
}

/// Whether a presented string could have been issued by this service
pub fn is_plausible_token(token: &str) -> bool {
    TOKEN_REGEX.is_match(token)
}
