//! Data models

mod admin;
mod api_key;
mod prompt;

pub use admin::*;
pub use api_key::*;
pub use prompt::*;
