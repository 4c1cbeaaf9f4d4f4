//! Integration tests for the Pollinations relay
//!
//! These tests drive the full router against a temporary SQLite database
//! and a mock upstream.

mod admin_tests;
mod api_tests;
