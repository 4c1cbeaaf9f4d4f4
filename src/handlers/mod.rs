//! Server-rendered HTML handlers

pub mod admin;
