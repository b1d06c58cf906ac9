//! CLI command handlers.

pub mod ask;
pub mod chat;
pub mod config;
pub mod health;
pub mod render;
pub mod sessions;
