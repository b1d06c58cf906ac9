//! Core steve library: config, sessions, markdown rendering and the chat
//! transport.

pub mod chat;
pub mod config;
pub mod interrupt;
pub mod markdown;
pub mod session;
