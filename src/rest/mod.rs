//! Discord REST API: log messages, interaction replies and slash-command
//! registration.

pub mod client;
pub mod commands;
pub mod models;

pub use client::{DiscordRest, RestError};
pub use commands::{sync_commands, topic_command};
