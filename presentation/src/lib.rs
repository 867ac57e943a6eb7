//! Presentation layer for orc
//!
//! This crate contains the HTTP surface, CLI definitions, output formatters
//! and the interactive console chat.

pub mod chat;
pub mod cli;
pub mod output;
pub mod server;

// Re-export commonly used types
pub use chat::ConsoleChat;
pub use cli::commands::{Cli, Command, OutputFormat};
pub use output::console::ConsoleFormatter;
pub use output::formatter::OutputFormatter;
pub use server::{router, serve};
