//! Interactive console chat

mod repl;

pub use repl::ConsoleChat;
