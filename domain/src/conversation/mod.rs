//! Conversation domain.
//!
//! A [`Conversation`] is the durable record of one chat thread: the
//! user/assistant history used to build the next request, plus a log of
//! per-request [`Interaction`]s.

pub mod entities;

pub use entities::{Conversation, ConversationData, HistoryEntry, HistoryRole, Interaction};
