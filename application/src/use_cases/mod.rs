//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod group_chat;
pub mod orchestrator;
pub mod strategies;
pub mod stream_answer;
pub mod summarize;

#[cfg(test)]
pub(crate) mod test_support;
