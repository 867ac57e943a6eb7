//! Prompt domain
//!
//! Placeholder rendering for agent prompts and the fixed prompt used to
//! summarize earlier conversation turns.

mod template;

pub use template::{CONVERSATION_JUST_STARTED, PromptTemplate, SummaryPrompt};
