//! Conversation store adapters.
//!
//! - [`MemoryConversationStore`]: process-local, for development and tests
//! - [`FileConversationStore`]: one JSON document per conversation

mod file;
mod memory;

pub use file::FileConversationStore;
pub use memory::MemoryConversationStore;
