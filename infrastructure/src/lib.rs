//! Infrastructure layer for orc
//!
//! Adapters implementing the ports defined in the application layer:
//! configuration loading, the model endpoint client, conversation stores,
//! prompt templates, tools and their search/query backends.

pub mod config;
pub mod logging;
pub mod model;
pub mod prompts;
pub mod query;
pub mod search;
pub mod store;
pub mod tools;

#[cfg(test)]
mod test_http;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig, StoreBackend};
pub use logging::JsonlConversationLogger;
pub use model::{OpenAiGateway, RetryPolicy};
pub use prompts::FileTemplateStore;
pub use query::HttpQueryEngine;
pub use search::HttpSearchBackend;
pub use store::{FileConversationStore, MemoryConversationStore};
pub use tools::{
    DataDictionary, JsonSchemaToolConverter, ToolBackends, ToolRegistry, builtin_registry,
};
