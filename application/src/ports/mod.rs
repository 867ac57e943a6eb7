//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod conversation_logger;
pub mod conversation_store;
pub mod llm_gateway;
pub mod query_engine;
pub mod search_backend;
pub mod template_store;
pub mod tool_executor;
pub mod tool_schema;
