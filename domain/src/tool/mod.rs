//! Tool domain module
//!
//! Tools give agents capabilities beyond text generation: searching the
//! knowledge base, reading the data dictionary, running read-only queries.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolSpec     │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ (registry)   │    │ (invocation) │    │ (output)     │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! - [`ToolDefinition`]: name, description, parameters, [`ToolSafety`]
//! - [`ToolCall`]: an invocation with the model-assigned call id
//! - [`ToolResult`] / [`ToolError`]: dispatch outcome
//! - [`ToolHandler`] / [`ToolContext`]: the code behind one tool
//!
//! Pure definitions live here; execution lives behind the
//! `ToolExecutorPort` in the application layer.

pub mod entities;
pub mod handler;
pub mod names;
pub mod value_objects;

pub use entities::{ToolCall, ToolDefinition, ToolParameter, ToolSafety, ToolSpec};
pub use handler::{ToolContext, ToolHandler};
pub use value_objects::{ToolError, ToolResult};
