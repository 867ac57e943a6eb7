//! Agent domain module
//!
//! An agent is one model persona: a fixed system prompt, a subset of the
//! registered tools, model parameters and the shape its answers must take.
//! Definitions are rebuilt for every request because the prompt embeds a
//! summary of the conversation so far.

pub mod definition;
pub mod model_params;

pub use definition::{AgentDefinition, AgentKind, ResponseContract};
pub use model_params::ModelParams;
