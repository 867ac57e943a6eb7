//! Model endpoint adapter.
//!
//! - [`OpenAiGateway`]: [`LlmGateway`](orc_application::LlmGateway) over an
//!   OpenAI-compatible (or Azure OpenAI) chat-completion endpoint
//! - [`RetryPolicy`]: bounded exponential backoff for throttling and outages
//! - `wire`: request/response bodies and stream-chunk accumulation

mod client;
mod retry;
mod wire;

pub use client::OpenAiGateway;
pub use retry::RetryPolicy;
