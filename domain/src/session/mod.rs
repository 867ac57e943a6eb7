//! Model session domain.
//!
//! - [`response::LlmResponse`]: one completed model turn
//! - [`stream::StreamEvent`]: incremental output of a streaming turn

pub mod response;
pub mod stream;
