//! Application-level configuration.
//!
//! - [`ExecutionParams`]: group chat loop control (window, tool turns, heartbeat)

pub mod execution_params;

pub use execution_params::ExecutionParams;
