//! Terminal rendering of answers

pub mod console;
pub mod formatter;
