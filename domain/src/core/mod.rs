//! Core domain concepts shared across all subdomains.
//!
//! - [`question::Question`]: a validated user ask
//! - [`credentials::Credentials`]: the caller identity threaded into tools
//! - [`error::DomainError`]: domain-level errors

pub mod credentials;
pub mod error;
pub mod question;
