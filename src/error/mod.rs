//! Error handling
//!
//! Defines error types and their mapping to protocol status lines.

pub mod handlers;
pub mod types;

pub use types::*;
