//! Transfer module
//!
//! Handles per-transfer data channels and the byte-exact transfer engine.

pub mod data_channel;
pub mod engine;

// Re-export key types and functions
pub use data_channel::{DataChannel, DataListener};
pub use engine::{CHUNK_SIZE, receive_stream, send_stream};
