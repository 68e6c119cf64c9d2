//! Server core functionality
//!
//! This module contains the accept loop, the per-connection session loop and
//! the session state it drives.

pub mod core;
pub mod session;
pub mod state;

pub use self::core::Server;
pub use session::{handle_session, run_session};
pub use state::Session;
