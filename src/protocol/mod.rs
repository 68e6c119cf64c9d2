//! Control channel protocol
//!
//! Handles line framing, header blocks, command parsing, status lines and
//! the server-side command dispatcher.

pub mod commands;
pub mod framing;
pub mod handlers;
pub mod headers;
pub mod responses;
pub mod state;

pub use commands::{Command, CommandStatus, parse_command};
pub use framing::{receive_line, send_line};
pub use handlers::Dispatcher;
pub use headers::{HeaderBlock, receive_headers, send_headers};
pub use responses::StatusLine;
pub use state::SessionState;
