//! Logging middleware
//!
//! Session-level log lines shared by the accept loop and the dispatcher.

use log::info;
use std::net::SocketAddr;

use crate::protocol::{Command, StatusLine};

/// Log a client connection
pub fn log_connection(client_addr: SocketAddr) {
    info!("Connection established with {}", client_addr);
}

/// Log a received command
pub fn log_command(client_addr: SocketAddr, command: &Command) {
    info!(
        "Received {} command from {}: {}",
        command.verb(),
        client_addr,
        command
    );
}

/// Log a status line sent on the control channel
pub fn log_status(client_addr: SocketAddr, status: &StatusLine) {
    info!("Sending response to client {}: {}", client_addr, status);
}

/// Log the end of a session
pub fn log_disconnect(client_addr: SocketAddr, commands_handled: u64) {
    info!(
        "Connection with {} closed after {} commands",
        client_addr, commands_handled
    );
}
