//! Module `state`
//!
//! Defines the `Session` struct tracking one control connection on the
//! server: the peer, the current state of the command exchange, and how many
//! commands it has handled.

use log::debug;
use std::net::{IpAddr, SocketAddr};

use crate::protocol::SessionState;

/// Represents the server side of a control-channel session.
///
/// Each accepted connection owns one; nothing in it is shared with other
/// sessions.
#[derive(Debug)]
pub struct Session {
    peer_addr: SocketAddr,
    state: SessionState,
    commands_handled: u64,
}

impl Session {
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            state: SessionState::AwaitCommand,
            commands_handled: 0,
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// IP the data channel is dialed back to.
    pub fn peer_ip(&self) -> IpAddr {
        self.peer_addr.ip()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn commands_handled(&self) -> u64 {
        self.commands_handled
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    // --------------------
    // Setter methods
    // --------------------

    /// Moves to `next`. A closed session stays closed.
    pub fn transition(&mut self, next: SessionState) {
        if self.state.is_closed() {
            return;
        }
        if self.state != next {
            debug!("Session {}: {} -> {}", self.peer_addr, self.state, next);
        }
        self.state = next;
    }

    /// Counts a completed command.
    pub fn record_command(&mut self) {
        self.commands_handled += 1;
    }
}
