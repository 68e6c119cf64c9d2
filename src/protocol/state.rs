//! Module `state`
//!
//! States shared by the server dispatcher and the client driver while a
//! single command moves through its exchange.

use std::fmt;

/// Where a session is within the current command's exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    AwaitCommand,
    Validate,
    NegotiateDataChannel,
    Transfer,
    ReportStatus,
    Closed,
}

impl SessionState {
    pub fn is_closed(&self) -> bool {
        *self == SessionState::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::AwaitCommand => "AWAIT_COMMAND",
            SessionState::Validate => "VALIDATE",
            SessionState::NegotiateDataChannel => "NEGOTIATE_DATA_CHANNEL",
            SessionState::Transfer => "TRANSFER",
            SessionState::ReportStatus => "REPORT_STATUS",
            SessionState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}
