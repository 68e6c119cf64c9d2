//! Client result types
//!
//! Defines what the driver hands back to the operator after each command.

use std::path::PathBuf;

use crate::protocol::StatusLine;

/// What a command left behind locally, beyond its status lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// No payload moved (rejections, unknown verbs)
    None,
    Downloaded { path: PathBuf, bytes: u64 },
    Uploaded { bytes: u64 },
    Listing(Vec<String>),
    /// The session ended with this command
    Closed,
}

/// Result of one command: every status line the server sent for it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub statuses: Vec<StatusLine>,
    pub outcome: TransferOutcome,
}

impl Reply {
    pub fn status(status: StatusLine) -> Self {
        Self {
            statuses: vec![status],
            outcome: TransferOutcome::None,
        }
    }

    pub fn new(statuses: Vec<StatusLine>, outcome: TransferOutcome) -> Self {
        Self { statuses, outcome }
    }

    /// The last status line received, which decides the command's outcome.
    pub fn final_status(&self) -> Option<&StatusLine> {
        self.statuses.last()
    }

    pub fn is_success(&self) -> bool {
        !self.statuses.is_empty() && self.statuses.iter().all(StatusLine::is_success)
    }
}
