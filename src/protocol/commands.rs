//! Module `commands`
//!
//! Defines the command lines understood on the control channel and the
//! parsing of raw operator or wire input into them.

use std::fmt;

/// Represents a command parsed from a control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get(String), // Download a file from the server
    Put(String), // Upload a file to the server
    Ls,
    Quit,
    /// Known verb with the wrong number of arguments.
    Malformed { verb: String, reason: String },
    /// Unrecognized verb; holds the raw line.
    Unknown(String),
}

/// Outcome of handling one command on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure(u16),
    CloseConnection,
}

impl Command {
    /// Whether a header block follows the command line on the wire.
    ///
    /// Holds for every payload verb, even when its arguments are malformed,
    /// so both peers agree on where the next command starts.
    pub fn carries_headers(&self) -> bool {
        match self {
            Command::Get(_) | Command::Put(_) | Command::Ls => true,
            Command::Malformed { verb, .. } => verb_carries_headers(verb),
            Command::Quit | Command::Unknown(_) => false,
        }
    }

    /// Canonical verb, or `UNKNOWN` for unrecognized lines.
    pub fn verb(&self) -> &str {
        match self {
            Command::Get(_) => "GET",
            Command::Put(_) => "PUT",
            Command::Ls => "LS",
            Command::Quit => "QUIT",
            Command::Malformed { verb, .. } => verb,
            Command::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Get(name) => write!(f, "GET {}", name),
            Command::Put(name) => write!(f, "PUT {}", name),
            Command::Ls => write!(f, "LS"),
            Command::Quit => write!(f, "QUIT"),
            Command::Malformed { verb, .. } => write!(f, "{}", verb),
            Command::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

fn verb_carries_headers(verb: &str) -> bool {
    matches!(verb, "GET" | "PUT" | "LS")
}

/// Parses a raw command line into the `Command` enum.
///
/// Verbs are matched case-insensitively. `GET` and `PUT` take exactly one
/// argument, `LS` and `QUIT` take none.
pub fn parse_command(raw: &str) -> Command {
    let trimmed = raw.trim();
    let mut parts = trimmed.split_whitespace();
    let verb = parts.next().unwrap_or("").to_ascii_uppercase();
    let args: Vec<&str> = parts.collect();

    let malformed = |verb: &str| Command::Malformed {
        verb: verb.to_string(),
        reason: format!("Invalid {} command format", verb),
    };

    match (verb.as_str(), args.as_slice()) {
        ("GET", [name]) => Command::Get(name.to_string()),
        ("PUT", [name]) => Command::Put(name.to_string()),
        ("LS", []) => Command::Ls,
        ("QUIT", []) => Command::Quit,
        ("GET" | "PUT" | "LS" | "QUIT", _) => malformed(&verb),
        _ => Command::Unknown(trimmed.to_string()),
    }
}
