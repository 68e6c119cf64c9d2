//! Status lines
//!
//! Defines protocol status codes and the `SUCCESS|FAILURE <code> <reason>`
//! line format.

use std::fmt;

use crate::error::ProtocolError;

/// Standard status codes
pub const OK: u16 = 200;
pub const UPLOAD_COMPLETE: u16 = 201;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const SERVER_ERROR: u16 = 500;

const SUCCESS_WORD: &str = "SUCCESS";
const FAILURE_WORD: &str = "FAILURE";

/// Outcome word leading every status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// A single status line sent by the server on the control channel.
///
/// Equality compares outcome, code and reason; the received text is not
/// part of it.
#[derive(Debug, Clone)]
pub struct StatusLine {
    outcome: Outcome,
    code: u16,
    reason: String,
    /// Line as read off the wire, when this status was parsed
    raw: Option<String>,
}

impl PartialEq for StatusLine {
    fn eq(&self, other: &Self) -> bool {
        self.outcome == other.outcome && self.code == other.code && self.reason == other.reason
    }
}

impl Eq for StatusLine {}

impl StatusLine {
    pub fn success(code: u16, reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Success,
            code,
            reason: reason.into(),
            raw: None,
        }
    }

    pub fn failure(code: u16, reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failure,
            code,
            reason: reason.into(),
            raw: None,
        }
    }

    pub fn ok() -> Self {
        Self::success(OK, "OK")
    }

    pub fn goodbye() -> Self {
        Self::success(OK, "Goodbye")
    }

    pub fn upload_complete() -> Self {
        Self::success(UPLOAD_COMPLETE, "Upload Complete")
    }

    pub fn not_found() -> Self {
        Self::failure(NOT_FOUND, "File Not Found")
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::failure(BAD_REQUEST, reason)
    }

    pub fn server_error(reason: impl Into<String>) -> Self {
        Self::failure(SERVER_ERROR, reason)
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The line exactly as received, or the formatted line for statuses
    /// built locally.
    pub fn as_received(&self) -> String {
        match &self.raw {
            Some(raw) => raw.clone(),
            None => self.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Parses a received status line such as `FAILURE 404 File Not Found`.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidStatusLine(line.to_string());

        let mut parts = line.trim().splitn(3, ' ');
        let outcome = match parts.next() {
            Some(SUCCESS_WORD) => Outcome::Success,
            Some(FAILURE_WORD) => Outcome::Failure,
            _ => return Err(invalid()),
        };
        let code = parts
            .next()
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        let reason = parts.next().unwrap_or("").trim().to_string();

        Ok(Self {
            outcome,
            code,
            reason,
            raw: Some(line.to_string()),
        })
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self.outcome {
            Outcome::Success => SUCCESS_WORD,
            Outcome::Failure => FAILURE_WORD,
        };
        if self.reason.is_empty() {
            write!(f, "{} {}", word, self.code)
        } else {
            write!(f, "{} {} {}", word, self.code, self.reason)
        }
    }
}

/// Human-readable meaning of a status code, for operator output.
pub fn describe_code(code: u16) -> &'static str {
    match code {
        OK => "request accepted",
        UPLOAD_COMPLETE => "upload stored by the server",
        BAD_REQUEST => "the server rejected the request as malformed",
        NOT_FOUND => "the requested file does not exist on the server",
        SERVER_ERROR => "the server failed while handling the request",
        _ => "unrecognized status code",
    }
}
