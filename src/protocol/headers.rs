//! Header block codec.
//!
//! A header block is a sequence of `Key: Value` lines terminated by an empty
//! line. It follows payload-bearing commands on the control channel and opens
//! every data channel.

use log::warn;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;
use crate::protocol::framing::receive_line;

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const DATA_PORT: &str = "Data-Port";

const SEPARATOR: &str = ": ";

/// Ordered set of headers with case-sensitive, unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    entries: Vec<(String, String)>,
}

impl HeaderBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Numeric lookup; missing or unparsable values read as `0`.
    pub fn get_number(&self, key: &str) -> u64 {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0)
    }

    pub fn content_length(&self) -> u64 {
        self.get_number(CONTENT_LENGTH)
    }

    /// `Data-Port` value, `0` when absent or out of range.
    pub fn data_port(&self) -> u16 {
        u16::try_from(self.get_number(DATA_PORT)).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Writes every header in insertion order followed by the blank terminator.
pub async fn send_headers<W>(conn: &mut W, headers: &HeaderBlock) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = String::new();
    for (key, value) in headers.iter() {
        if key.contains('\n') || value.contains('\n') {
            return Err(ProtocolError::EmbeddedNewline);
        }
        buf.push_str(key);
        buf.push_str(SEPARATOR);
        buf.push_str(value);
        buf.push('\n');
    }
    buf.push('\n');

    conn.write_all(buf.as_bytes()).await?;
    conn.flush().await?;
    Ok(())
}

/// Reads lines up to the first empty one. Lines without `": "` are skipped.
///
/// An overlong or non-UTF-8 line fails the block, but only after the rest of
/// the block has been read, so the stream stays aligned on the next line.
pub async fn receive_headers<R>(conn: &mut R) -> Result<HeaderBlock, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = HeaderBlock::new();
    let mut malformed = None;

    loop {
        let line = match receive_line(conn).await {
            Ok(Some(line)) => line,
            Ok(None) => return Err(ProtocolError::UnexpectedEof("header block")),
            Err(e @ (ProtocolError::LineTooLong(_) | ProtocolError::InvalidUtf8)) => {
                warn!("Unreadable header line: {}", e);
                if malformed.is_none() {
                    malformed = Some(e);
                }
                continue;
            }
            Err(e) => return Err(e),
        };

        if line.is_empty() {
            return match malformed {
                Some(e) => Err(e),
                None => Ok(headers),
            };
        }

        match line.split_once(SEPARATOR) {
            Some((key, value)) if !key.is_empty() => headers.insert(key, value),
            _ => warn!("Skipping malformed header line: {:?}", line),
        }
    }
}
