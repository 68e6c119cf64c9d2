//! Error types
//!
//! Defines domain-specific error types for each layer of the protocol.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// Control-channel framing errors (lines and header blocks)
#[derive(Debug)]
pub enum ProtocolError {
    Io(io::Error),
    LineTooLong(usize),
    EmbeddedNewline,
    InvalidUtf8,
    UnexpectedEof(&'static str),
    InvalidStatusLine(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
            ProtocolError::LineTooLong(limit) => {
                write!(f, "Line exceeds maximum length of {} bytes", limit)
            }
            ProtocolError::EmbeddedNewline => write!(f, "Line contains an embedded newline"),
            ProtocolError::InvalidUtf8 => write!(f, "Line is not valid UTF-8"),
            ProtocolError::UnexpectedEof(ctx) => write!(f, "Peer closed the connection during {}", ctx),
            ProtocolError::InvalidStatusLine(line) => write!(f, "Invalid status line: {:?}", line),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for ProtocolError {
    fn from(error: io::Error) -> Self {
        ProtocolError::Io(error)
    }
}

/// Data channel negotiation errors
#[derive(Debug)]
pub enum ChannelError {
    BindFailed(io::Error),
    AcceptFailed(io::Error),
    AcceptTimeout(Duration),
    ConnectFailed(SocketAddr, io::Error),
    ConnectTimeout(SocketAddr),
    InvalidPort,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::BindFailed(e) => write!(f, "Failed to bind data listener: {}", e),
            ChannelError::AcceptFailed(e) => write!(f, "Failed to accept data connection: {}", e),
            ChannelError::AcceptTimeout(t) => {
                write!(f, "No data connection arrived within {:?}", t)
            }
            ChannelError::ConnectFailed(addr, e) => {
                write!(f, "Failed to connect data channel to {}: {}", addr, e)
            }
            ChannelError::ConnectTimeout(addr) => {
                write!(f, "Timeout connecting data channel to {}", addr)
            }
            ChannelError::InvalidPort => write!(f, "Missing or invalid Data-Port"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Transfer engine errors
#[derive(Debug)]
pub enum TransferError {
    InvalidLength,
    Truncated { expected: u64, received: u64 },
    SourceExhausted { expected: u64, sent: u64 },
    Header(ProtocolError),
    Io(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::InvalidLength => write!(f, "Invalid Content-Length (must be non-zero)"),
            TransferError::Truncated { expected, received } => write!(
                f,
                "Transfer truncated: received {} of {} bytes",
                received, expected
            ),
            TransferError::SourceExhausted { expected, sent } => write!(
                f,
                "Source ended early: sent {} of {} bytes",
                sent, expected
            ),
            TransferError::Header(e) => write!(f, "Data channel header error: {}", e),
            TransferError::Io(e) => write!(f, "Transfer failed: {}", e),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<io::Error> for TransferError {
    fn from(error: io::Error) -> Self {
        TransferError::Io(error)
    }
}

impl From<ProtocolError> for TransferError {
    fn from(error: ProtocolError) -> Self {
        TransferError::Header(error)
    }
}

/// Upload directory errors
#[derive(Debug)]
pub enum StorageError {
    FileNotFound(String),
    NotAFile(String),
    EmptyFile(String),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::FileNotFound(p) => write!(f, "File not found: {}", p),
            StorageError::NotAFile(p) => write!(f, "Not a regular file: {}", p),
            StorageError::EmptyFile(p) => write!(f, "File is empty: {}", p),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

/// General error that encompasses all error types
#[derive(Debug)]
pub enum FtpError {
    Protocol(ProtocolError),
    Channel(ChannelError),
    Transfer(TransferError),
    Storage(StorageError),
    Config(config::ConfigError),
    InvalidInput(String),
    IoError(io::Error),
}

impl fmt::Display for FtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpError::Protocol(e) => write!(f, "Protocol error: {}", e),
            FtpError::Channel(e) => write!(f, "Data channel error: {}", e),
            FtpError::Transfer(e) => write!(f, "Transfer error: {}", e),
            FtpError::Storage(e) => write!(f, "Storage error: {}", e),
            FtpError::Config(e) => write!(f, "Configuration error: {}", e),
            FtpError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            FtpError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FtpError {}

impl From<ProtocolError> for FtpError {
    fn from(error: ProtocolError) -> Self {
        FtpError::Protocol(error)
    }
}

impl From<ChannelError> for FtpError {
    fn from(error: ChannelError) -> Self {
        FtpError::Channel(error)
    }
}

impl From<TransferError> for FtpError {
    fn from(error: TransferError) -> Self {
        FtpError::Transfer(error)
    }
}

impl From<StorageError> for FtpError {
    fn from(error: StorageError) -> Self {
        FtpError::Storage(error)
    }
}

impl From<config::ConfigError> for FtpError {
    fn from(error: config::ConfigError) -> Self {
        FtpError::Config(error)
    }
}

impl From<io::Error> for FtpError {
    fn from(error: io::Error) -> Self {
        FtpError::IoError(error)
    }
}
