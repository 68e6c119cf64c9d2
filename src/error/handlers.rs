//! Error handlers
//!
//! Maps errors onto the status lines reported on the control channel.

use crate::error::types::{FtpError, StorageError, TransferError};
use crate::protocol::responses::{self, StatusLine};
use log::error;

/// Log an error raised while handling a command
pub fn handle_error(err: &FtpError) {
    error!("Command failed: {}", err);
}

/// Convert error to a protocol status code
pub fn error_to_status_code(err: &FtpError) -> u16 {
    match err {
        FtpError::Storage(StorageError::FileNotFound(_)) => responses::NOT_FOUND,
        FtpError::Storage(StorageError::NotAFile(_)) => responses::NOT_FOUND,
        FtpError::Storage(StorageError::EmptyFile(_)) => responses::BAD_REQUEST,
        FtpError::Transfer(TransferError::InvalidLength) => responses::BAD_REQUEST,
        FtpError::Protocol(_) => responses::BAD_REQUEST,
        FtpError::InvalidInput(_) => responses::BAD_REQUEST,
        FtpError::Storage(_) => responses::SERVER_ERROR,
        FtpError::Channel(_) => responses::SERVER_ERROR,
        FtpError::Transfer(_) => responses::SERVER_ERROR,
        FtpError::Config(_) => responses::SERVER_ERROR,
        FtpError::IoError(_) => responses::SERVER_ERROR,
    }
}

/// Build the failure status line reported for an error
pub fn error_to_status(err: &FtpError) -> StatusLine {
    let reason = match err {
        FtpError::Storage(StorageError::FileNotFound(_) | StorageError::NotAFile(_)) => {
            "File Not Found"
        }
        FtpError::Storage(StorageError::EmptyFile(_)) => "Invalid file size",
        FtpError::Transfer(TransferError::InvalidLength) => "Invalid file size",
        FtpError::Transfer(_) => "Transfer Failed",
        FtpError::Channel(_) => "Data Connection Failed",
        FtpError::Protocol(_) | FtpError::InvalidInput(_) => "Bad Request",
        FtpError::Storage(_) | FtpError::Config(_) | FtpError::IoError(_) => {
            "Internal Server Error"
        }
    };
    StatusLine::failure(error_to_status_code(err), reason)
}
