//! Storage result types
//!
//! Defines result structures returned by storage operations.

use std::path::PathBuf;

/// Result of listing the upload directory
#[derive(Debug, Clone)]
pub struct ListResult {
    pub entries: Vec<String>,
    pub path: PathBuf,
}

impl ListResult {
    /// Serializes the listing as UTF-8, one file name per line.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.entries.join("\n").into_bytes()
    }
}

/// Result of preparing a file for download
#[derive(Debug, Clone)]
pub struct RetrieveResult {
    pub file_path: PathBuf,
    pub size: u64,
}
