//! File system storage
//!
//! Resolves names against the upload directory, lists it, and opens files for
//! the transfer engine.

pub mod operations;
pub mod results;

pub use operations::{
    create_upload_file, ensure_directory, list_files, open_for_download, resolve_path,
};
pub use results::{ListResult, RetrieveResult};
