//! Storage operations
//!
//! Handles file system operations behind GET, PUT and LS. Names are joined
//! onto the root as given; no traversal filtering happens here.

use log::{error, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File};

use crate::error::StorageError;
use crate::storage::results::{ListResult, RetrieveResult};

const LIST_RETRIES: u32 = 3;

/// Joins `name` onto `root`.
pub fn resolve_path(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

/// Creates `path` (and parents) if it does not exist yet.
pub async fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(path).await?;
    Ok(())
}

/// Lists regular files in `root`; directories are excluded.
pub async fn list_files(root: &Path) -> Result<ListResult, StorageError> {
    let mut attempt = 1;
    let mut dir = loop {
        match fs::read_dir(root).await {
            Ok(dir) => break dir,
            Err(e) if attempt < LIST_RETRIES && e.kind() == ErrorKind::PermissionDenied => {
                tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                attempt += 1;
            }
            Err(e) => {
                error!("Failed to list directory {}: {}", root.display(), e);
                return Err(StorageError::from(e));
            }
        }
    };

    let mut entries = Vec::new();
    while let Some(entry) = dir.next_entry().await? {
        if entry.file_type().await?.is_file() {
            entries.push(entry.file_name().to_string_lossy().to_string());
        }
    }

    info!("Listed directory {} - {} files", root.display(), entries.len());

    Ok(ListResult {
        entries,
        path: root.to_path_buf(),
    })
}

/// Opens `root/name` for a download and reports its size.
pub async fn open_for_download(
    root: &Path,
    name: &str,
) -> Result<(File, RetrieveResult), StorageError> {
    let file_path = resolve_path(root, name);

    let metadata = match fs::metadata(&file_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StorageError::FileNotFound(name.to_string()));
        }
        Err(e) => return Err(StorageError::from(e)),
    };

    if !metadata.is_file() {
        return Err(StorageError::NotAFile(name.to_string()));
    }
    if metadata.len() == 0 {
        return Err(StorageError::EmptyFile(name.to_string()));
    }

    let file = File::open(&file_path).await?;

    info!(
        "Prepared download of {} ({} bytes)",
        file_path.display(),
        metadata.len()
    );

    Ok((
        file,
        RetrieveResult {
            file_path,
            size: metadata.len(),
        },
    ))
}

/// Creates (or truncates) `root/name` for an upload.
pub async fn create_upload_file(root: &Path, name: &str) -> Result<(File, PathBuf), StorageError> {
    let file_path = resolve_path(root, name);
    let file = File::create(&file_path).await?;
    Ok((file, file_path))
}
