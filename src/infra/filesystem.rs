//! Filesystem operations
//!
//! Unprivileged helpers for directories owned by the invoking user. Anything
//! under the sysroot base goes through a privileged command instead.

use std::path::Path;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Whether `path` is a directory with no entries
pub fn is_dir_empty(path: &Path) -> Result<bool, FilesystemError> {
    let mut entries = std::fs::read_dir(path).map_err(|e| FilesystemError::ReadDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(entries.next().is_none())
}

/// Whether `path` exists and has at least one entry
///
/// A missing path counts as empty.
pub fn is_populated(path: &Path) -> Result<bool, FilesystemError> {
    if !path.exists() {
        return Ok(false);
    }
    is_dir_empty(path).map(|empty| !empty)
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    std::fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}
