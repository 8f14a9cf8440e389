//! Filesystem helpers used by the loader and the evaluator

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{QuillError, Result};

pub fn directory_exists(path: &Path) -> bool {
    path.is_dir()
}

pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

/// List regular files in `directory` whose name ends with `suffix`.
///
/// Returns bare file names, sorted so that callers see the same order on
/// every host.
pub fn list_files_matching(directory: &Path, suffix: &str) -> Result<Vec<String>> {
    let entries = fs::read_dir(directory).map_err(|e| QuillError::io(directory, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| QuillError::io(directory, e))?;
        if !entry.path().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(suffix) && name.len() > suffix.len() {
                names.push(name.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}

/// Read a whole file as text
pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| QuillError::io(path, e))
}

pub fn current_working_directory() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| QuillError::io(".", e))
}
