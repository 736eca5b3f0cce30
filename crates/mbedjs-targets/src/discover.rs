//! Discovery of the pin table for a target.
//!
//! The search walks the pin definition subtree in lexical file-name order, so
//! when several tables match the selector the first one is always the same
//! file regardless of the filesystem's own directory order.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, TargetError};
use crate::target::TargetSelector;

/// File name of a pin table, compared case-insensitively.
pub const PIN_TABLE_FILE: &str = "pins.js";

/// All pin tables under `root` that match `selector`, in search order.
pub fn matching_tables(root: &Path, selector: &TargetSelector) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_table = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.eq_ignore_ascii_case(PIN_TABLE_FILE));
        if !is_table {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if selector.matches_path(relative) {
            debug!(path = %entry.path().display(), "pin table matches target");
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// The pin table to use for `selector`: the first match under `root`.
pub fn find_pin_table(root: &Path, selector: &TargetSelector) -> Result<PathBuf> {
    let mut tables = matching_tables(root, selector)?;
    if tables.len() > 1 {
        warn!(
            board = %selector,
            count = tables.len(),
            chosen = %tables[0].display(),
            "several pin tables match, using the first in lexical order"
        );
    }
    if tables.is_empty() {
        return Err(TargetError::NoPinTable {
            target: selector.to_string(),
            root: root.to_path_buf(),
        });
    }
    Ok(tables.swap_remove(0))
}

fn walk_error(root: &Path, err: walkdir::Error) -> TargetError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop while searching for pin tables"));
    TargetError::Io { path, source }
}
