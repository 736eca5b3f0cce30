//! Error types for target operations.

use std::path::PathBuf;

/// Errors that can occur while resolving pin tables.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// I/O error reading a pin table or walking the search root.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// No pin table under the search root matches the target.
    #[error("no pin table for target {target} under {}", root.display())]
    NoPinTable {
        /// Target description, including the variant if any.
        target: String,
        /// Directory that was searched.
        root: PathBuf,
    },
}

/// Result type for target operations.
pub type Result<T> = std::result::Result<T, TargetError>;
