//! Bundling errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while bundling a program.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("cannot resolve module '{specifier}' required from {}", from.display())]
    Resolution { specifier: String, from: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Result type for bundling operations.
pub type Result<T> = std::result::Result<T, BundleError>;
