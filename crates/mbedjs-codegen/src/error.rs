//! Error types for code generation.

use std::path::PathBuf;

/// Errors that can occur while parsing, rendering or writing templates.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// Malformed template text.
    #[error("template syntax error at byte {offset}: {detail}")]
    Syntax {
        /// Byte offset of the offending tag.
        offset: usize,
        /// Description of the problem.
        detail: String,
    },

    /// A placeholder named a value that is not in the render context.
    #[error("unknown template variable '{name}'")]
    UnknownVariable {
        /// The dotted path as written in the template.
        name: String,
    },

    /// An `each` block was pointed at something that is not a list.
    #[error("template variable '{name}' is not a list")]
    NotAList {
        /// The dotted path as written in the template.
        name: String,
    },

    /// A context value could not be converted for rendering.
    #[error("cannot convert context value '{name}': {source}")]
    Value {
        /// Context key being inserted.
        name: String,
        /// Underlying serialization error.
        source: serde_json::Error,
    },

    /// Template file could not be found in the override directory or built-ins.
    #[error("template not found: {name}")]
    MissingTemplate {
        /// Template file name.
        name: String,
    },

    /// I/O error reading a template or writing a generated file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Result type for code generation operations.
pub type Result<T> = std::result::Result<T, CodegenError>;
