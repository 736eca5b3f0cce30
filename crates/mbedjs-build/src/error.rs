//! Error types for build orchestration.

use std::path::PathBuf;

use mbedjs_bundle::BundleError;
use mbedjs_codegen::CodegenError;
use mbedjs_targets::TargetError;
use thiserror::Error;

/// Lines of toolchain output shown in an error message. The full output is
/// kept in the error and in the log file.
const OUTPUT_TAIL_LINES: usize = 40;

/// A malformed stage graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("stage '{0}' is declared twice")]
    DuplicateStage(String),

    #[error("stage '{stage}' depends on unknown stage '{prerequisite}'")]
    UnknownPrerequisite { stage: String, prerequisite: String },

    #[error("stages form a cycle: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Errors that can occur while running a build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("invalid build graph: {0}")]
    Graph(#[from] GraphError),

    /// A library's metadata file was seen by the existence probe but was gone
    /// when it was read.
    #[error(
        "metadata for '{dependency}' disappeared between probe and read: {}",
        path.display()
    )]
    MetadataRace { dependency: String, path: PathBuf },

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully.
    #[error("'{command}' failed ({status})\n{}", output_tail(.output))]
    Toolchain {
        command: String,
        status: String,
        output: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("stage '{stage}' has no usable output from '{from}'")]
    MissingInput { stage: String, from: String },

    #[error("stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        source: Box<BuildError>,
    },

    #[error("build task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BuildError {
    /// Name of the stage that failed, if the error came from a stage.
    pub fn stage(&self) -> Option<&str> {
        match self {
            BuildError::StageFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// The underlying error with stage wrappers removed.
    pub fn root(&self) -> &BuildError {
        match self {
            BuildError::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

fn output_tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
