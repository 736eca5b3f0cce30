//! Build orchestration for mbedjs.
//!
//! A build is a graph of named stages: bundling the program, writing the
//! native build files, fetching the toolchain, extracting pins, aggregating
//! native libraries, generating C++ sources and compiling. Independent stages
//! run concurrently; each starts only once all of its prerequisites succeeded.

pub mod config;
pub mod error;
pub mod graph;
pub mod libraries;
pub mod pipeline;
pub mod report;
pub mod stages;
pub mod toolchain;

pub use config::{BuildConfig, BuildLayout, ProjectInfo, ToolchainConfig};
pub use error::{BuildError, GraphError};
pub use graph::{GraphOutcome, StageInputs, StageTiming, TaskGraph};
pub use libraries::{aggregate_libraries, Aggregation, LibraryDescriptor, MetadataIssue};
pub use pipeline::{build_graph, run_build, StageOutput};
pub use report::BuildReport;
pub use toolchain::{CommandOutput, ToolchainCommand};
