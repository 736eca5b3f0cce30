//! The build graph.
//!
//! | stage                     | waits for                                  |
//! |---------------------------|--------------------------------------------|
//! | `bundle`                  |                                            |
//! | `write-configs`           |                                            |
//! | `aggregate-libraries`     |                                            |
//! | `fetch-toolchain`         | `write-configs`                            |
//! | `extract-pins`            | `fetch-toolchain`                          |
//! | `generate-program-source` | `bundle`, `extract-pins`                   |
//! | `generate-entry-point`    | `aggregate-libraries`                      |
//! | `compile`                 | both generators, `write-configs`, `aggregate-libraries` |

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use mbedjs_bundle::BundleArtifact;
use mbedjs_codegen::GeneratedFile;
use mbedjs_targets::PinEntry;
use tracing::info;

use crate::config::BuildConfig;
use crate::error::{GraphError, Result};
use crate::graph::{StageInputs, TaskGraph};
use crate::libraries::Aggregation;
use crate::report::BuildReport;
use crate::stages;

pub const STAGE_BUNDLE: &str = "bundle";
pub const STAGE_WRITE_CONFIGS: &str = "write-configs";
pub const STAGE_AGGREGATE_LIBRARIES: &str = "aggregate-libraries";
pub const STAGE_FETCH_TOOLCHAIN: &str = "fetch-toolchain";
pub const STAGE_EXTRACT_PINS: &str = "extract-pins";
pub const STAGE_GENERATE_PROGRAM_SOURCE: &str = "generate-program-source";
pub const STAGE_GENERATE_ENTRY_POINT: &str = "generate-entry-point";
pub const STAGE_COMPILE: &str = "compile";

/// What a stage hands to its dependents.
#[derive(Debug)]
pub enum StageOutput {
    Done,
    Bundle(BundleArtifact),
    Pins(Vec<PinEntry>),
    Libraries(Aggregation),
    Generated(Vec<GeneratedFile>),
    Log(PathBuf),
}

impl StageOutput {
    pub fn as_bundle(&self) -> Option<&BundleArtifact> {
        match self {
            StageOutput::Bundle(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn as_pins(&self) -> Option<&[PinEntry]> {
        match self {
            StageOutput::Pins(pins) => Some(pins),
            _ => None,
        }
    }

    pub fn as_libraries(&self) -> Option<&Aggregation> {
        match self {
            StageOutput::Libraries(aggregation) => Some(aggregation),
            _ => None,
        }
    }

    /// Files written by the stage; empty for stages that write none.
    pub fn generated(&self) -> &[GeneratedFile] {
        match self {
            StageOutput::Generated(files) => files,
            _ => &[],
        }
    }

    pub fn as_log(&self) -> Option<&Path> {
        match self {
            StageOutput::Log(path) => Some(path),
            _ => None,
        }
    }
}

fn bind<F, Fut>(config: &Arc<BuildConfig>, stage: F) -> impl FnOnce(StageInputs<StageOutput>) -> Fut + Send + 'static
where
    F: FnOnce(Arc<BuildConfig>, StageInputs<StageOutput>) -> Fut + Send + 'static,
{
    let config = Arc::clone(config);
    move |inputs| stage(config, inputs)
}

/// The full build as a stage graph.
pub fn build_graph(config: &Arc<BuildConfig>) -> TaskGraph<StageOutput> {
    let mut graph = TaskGraph::new();
    graph
        .add_stage(STAGE_BUNDLE, &[], bind(config, stages::bundle))
        .add_stage(STAGE_WRITE_CONFIGS, &[], bind(config, stages::write_configs))
        .add_stage(STAGE_AGGREGATE_LIBRARIES, &[], bind(config, stages::aggregate))
        .add_stage(
            STAGE_FETCH_TOOLCHAIN,
            &[STAGE_WRITE_CONFIGS],
            bind(config, stages::fetch_toolchain),
        )
        .add_stage(
            STAGE_EXTRACT_PINS,
            &[STAGE_FETCH_TOOLCHAIN],
            bind(config, stages::extract_pins),
        )
        .add_stage(
            STAGE_GENERATE_PROGRAM_SOURCE,
            &[STAGE_BUNDLE, STAGE_EXTRACT_PINS],
            bind(config, stages::generate_program_source),
        )
        .add_stage(
            STAGE_GENERATE_ENTRY_POINT,
            &[STAGE_AGGREGATE_LIBRARIES],
            bind(config, stages::generate_entry_point),
        )
        .add_stage(
            STAGE_COMPILE,
            &[
                STAGE_GENERATE_PROGRAM_SOURCE,
                STAGE_GENERATE_ENTRY_POINT,
                STAGE_WRITE_CONFIGS,
                STAGE_AGGREGATE_LIBRARIES,
            ],
            bind(config, stages::compile),
        );
    graph
}

/// Stage names grouped into levels that can run concurrently.
pub fn plan(config: &Arc<BuildConfig>) -> std::result::Result<Vec<Vec<String>>, GraphError> {
    build_graph(config).plan()
}

/// Run the whole build and summarize it.
pub async fn run_build(config: BuildConfig) -> Result<BuildReport> {
    let config = Arc::new(config);
    let started = Instant::now();
    info!(
        project = %config.project.name,
        board = %config.target,
        build_dir = %config.layout.build_dir.display(),
        "starting build"
    );

    let outcome = build_graph(&config).run().await?;
    let report = BuildReport::from_outcome(&config, &outcome, started.elapsed());
    info!(elapsed_ms = report.elapsed.as_millis() as u64, "build finished");
    Ok(report)
}
