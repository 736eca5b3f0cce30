//! Build report.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use mbedjs_codegen::GeneratedFile;
use serde::Serialize;

use crate::config::BuildConfig;
use crate::graph::{GraphOutcome, StageTiming};
use crate::libraries::MetadataIssue;
use crate::pipeline::{
    StageOutput, STAGE_AGGREGATE_LIBRARIES, STAGE_BUNDLE, STAGE_COMPILE, STAGE_EXTRACT_PINS,
};

/// Summary of a finished build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Project name.
    pub project: String,
    /// Target board, with variant.
    pub target: String,
    #[serde(serialize_with = "as_millis")]
    pub elapsed: Duration,
    /// Stages in completion order.
    pub stages: Vec<StageTiming>,
    /// Size of the minified program in bytes.
    pub bundle_bytes: usize,
    /// Number of pins exposed to the program.
    pub pin_count: usize,
    /// Native libraries compiled in.
    pub libraries: Vec<String>,
    /// Dependencies left out because of bad metadata.
    pub skipped_libraries: Vec<MetadataIssue>,
    /// Files written into the staging directory.
    pub generated: Vec<GeneratedFile>,
    /// Compile log.
    pub log: Option<PathBuf>,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

impl BuildReport {
    pub fn from_outcome(config: &BuildConfig, outcome: &GraphOutcome<StageOutput>, elapsed: Duration) -> Self {
        let aggregation = outcome.get(STAGE_AGGREGATE_LIBRARIES).and_then(StageOutput::as_libraries);

        let mut generated: Vec<GeneratedFile> = outcome
            .outputs
            .values()
            .flat_map(|out| out.generated().iter().cloned())
            .collect();
        generated.sort_by(|a, b| a.path.cmp(&b.path));

        Self {
            project: config.project.name.clone(),
            target: config.target.to_string(),
            elapsed,
            stages: outcome.timings.clone(),
            bundle_bytes: outcome
                .get(STAGE_BUNDLE)
                .and_then(StageOutput::as_bundle)
                .map_or(0, |artifact| artifact.length),
            pin_count: outcome
                .get(STAGE_EXTRACT_PINS)
                .and_then(StageOutput::as_pins)
                .map_or(0, <[_]>::len),
            libraries: aggregation
                .map(|agg| agg.libraries.iter().map(|lib| lib.name.clone()).collect())
                .unwrap_or_default(),
            skipped_libraries: aggregation.map(|agg| agg.skipped.clone()).unwrap_or_default(),
            generated,
            log: outcome
                .get(STAGE_COMPILE)
                .and_then(StageOutput::as_log)
                .map(PathBuf::from),
        }
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Build Report ===")?;
        writeln!(f, "Project: {}", self.project)?;
        writeln!(f, "Target: {}", self.target)?;
        writeln!(f, "Duration: {} ms", self.elapsed.as_millis())?;
        writeln!(f)?;

        writeln!(f, "--- Stages ---")?;
        for timing in &self.stages {
            writeln!(f, "  {:<24} {:>6} ms", timing.stage, timing.elapsed.as_millis())?;
        }

        writeln!(f)?;
        writeln!(f, "--- Program ---")?;
        writeln!(f, "  Bundle: {} bytes", self.bundle_bytes)?;
        writeln!(f, "  Pins: {}", self.pin_count)?;

        writeln!(f)?;
        writeln!(f, "--- Libraries ({}) ---", self.libraries.len())?;
        for name in &self.libraries {
            writeln!(f, "  {name}")?;
        }
        for issue in &self.skipped_libraries {
            writeln!(f, "  {} (skipped: {})", issue.dependency, issue.reason)?;
        }

        if !self.generated.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Generated ---")?;
            for file in &self.generated {
                writeln!(
                    f,
                    "  {} ({} bytes, sha256 {})",
                    file.path.display(),
                    file.size,
                    &file.digest[..file.digest.len().min(12)]
                )?;
            }
        }

        if let Some(log) = &self.log {
            writeln!(f)?;
            writeln!(f, "Log: {}", log.display())?;
        }
        Ok(())
    }
}
