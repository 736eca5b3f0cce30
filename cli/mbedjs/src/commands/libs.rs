//! `mbedjs libs`: list native libraries contributed by dependencies.

use std::path::Path;

use anyhow::{Context, Result};
use mbedjs_build::{aggregate_libraries, Aggregation};

use crate::commands::block_on;
use crate::manifest::{PackageManifest, Settings};

pub fn run(project_dir: &Path, manifest: &PackageManifest, settings: &Settings) -> Result<()> {
    let aggregation = collect(project_dir, manifest, settings)?;
    print!("{}", render(&aggregation));
    Ok(())
}

fn collect(project_dir: &Path, manifest: &PackageManifest, settings: &Settings) -> Result<Aggregation> {
    let node_modules = settings.layout(project_dir).node_modules_dir();
    let dependencies = manifest.dependency_names();
    block_on(async { aggregate_libraries(&node_modules, &dependencies).await })?
        .context("reading library metadata")
}

fn render(aggregation: &Aggregation) -> String {
    let mut out = String::new();
    if aggregation.libraries.is_empty() {
        out.push_str("No native libraries\n");
    }
    for lib in &aggregation.libraries {
        out.push_str(&format!("{}\n", lib.name));
        for dir in &lib.source_dirs {
            out.push_str(&format!("  {dir}\n"));
        }
    }
    for issue in &aggregation.skipped {
        out.push_str(&format!(
            "{} (skipped: {}: {})\n",
            issue.dependency,
            issue.path.display(),
            issue.reason
        ));
    }
    out
}
