//! `mbedjs bundle`: bundle and minify the program without building.

use std::path::Path;

use anyhow::{Context, Result};
use mbedjs_bundle::BundleArtifact;

use crate::manifest::{PackageManifest, Settings};

/// Bundle the project's entry module into the staging `js/` directory.
pub fn run(project_dir: &Path, manifest: &PackageManifest, settings: &Settings) -> Result<()> {
    let (modules, full_len, artifact) = bundle_project(project_dir, manifest, settings)?;
    let js_dir = settings.layout(project_dir).js_dir();
    println!("Bundled {modules} modules from {}", manifest.entry().display());
    println!("  {}: {full_len} bytes", js_dir.join(format!("{}.bundle.js", artifact.name)).display());
    println!(
        "  {}: {} bytes",
        js_dir.join(format!("{}.bundle.min.js", artifact.name)).display(),
        artifact.length
    );
    Ok(())
}

fn bundle_project(
    project_dir: &Path,
    manifest: &PackageManifest,
    settings: &Settings,
) -> Result<(usize, usize, BundleArtifact)> {
    let entry = project_dir.join(manifest.entry());
    let program = mbedjs_bundle::bundle(&entry, project_dir)
        .with_context(|| format!("bundling {}", entry.display()))?;
    let artifact = program.write(&settings.layout(project_dir).js_dir(), &manifest.name)?;
    Ok((program.modules.len(), program.text.len(), artifact))
}
