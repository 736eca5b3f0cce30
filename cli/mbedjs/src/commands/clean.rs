//! `mbedjs clean`: remove the staging directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::manifest::Settings;

/// Remove the build directory of the project.
pub fn run(project_dir: &Path, settings: &Settings) -> Result<()> {
    let build_dir = settings.layout(project_dir).build_dir;
    if build_dir.exists() {
        fs::remove_dir_all(&build_dir).with_context(|| format!("removing {}", build_dir.display()))?;
        println!("Removed {}", build_dir.display());
    } else {
        println!("Already clean: {} does not exist", build_dir.display());
    }
    Ok(())
}
