//! `mbedjs init`: project scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::manifest::{PackageManifest, Settings, PACKAGE_FILE, SETTINGS_FILE};

const ENTRY_TEMPLATE: &str = "var led = DigitalOut(LED1);\n\nsetInterval(function() {\n    led.write(!led.read());\n}, 500);\n";

const GITIGNORE: &str = "build/\nnode_modules/\n";

/// Add mbedjs settings to the project in `project_dir`, creating a minimal
/// package when there is none.
pub fn run(project_dir: &Path, target: &str) -> Result<()> {
    let created = create_project(project_dir, target)?;
    println!("Initialized mbedjs project in {}", project_dir.display());
    for file in created {
        println!("  {file}");
    }
    Ok(())
}

pub(crate) fn create_project(project_dir: &Path, target: &str) -> Result<Vec<&'static str>> {
    let settings_path = project_dir.join(SETTINGS_FILE);
    if settings_path.exists() {
        bail!("{} already exists", settings_path.display());
    }
    fs::create_dir_all(project_dir)
        .with_context(|| format!("creating {}", project_dir.display()))?;

    let mut created = Vec::new();
    if !project_dir.join(PACKAGE_FILE).exists() {
        let name = project_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("mbedjs-app");
        fs::write(project_dir.join(PACKAGE_FILE), PackageManifest::template(name))
            .context("writing package.json")?;
        created.push(PACKAGE_FILE);

        if !project_dir.join("index.js").exists() {
            fs::write(project_dir.join("index.js"), ENTRY_TEMPLATE).context("writing index.js")?;
            created.push("index.js");
        }
    }

    fs::write(&settings_path, Settings::template(target)).context("writing mbedjs.toml")?;
    created.push(SETTINGS_FILE);

    if !project_dir.join(".gitignore").exists() {
        fs::write(project_dir.join(".gitignore"), GITIGNORE).context("writing .gitignore")?;
        created.push(".gitignore");
    }
    Ok(created)
}
