//! `mbedjs build`: run the build graph, or show its plan.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use mbedjs_build::{pipeline, run_build, BuildConfig};

use crate::commands::block_on;
use crate::manifest::{PackageManifest, Settings};

/// Build the project for the selected target.
pub fn run(
    project_dir: &Path,
    manifest: &PackageManifest,
    settings: &Settings,
    target: Option<&str>,
    variant: Option<&str>,
    plan: bool,
) -> Result<()> {
    let selector = settings.resolve_target(target, variant)?;
    let config = settings.build_config(project_dir, manifest, selector);

    if plan {
        print!("{}", render_plan(config)?);
        return Ok(());
    }

    let report = block_on(run_build(config))?
        .with_context(|| format!("building '{}'", manifest.name))?;
    println!("{report}");
    Ok(())
}

fn render_plan(config: BuildConfig) -> Result<String> {
    let config = Arc::new(config);
    let levels = pipeline::plan(&config)?;
    let mut out = format!(
        "Build plan for '{}' on {}:\n",
        config.project.name, config.target
    );
    for (i, level) in levels.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, level.join(", ")));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbedjs_targets::TargetSelector;

    fn manifest() -> PackageManifest {
        serde_json::from_str(r#"{"name": "blinky"}"#).unwrap()
    }

    #[test]
    fn plan_lists_stages_by_level() {
        let config = Settings::default().build_config(
            Path::new("/p"),
            &manifest(),
            TargetSelector::new("K64F"),
        );
        let text = render_plan(config).unwrap();
        assert!(text.starts_with("Build plan for 'blinky' on K64F (FRDM):"));
        assert!(text.contains("  1. bundle, write-configs, aggregate-libraries\n"));
        assert!(text.contains("  5. compile\n"));
    }

    #[test]
    fn plan_only_does_not_touch_the_project() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &manifest(), &Settings::default(), Some("K64F"), None, true).unwrap();
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn build_without_target_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), &manifest(), &Settings::default(), None, None, true).unwrap_err();
        assert!(err.to_string().contains("no target board"));
    }
}
