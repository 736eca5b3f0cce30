//! `package.json` and `mbedjs.toml` parsing and project configuration.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mbedjs_build::{BuildConfig, BuildLayout, ProjectInfo, ToolchainConfig};
use mbedjs_targets::TargetSelector;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub const PACKAGE_FILE: &str = "package.json";
pub const SETTINGS_FILE: &str = "mbedjs.toml";

/// Entry module used when `main` is absent.
const DEFAULT_ENTRY: &str = "index.js";

/// The parts of `package.json` a build reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    /// Dependency name to version range, in declaration order.
    #[serde(default)]
    pub dependencies: Map<String, Value>,
}

impl PackageManifest {
    /// Search upward from `start_dir` for a `package.json`, parse it and
    /// return it with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(PACKAGE_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: PackageManifest = serde_json::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a JSON string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("parsing package.json")
    }

    /// Entry module, relative to the project directory.
    pub fn entry(&self) -> PathBuf {
        PathBuf::from(self.main.as_deref().unwrap_or(DEFAULT_ENTRY))
    }

    /// Declared dependency names in declaration order.
    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }

    pub fn project_info(&self) -> ProjectInfo {
        ProjectInfo {
            name: self.name.clone(),
            entry: self.entry(),
            dependencies: self.dependency_names(),
        }
    }

    /// Minimal manifest written by `mbedjs init` when none exists.
    pub fn template(name: &str) -> String {
        format!(
            r#"{{
  "name": "{name}",
  "version": "0.1.0",
  "main": "index.js",
  "dependencies": {{}}
}}
"#
        )
    }
}

/// Optional per-project settings from `mbedjs.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub target: TargetSettings,
    #[serde(default)]
    pub toolchain: ToolchainSettings,
    #[serde(default)]
    pub build: BuildSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSettings {
    /// Target used when none is given on the command line.
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainSettings {
    /// Make program, e.g. `gmake`.
    #[serde(default)]
    pub make: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Staging directory, relative to the project.
    #[serde(default)]
    pub dir: Option<String>,
}

impl Settings {
    /// Load `mbedjs.toml` from `project_dir`; a missing file means defaults.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(SETTINGS_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Default settings file for `mbedjs init`.
    pub fn template(target: &str) -> String {
        format!(
            r#"[target]
default = "{target}"

[toolchain]
make = "make"

[build]
dir = "build"
"#
        )
    }

    /// Pick the target: command line (or environment) first, then settings.
    pub fn resolve_target(&self, target: Option<&str>, variant: Option<&str>) -> Result<TargetSelector> {
        let Some(name) = target.or(self.target.default.as_deref()) else {
            bail!(
                "no target board given; pass --target, set MBEDJS_TARGET or add [target] default to {SETTINGS_FILE}"
            );
        };
        let selector = TargetSelector::new(name);
        Ok(match variant.or(self.target.variant.as_deref()) {
            Some(variant) => selector.with_variant(variant),
            None => selector,
        })
    }

    /// Staging layout for a project.
    pub fn layout(&self, project_dir: &Path) -> BuildLayout {
        let layout = BuildLayout::new(project_dir);
        match &self.build.dir {
            Some(dir) => layout.with_build_dir(dir),
            None => layout,
        }
    }

    pub fn toolchain(&self) -> ToolchainConfig {
        let mut toolchain = ToolchainConfig::default();
        if let Some(make) = &self.toolchain.make {
            toolchain.make = make.clone();
        }
        toolchain
    }

    /// Full build configuration for a project.
    pub fn build_config(
        &self,
        project_dir: &Path,
        manifest: &PackageManifest,
        target: TargetSelector,
    ) -> BuildConfig {
        BuildConfig::new(project_dir, manifest.project_info(), target)
            .with_layout(self.layout(project_dir))
            .with_toolchain(self.toolchain())
    }
}

/// Locate the project around `cwd`, failing when there is no `package.json`.
pub fn load_project(cwd: &Path) -> Result<(PackageManifest, PathBuf, Settings)> {
    let Some((manifest, dir)) = PackageManifest::find_and_load(cwd)? else {
        bail!(
            "no {PACKAGE_FILE} found in {} or any parent directory",
            cwd.display()
        );
    };
    let settings = Settings::load(&dir)?;
    debug!(project = %manifest.name, dir = %dir.display(), "loaded project");
    Ok((manifest, dir, settings))
}
