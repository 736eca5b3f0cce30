//! Build configuration.
//!
//! A [`BuildConfig`] is assembled once per invocation and then shared
//! read-only by every stage.

use std::path::{Path, PathBuf};

use mbedjs_codegen::TemplateSet;
use mbedjs_targets::TargetSelector;
use serde::Serialize;

/// Staging directory, relative to the project.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Template override directory, relative to the project.
pub const TEMPLATE_OVERRIDE_DIR: &str = "tmpl";

/// Pin definitions inside the fetched toolchain, relative to the staging
/// directory.
pub const PIN_DEFS_SUBDIR: &str = "jerryscript/targets/mbedos5/js/pin_defs";

/// Log of the compile step, relative to the staging directory.
pub const BUILD_LOG: &str = "build.log";

/// The project being built, as declared by its package manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    /// Package name. Also names the bundle and the generated source file.
    pub name: String,
    /// Entry module, relative to the project directory.
    pub entry: PathBuf,
    /// Declared dependencies, in declaration order.
    pub dependencies: Vec<String>,
}

/// Where a build reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildLayout {
    pub project_dir: PathBuf,
    pub build_dir: PathBuf,
}

impl BuildLayout {
    /// Default layout for a project: staging under `build/`.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let build_dir = project_dir.join(DEFAULT_BUILD_DIR);
        Self {
            project_dir,
            build_dir,
        }
    }

    /// Use a different staging directory. Relative paths are taken from the
    /// project directory.
    pub fn with_build_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.build_dir = self.project_dir.join(dir);
        self
    }

    pub fn js_dir(&self) -> PathBuf {
        self.build_dir.join("js")
    }

    pub fn source_dir(&self) -> PathBuf {
        self.build_dir.join("source")
    }

    pub fn pin_defs_dir(&self) -> PathBuf {
        self.build_dir.join(PIN_DEFS_SUBDIR)
    }

    pub fn node_modules_dir(&self) -> PathBuf {
        self.project_dir.join("node_modules")
    }

    pub fn template_dir(&self) -> PathBuf {
        self.project_dir.join(TEMPLATE_OVERRIDE_DIR)
    }

    pub fn log_path(&self) -> PathBuf {
        self.build_dir.join(BUILD_LOG)
    }
}

/// External build tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainConfig {
    /// Program invoked for fetching and compiling.
    pub make: String,
    /// Goal that fetches the JavaScript engine and its target sources.
    pub fetch_goal: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            make: "make".to_string(),
            fetch_goal: "jerryscript".to_string(),
        }
    }
}

/// Everything a build needs to know up front.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub project: ProjectInfo,
    pub target: TargetSelector,
    pub layout: BuildLayout,
    pub toolchain: ToolchainConfig,
    pub templates: TemplateSet,
}

impl BuildConfig {
    /// Configuration with the default layout, toolchain and templates
    /// (built-ins overridden by the project's `tmpl/` directory).
    pub fn new(project_dir: impl Into<PathBuf>, project: ProjectInfo, target: TargetSelector) -> Self {
        let layout = BuildLayout::new(project_dir);
        let templates = TemplateSet::with_overrides(layout.template_dir());
        Self {
            project,
            target,
            layout,
            toolchain: ToolchainConfig::default(),
            templates,
        }
    }

    pub fn with_layout(mut self, layout: BuildLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_toolchain(mut self, toolchain: ToolchainConfig) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Absolute path of the entry module.
    pub fn entry_path(&self) -> PathBuf {
        self.layout.project_dir.join(&self.project.entry)
    }

    /// Path of the generated program source file.
    pub fn program_source_path(&self) -> PathBuf {
        self.layout
            .source_dir()
            .join(format!("{}_js_source.cpp", self.project.name))
    }

    /// Path of the generated entry point.
    pub fn entry_point_path(&self) -> PathBuf {
        self.layout.source_dir().join("main.cpp")
    }
}
