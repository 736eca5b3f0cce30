//! `mbedjs doctor`: toolchain and project diagnostics.

use std::path::Path;
use std::process::Command;

use anyhow::Result;
use mbedjs_codegen::TemplateSet;

use crate::manifest::{PackageManifest, Settings};

/// Print toolchain and project diagnostic information.
pub fn run(project_dir: &Path) -> Result<()> {
    println!("=== mbedjs Doctor ===");
    println!();
    println!("mbedjs version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let settings = match Settings::load(project_dir) {
        Ok(settings) => settings,
        Err(e) => {
            println!("  mbedjs.toml: error: {e:#}");
            Settings::default()
        }
    };
    let toolchain = settings.toolchain();

    println!("--- System Tools ---");
    print_tool_status(&toolchain.make, &["--version"]);
    print_tool_status("git", &["--version"]);
    print_tool_status("arm-none-eabi-gcc", &["--version"]);
    println!();

    println!("--- Project Status ---");
    match PackageManifest::find_and_load(project_dir) {
        Ok(Some((manifest, dir))) => {
            println!("  package.json: found at {}", dir.display());
            println!("  Project:      {}", manifest.name);
            let entry = dir.join(manifest.entry());
            println!(
                "  Entry:        {} ({})",
                manifest.entry().display(),
                if entry.is_file() { "ok" } else { "missing" }
            );
            println!("  Dependencies: {}", manifest.dependencies.len());
            match settings.resolve_target(None, None) {
                Ok(selector) => println!("  Default target: {selector}"),
                Err(_) => println!("  Default target: none (pass --target when building)"),
            }

            let layout = settings.layout(&dir);
            let templates = TemplateSet::with_overrides(layout.template_dir());
            for name in TemplateSet::builtin_names() {
                if let Some(path) = templates.override_path(name) {
                    println!("  Template {name}: overridden by {}", path.display());
                }
            }
            println!(
                "  Toolchain:    {}",
                if layout.pin_defs_dir().is_dir() {
                    "fetched"
                } else {
                    "not fetched yet"
                }
            );
        }
        Ok(None) => {
            println!("  package.json: not found");
        }
        Err(e) => {
            println!("  package.json: error: {e:#}");
        }
    }

    Ok(())
}

fn print_tool_status(name: &str, args: &[&str]) {
    let Ok(path) = which::which(name) else {
        println!("  {name}: not found on PATH");
        return;
    };
    match Command::new(&path).args(args).output() {
        Ok(output) => {
            let version = String::from_utf8_lossy(&output.stdout);
            let first_line = version.lines().next().unwrap_or("(unknown version)");
            println!("  {name}: {first_line} ({})", path.display());
        }
        Err(e) => {
            println!("  {name}: found at {} but failed to run: {e}", path.display());
        }
    }
}
