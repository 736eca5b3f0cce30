//! The individual build stages.
//!
//! Each stage takes the shared configuration and the outputs of its
//! prerequisites. Filesystem-heavy synchronous work (bundling, pin table
//! search, template rendering) runs on the blocking pool.

use std::collections::HashSet;
use std::sync::Arc;

use mbedjs_bundle::{bundle as bundle_program, BundleArtifact};
use mbedjs_codegen::{
    copy_static, render_to_file, sanitize_identifier, sanitize_string_literal, EmbeddedSource,
    RenderContext, IGNORE_TEMPLATE, JS_SOURCE_TEMPLATE, MAIN_TEMPLATE, MAKEFILE_TEMPLATE,
};
use mbedjs_targets::{find_pin_table, parse_pin_table, PinEntry, PIN_TABLE_FILE};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::graph::StageInputs;
use crate::libraries::{aggregate_libraries, Aggregation, LibraryDescriptor};
use crate::pipeline::{
    StageOutput, STAGE_AGGREGATE_LIBRARIES, STAGE_BUNDLE, STAGE_COMPILE, STAGE_EXTRACT_PINS,
    STAGE_GENERATE_ENTRY_POINT, STAGE_GENERATE_PROGRAM_SOURCE,
};
use crate::toolchain::{run_checked, ToolchainCommand};

type Inputs = StageInputs<StageOutput>;

/// A pin as the program source template sees it.
#[derive(Debug, Serialize)]
struct PinConstant<'a> {
    name: &'a str,
    symbol: String,
    literal: String,
    value: &'a str,
}

/// A library as the entry point template sees it.
#[derive(Debug, Serialize)]
struct LibraryRecord<'a> {
    name: &'a str,
    symbol: String,
    source_dirs: &'a [String],
    config: &'a serde_json::Value,
}

fn input<'a, U: ?Sized>(
    inputs: &'a Inputs,
    stage: &str,
    from: &str,
    pick: impl Fn(&'a StageOutput) -> Option<&'a U>,
) -> Result<&'a U> {
    inputs
        .get(from)
        .and_then(pick)
        .ok_or_else(|| BuildError::MissingInput {
            stage: stage.to_string(),
            from: from.to_string(),
        })
}

/// Bundle and minify the program into the staging `js/` directory.
pub async fn bundle(config: Arc<BuildConfig>, _inputs: Inputs) -> Result<StageOutput> {
    let artifact = tokio::task::spawn_blocking(move || {
        let program = bundle_program(&config.entry_path(), &config.layout.project_dir)?;
        program.write(&config.layout.js_dir(), &config.project.name)
    })
    .await??;
    Ok(StageOutput::Bundle(artifact))
}

/// Copy the native makefile and ignore list into the staging directory.
pub async fn write_configs(config: Arc<BuildConfig>, _inputs: Inputs) -> Result<StageOutput> {
    let files = tokio::task::spawn_blocking(move || {
        let build_dir = &config.layout.build_dir;
        Ok::<_, BuildError>(vec![
            copy_static(&config.templates, MAKEFILE_TEMPLATE, &build_dir.join("Makefile"))?,
            copy_static(&config.templates, IGNORE_TEMPLATE, &build_dir.join(".mbedignore"))?,
        ])
    })
    .await??;
    Ok(StageOutput::Generated(files))
}

/// Fetch the JavaScript engine and target sources.
pub async fn fetch_toolchain(config: Arc<BuildConfig>, _inputs: Inputs) -> Result<StageOutput> {
    run_checked(&ToolchainCommand::fetch(&config), None).await?;
    Ok(StageOutput::Done)
}

/// Locate the target's pin table, copy it next to the bundle and parse it.
pub async fn extract_pins(config: Arc<BuildConfig>, _inputs: Inputs) -> Result<StageOutput> {
    let root = config.layout.pin_defs_dir();
    let selector = config.target.clone();
    let table = tokio::task::spawn_blocking(move || find_pin_table(&root, &selector)).await??;
    info!(board = %config.target, table = %table.display(), "using pin table");

    let js_dir = config.layout.js_dir();
    tokio::fs::create_dir_all(&js_dir)
        .await
        .map_err(|source| BuildError::Io {
            path: js_dir.clone(),
            source,
        })?;
    let copy = js_dir.join(PIN_TABLE_FILE);
    tokio::fs::copy(&table, &copy)
        .await
        .map_err(|source| BuildError::Io {
            path: copy.clone(),
            source,
        })?;
    let text = tokio::fs::read_to_string(&copy)
        .await
        .map_err(|source| BuildError::Io {
            path: copy.clone(),
            source,
        })?;
    let pins = parse_pin_table(&text);
    info!(pins = pins.len(), "extracted pins");
    Ok(StageOutput::Pins(pins))
}

/// Collect native library metadata from the declared dependencies.
pub async fn aggregate(config: Arc<BuildConfig>, _inputs: Inputs) -> Result<StageOutput> {
    let aggregation =
        aggregate_libraries(&config.layout.node_modules_dir(), &config.project.dependencies).await?;
    Ok(StageOutput::Libraries(aggregation))
}

/// Render the C++ file embedding the program and the pin constants.
pub async fn generate_program_source(config: Arc<BuildConfig>, inputs: Inputs) -> Result<StageOutput> {
    let stage = STAGE_GENERATE_PROGRAM_SOURCE;
    let artifact: &BundleArtifact = input(&inputs, stage, STAGE_BUNDLE, StageOutput::as_bundle)?;
    let pins: &[PinEntry] = input(&inputs, stage, STAGE_EXTRACT_PINS, StageOutput::as_pins)?;

    let context = program_source_context(&config.project.name, artifact, pins)?;
    let dest = config.program_source_path();
    let file = tokio::task::spawn_blocking(move || {
        render_to_file(&config.templates, JS_SOURCE_TEMPLATE, &context, &dest)
    })
    .await??;
    Ok(StageOutput::Generated(vec![file]))
}

fn program_source_context(name: &str, artifact: &BundleArtifact, pins: &[PinEntry]) -> Result<RenderContext> {
    let js_files = vec![EmbeddedSource::new(name, &artifact.text)];
    let mut symbols = HashSet::new();
    let pins: Vec<PinConstant<'_>> = pins
        .iter()
        .map(|pin| PinConstant {
            name: &pin.name,
            symbol: unique_symbol(&pin.name, &mut symbols),
            literal: sanitize_string_literal(&pin.name),
            value: &pin.value,
        })
        .collect();
    Ok(RenderContext::new()
        .with("js_files", &js_files)?
        .with("pin_count", &pins.len())?
        .with("pins", &pins)?)
}

/// Sanitized symbol for a pin name, suffixed with `_2`, `_3`, ... when an
/// earlier pin already took it.
fn unique_symbol(name: &str, taken: &mut HashSet<String>) -> String {
    let base = sanitize_identifier(name);
    let mut symbol = base.clone();
    let mut n = 2;
    while !taken.insert(symbol.clone()) {
        symbol = format!("{base}_{n}");
        n += 1;
    }
    if symbol != base {
        warn!(pin = %name, %symbol, "pin symbol collides with an earlier pin, renamed");
    }
    symbol
}

/// Render the entry point that registers each native library.
pub async fn generate_entry_point(config: Arc<BuildConfig>, inputs: Inputs) -> Result<StageOutput> {
    let aggregation = input(
        &inputs,
        STAGE_GENERATE_ENTRY_POINT,
        STAGE_AGGREGATE_LIBRARIES,
        StageOutput::as_libraries,
    )?;

    let context = entry_point_context(&aggregation.libraries)?;
    let dest = config.entry_point_path();
    let file = tokio::task::spawn_blocking(move || {
        render_to_file(&config.templates, MAIN_TEMPLATE, &context, &dest)
    })
    .await??;
    Ok(StageOutput::Generated(vec![file]))
}

fn entry_point_context(libraries: &[LibraryDescriptor]) -> Result<RenderContext> {
    let records: Vec<LibraryRecord<'_>> = libraries
        .iter()
        .map(|lib| LibraryRecord {
            name: &lib.name,
            symbol: sanitize_identifier(&lib.name),
            source_dirs: &lib.source_dirs,
            config: &lib.config,
        })
        .collect();
    Ok(RenderContext::new().with("libraries", &records)?)
}

/// Compile the firmware, logging the toolchain output.
pub async fn compile(config: Arc<BuildConfig>, inputs: Inputs) -> Result<StageOutput> {
    let aggregation: &Aggregation =
        input(&inputs, STAGE_COMPILE, STAGE_AGGREGATE_LIBRARIES, StageOutput::as_libraries)?;
    let command = ToolchainCommand::compile(&config, aggregation.source_dirs());
    let log = config.layout.log_path();
    run_checked(&command, Some(&log)).await?;
    Ok(StageOutput::Log(log))
}
