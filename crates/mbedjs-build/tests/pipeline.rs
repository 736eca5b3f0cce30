//! End-to-end builds against a stand-in `make`.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use mbedjs_build::{run_build, BuildConfig, BuildError, ProjectInfo, ToolchainConfig};
use mbedjs_targets::TargetSelector;

const FAKE_MAKE: &str = r#"#!/bin/sh
case "$1" in
  jerryscript)
    dir=jerryscript/targets/mbedos5/js/pin_defs/TARGET_Freescale/TARGET_MCU_K64F/TARGET_FRDM
    mkdir -p "$dir"
    printf 'var LED1 = 50;\nvar LED2 = 51;\nvar SW2 = 60;\n' > "$dir/pins.js"
    echo "fetched engine"
    ;;
  BOARD=*)
    echo "building $1"
    echo "using $2"
    echo "warning: stand-in toolchain" 1>&2
    if [ -n "$FAIL_COMPILE" ]; then
      echo "error: linker exploded" 1>&2
      exit 2
    fi
    ;;
esac
"#;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn fake_make(dir: &Path, script: &str) -> PathBuf {
    let path = dir.join("fake-make");
    fs::write(&path, script).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn project(root: &Path) {
    write(
        root,
        "index.js",
        "var blink = require('./blink');\nblink(LED1, 500);\n",
    );
    write(
        root,
        "blink.js",
        "module.exports = function(pin, ms) {\n    var led = DigitalOut(pin);\n    setInterval(function() { led.write(!led.read()); }, ms);\n};\n",
    );
    write(root, "node_modules/mbed-dht/mbedjs.json", r#"{"source": ["native"]}"#);
    write(root, "node_modules/plain-js/index.js", "module.exports = 1;\n");
}

fn config(root: &Path, make: &Path) -> BuildConfig {
    let info = ProjectInfo {
        name: "blink".into(),
        entry: PathBuf::from("index.js"),
        dependencies: vec!["mbed-dht".into(), "plain-js".into()],
    };
    BuildConfig::new(root, info, TargetSelector::new("K64F")).with_toolchain(ToolchainConfig {
        make: make.display().to_string(),
        fetch_goal: "jerryscript".into(),
    })
}

#[tokio::test]
async fn full_build_produces_sources_and_log() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("app");
    project(&root);
    let make = fake_make(dir.path(), FAKE_MAKE);

    let report = run_build(config(&root, &make)).await.unwrap();

    assert_eq!(report.pin_count, 3);
    assert_eq!(report.libraries, vec!["mbed-dht"]);
    assert_eq!(report.stages.len(), 8);
    assert_eq!(report.stages.last().unwrap().stage, "compile");

    let build = root.join("build");
    for rel in [
        "Makefile",
        ".mbedignore",
        "js/blink.bundle.js",
        "js/blink.bundle.min.js",
        "js/pins.js",
        "source/blink_js_source.cpp",
        "source/main.cpp",
    ] {
        assert!(build.join(rel).is_file(), "missing {rel}");
    }

    let program = fs::read_to_string(build.join("source/blink_js_source.cpp")).unwrap();
    assert!(program.contains("static const char blink_js[] = \""));
    assert!(program.contains("#define MBEDJS_PIN_SW2 60"));
    assert!(program.contains("magic_string_count = 3;"));

    let main = fs::read_to_string(build.join("source/main.cpp")).unwrap();
    assert!(main.contains("JERRY_USE_MBED_LIBRARY(mbed_dht);"));

    let log = fs::read_to_string(build.join("build.log")).unwrap();
    assert!(log.contains("building BOARD=K64F"));
    assert!(log.contains("using EXTRAS=../../../../node_modules/mbed-dht/native"));
    assert!(log.contains("warning: stand-in toolchain"));
    assert_eq!(report.log.as_deref(), Some(build.join("build.log").as_path()));
}

#[tokio::test]
async fn rebuild_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("app");
    project(&root);
    let make = fake_make(dir.path(), FAKE_MAKE);

    let first = run_build(config(&root, &make)).await.unwrap();
    let second = run_build(config(&root, &make)).await.unwrap();
    assert!(!first.generated.is_empty());
    assert_eq!(first.generated, second.generated);
}

#[tokio::test]
async fn compile_failure_surfaces_output_and_keeps_log() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("app");
    project(&root);
    let script = FAKE_MAKE.replace("if [ -n \"$FAIL_COMPILE\" ]", "if true");
    let make = fake_make(dir.path(), &script);

    let err = run_build(config(&root, &make)).await.unwrap_err();
    assert_eq!(err.stage(), Some("compile"));
    match err.root() {
        BuildError::Toolchain { output, .. } => assert!(output.contains("linker exploded")),
        other => panic!("unexpected error: {other}"),
    }
    let log = fs::read_to_string(root.join("build/build.log")).unwrap();
    assert!(log.contains("linker exploded"));
}

#[tokio::test]
async fn missing_pin_table_stops_before_compile() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("app");
    project(&root);
    let make = fake_make(dir.path(), FAKE_MAKE);
    let mut cfg = config(&root, &make);
    cfg.target = TargetSelector::new("LPC1768");

    let err = run_build(cfg).await.unwrap_err();
    assert_eq!(err.stage(), Some("extract-pins"));
    assert!(!root.join("build/build.log").exists());
    assert!(!root.join("build/source/blink_js_source.cpp").exists());
}

#[tokio::test]
async fn unresolvable_require_fails_the_bundle_stage() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("app");
    project(&root);
    write(&root, "index.js", "require('./nowhere');\n");
    let make = fake_make(dir.path(), FAKE_MAKE);

    let err = run_build(config(&root, &make)).await.unwrap_err();
    assert_eq!(err.stage(), Some("bundle"));
    assert!(!root.join("build/build.log").exists());
}
