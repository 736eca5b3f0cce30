//! CommonJS module resolution.
//!
//! Follows the Node.js lookup rules that matter for device programs:
//! relative specifiers resolve against the requiring file, bare specifiers
//! against `node_modules/` directories from the requiring file up to the
//! project root. Core Node modules do not exist on the device and are not
//! special-cased.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{BundleError, Result};
use crate::minify::code_only;

fn require_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?:^|[^\w$.])require\((?:'([^'\n]+)'|"([^"\n]+)")\)"#)
            .expect("require pattern is valid")
    })
}

/// Specifiers of all `require("...")` calls in `source`, in order of
/// appearance, without duplicates. Calls inside comments and literals are
/// ignored.
pub fn find_requires(source: &str) -> Vec<String> {
    let code = code_only(source);
    let mut found: Vec<String> = Vec::new();
    for caps in require_pattern().captures_iter(&code) {
        let Some(specifier) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        if !found.iter().any(|s| s == specifier.as_str()) {
            found.push(specifier.as_str().to_string());
        }
    }
    found
}

/// Resolve `specifier` as required from `from_file`.
///
/// Returns a canonical path so the same module reached through different
/// specifiers is bundled once.
pub fn resolve_specifier(specifier: &str, from_file: &Path, project_root: &Path) -> Result<PathBuf> {
    let from_dir = from_file.parent().unwrap_or(project_root);
    let resolved = if is_path_specifier(specifier) {
        let base = from_dir.join(specifier);
        match load_as_file(&base) {
            Some(found) => Some(found),
            None => load_as_directory(&base)?,
        }
    } else {
        load_from_node_modules(specifier, from_dir, project_root)?
    };

    let resolved = resolved.ok_or_else(|| BundleError::Resolution {
        specifier: specifier.to_string(),
        from: from_file.to_path_buf(),
    })?;
    debug!(specifier, path = %resolved.display(), "resolved module");
    fs::canonicalize(&resolved).map_err(|source| BundleError::Io {
        path: resolved,
        source,
    })
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
        || specifier == "." || specifier == ".."
}

fn load_as_file(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }
    ["js", "json"].iter().find_map(|ext| {
        let mut candidate = base.as_os_str().to_owned();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        candidate.is_file().then_some(candidate)
    })
}

fn load_as_directory(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let package_json = dir.join("package.json");
    if package_json.is_file() {
        let text = fs::read_to_string(&package_json).map_err(|source| BundleError::Io {
            path: package_json.clone(),
            source,
        })?;
        let package: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| BundleError::Json {
                path: package_json.clone(),
                source,
            })?;
        if let Some(main) = package.get("main").and_then(|m| m.as_str()) {
            let main_path = dir.join(main);
            if let Some(found) = load_as_file(&main_path) {
                return Ok(Some(found));
            }
            if let Some(found) = load_index(&main_path) {
                return Ok(Some(found));
            }
        }
    }
    Ok(load_index(dir))
}

fn load_index(dir: &Path) -> Option<PathBuf> {
    ["index.js", "index.json"]
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn load_from_node_modules(specifier: &str, from_dir: &Path, project_root: &Path) -> Result<Option<PathBuf>> {
    for dir in from_dir.ancestors() {
        let base = dir.join("node_modules").join(specifier);
        if let Some(found) = load_as_file(&base) {
            return Ok(Some(found));
        }
        if let Some(found) = load_as_directory(&base)? {
            return Ok(Some(found));
        }
        if dir == project_root {
            break;
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, text: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn finds_requires_in_order_without_comments() {
        let src = r#"
            // const old = require('./old');
            const a = require('./a');
            const b = require("b-lib");
            const again = require('./a');
            obj.require('./not-this');
            /* require('./nor-this') */
        "#;
        assert_eq!(find_requires(src), vec!["./a", "b-lib"]);
    }

    #[test]
    fn ignores_require_text_inside_literals() {
        assert!(find_requires("print(\"usage: call require('sensor') first\");\n").is_empty());
        let src = "var help = `require('tmpl')`;\nvar re = /require('re')/;\nvar led = require('./led');\n";
        assert_eq!(find_requires(src), vec!["./led"]);
    }

    #[test]
    fn resolves_relative_with_extension_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let main = write(root, "main.js", "");
        let led = write(root, "led.js", "");
        let util = write(root, "util/index.js", "");

        assert_eq!(
            resolve_specifier("./led", &main, root).unwrap(),
            fs::canonicalize(led).unwrap()
        );
        assert_eq!(
            resolve_specifier("./util", &main, root).unwrap(),
            fs::canonicalize(util).unwrap()
        );
    }

    #[test]
    fn resolves_bare_package_through_main() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let main = write(root, "src/main.js", "");
        write(root, "node_modules/easing/package.json", r#"{"main": "lib/easing"}"#);
        let lib = write(root, "node_modules/easing/lib/easing.js", "");

        assert_eq!(
            resolve_specifier("easing", &main, root).unwrap(),
            fs::canonicalize(lib).unwrap()
        );
    }

    #[test]
    fn does_not_search_above_project_root() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "node_modules/outside/index.js", "");
        let root = dir.path().join("project");
        let main = write(&root, "main.js", "");

        let err = resolve_specifier("outside", &main, &root).unwrap_err();
        assert!(matches!(err, BundleError::Resolution { .. }));
    }

    #[test]
    fn missing_module_is_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.js", "");
        let err = resolve_specifier("./nope", &main, dir.path()).unwrap_err();
        match err {
            BundleError::Resolution { specifier, from } => {
                assert_eq!(specifier, "./nope");
                assert_eq!(from, main);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_package_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.js", "");
        write(dir.path(), "node_modules/broken/package.json", "{ nope");
        let err = resolve_specifier("broken", &main, dir.path()).unwrap_err();
        assert!(matches!(err, BundleError::Json { .. }));
    }
}
