//! Dependency graph walk and concatenation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{BundleError, Result};
use crate::minify::minify;
use crate::resolve::{find_requires, resolve_specifier};

/// Loader run by the bundle: evaluates module 0 and resolves `require` calls
/// through each module's specifier table.
const PRELUDE: &str = "(function(defs){var cache={};\
function load(id){if(cache[id])return cache[id].exports;\
var m=cache[id]={exports:{}};\
defs[id][0].call(m.exports,function(name){return load(defs[id][1][name]);},m,m.exports);\
return m.exports;}\
load(0);})([\n";

/// One module in the bundle.
#[derive(Debug, Clone)]
pub struct Module {
    /// Position in the module table; the entry point is 0.
    pub id: usize,
    /// Canonical path of the source file.
    pub path: PathBuf,
    /// Module body as it will appear in the bundle.
    pub source: String,
    /// Specifier to module id, in order of first appearance.
    pub requires: Vec<(String, usize)>,
}

/// A resolved and concatenated program.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Modules in id order.
    pub modules: Vec<Module>,
    /// Unminified bundle text.
    pub text: String,
}

/// The minified program handed to code generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleArtifact {
    /// Project name the bundle was built for.
    pub name: String,
    /// Minified program text.
    pub text: String,
    /// Byte length of `text`.
    pub length: usize,
}

impl BundleArtifact {
    pub fn new(name: impl Into<String>, text: String) -> Self {
        Self {
            name: name.into(),
            length: text.len(),
            text,
        }
    }
}

/// Bundle the program starting at `entry`.
///
/// Module ids follow depth-first discovery order, so a fixed dependency graph
/// always produces the same text.
pub fn bundle(entry: &Path, project_root: &Path) -> Result<Bundle> {
    let root = fs::canonicalize(project_root).map_err(|source| BundleError::Io {
        path: project_root.to_path_buf(),
        source,
    })?;
    let entry = fs::canonicalize(entry).map_err(|source| BundleError::Io {
        path: entry.to_path_buf(),
        source,
    })?;

    let mut walker = Walker {
        root,
        ids: HashMap::new(),
        modules: Vec::new(),
    };
    walker.visit(&entry)?;

    let text = concatenate(&walker.modules);
    info!(
        modules = walker.modules.len(),
        bytes = text.len(),
        "bundled program"
    );
    Ok(Bundle {
        modules: walker.modules,
        text,
    })
}

struct Walker {
    root: PathBuf,
    ids: HashMap<PathBuf, usize>,
    modules: Vec<Module>,
}

impl Walker {
    fn visit(&mut self, path: &Path) -> Result<usize> {
        if let Some(&id) = self.ids.get(path) {
            return Ok(id);
        }
        let id = self.modules.len();
        self.ids.insert(path.to_path_buf(), id);
        debug!(id, path = %path.display(), "adding module");

        let raw = fs::read_to_string(path).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let source = if is_json {
            serde_json::from_str::<serde_json::Value>(&raw).map_err(|source| BundleError::Json {
                path: path.to_path_buf(),
                source,
            })?;
            format!("module.exports = {};", raw.trim())
        } else {
            raw
        };

        self.modules.push(Module {
            id,
            path: path.to_path_buf(),
            source: source.clone(),
            requires: Vec::new(),
        });

        if is_json {
            return Ok(id);
        }

        let mut requires = Vec::new();
        for specifier in find_requires(&source) {
            let child = resolve_specifier(&specifier, path, &self.root)?;
            let child_id = self.visit(&child)?;
            requires.push((specifier, child_id));
        }
        self.modules[id].requires = requires;
        Ok(id)
    }
}

fn concatenate(modules: &[Module]) -> String {
    let mut out = String::from(PRELUDE);
    for (i, module) in modules.iter().enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        out.push_str("[function(require,module,exports){\n");
        out.push_str(&module.source);
        if !module.source.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("},{");
        for (j, (specifier, id)) in module.requires.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            let key = serde_json::Value::String(specifier.clone());
            out.push_str(&format!("{key}:{id}"));
        }
        out.push_str("}]");
    }
    out.push_str("\n]);\n");
    out
}

impl Bundle {
    /// Minify the bundle into the artifact embedded on the device.
    pub fn artifact(&self, name: &str) -> BundleArtifact {
        BundleArtifact::new(name, minify(&self.text))
    }

    /// Write `<name>.bundle.js` and `<name>.bundle.min.js` to `dir` and
    /// return the minified artifact.
    pub fn write(&self, dir: &Path, name: &str) -> Result<BundleArtifact> {
        fs::create_dir_all(dir).map_err(|source| BundleError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let artifact = self.artifact(name);
        for (file, text) in [
            (format!("{name}.bundle.js"), &self.text),
            (format!("{name}.bundle.min.js"), &artifact.text),
        ] {
            let path = dir.join(file);
            fs::write(&path, text).map_err(|source| BundleError::Io { path, source })?;
        }
        Ok(artifact)
    }
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

    fn sample_project() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let entry = write(
            root,
            "main.js",
            "var fade = require('./fade');\nvar cfg = require('./config.json');\nsetInterval(fade, cfg.period);\n",
        );
        write(
            root,
            "fade.js",
            "var easing = require('easing');\nmodule.exports = function() { analogWrite(LED1, easing(0.5)); };\n",
        );
        write(root, "config.json", "{ \"period\": 20 }\n");
        write(root, "node_modules/easing/index.js", "module.exports = function(t) { return t * t; };\n");
        (dir, entry)
    }

    #[test]
    fn modules_are_numbered_depth_first() {
        let (dir, entry) = sample_project();
        let bundle = bundle(&entry, dir.path()).unwrap();

        let names: Vec<_> = bundle
            .modules
            .iter()
            .map(|m| m.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["main.js", "fade.js", "index.js", "config.json"]);
        assert_eq!(
            bundle.modules[0].requires,
            vec![("./fade".to_string(), 1), ("./config.json".to_string(), 3)]
        );
        assert_eq!(bundle.modules[1].requires, vec![("easing".to_string(), 2)]);
    }

    #[test]
    fn json_modules_are_wrapped() {
        let (dir, entry) = sample_project();
        let bundle = bundle(&entry, dir.path()).unwrap();
        assert_eq!(bundle.modules[3].source, "module.exports = { \"period\": 20 };");
    }

    #[test]
    fn bundle_text_is_deterministic() {
        let (dir, entry) = sample_project();
        let first = bundle(&entry, dir.path()).unwrap();
        let second = bundle(&entry, dir.path()).unwrap();
        assert_eq!(first.text, second.text);
        assert!(first.text.starts_with(PRELUDE));
        assert!(first.text.contains("},{\"./fade\":1,\"./config.json\":3}]"));
        assert!(!first.text.contains(&dir.path().display().to_string()));
    }

    #[test]
    fn shared_and_cyclic_requires_are_bundled_once() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "a.js", "require('./b'); require('./c');");
        write(dir.path(), "b.js", "require('./c'); require('./a');");
        write(dir.path(), "c.js", "module.exports = 1;");

        let bundle = bundle(&entry, dir.path()).unwrap();
        assert_eq!(bundle.modules.len(), 3);
        assert_eq!(
            bundle.modules[1].requires,
            vec![("./c".to_string(), 2), ("./a".to_string(), 0)]
        );
    }

    #[test]
    fn unresolvable_require_fails() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "main.js", "require('./missing');");
        let err = bundle(&entry, dir.path()).unwrap_err();
        assert!(matches!(err, BundleError::Resolution { specifier, .. } if specifier == "./missing"));
    }

    #[test]
    fn write_keeps_both_bundles() {
        let (dir, entry) = sample_project();
        let out = dir.path().join("build").join("js");
        let bundle = bundle(&entry, dir.path()).unwrap();
        let artifact = bundle.write(&out, "fade-led").unwrap();

        let full = fs::read_to_string(out.join("fade-led.bundle.js")).unwrap();
        let min = fs::read_to_string(out.join("fade-led.bundle.min.js")).unwrap();
        assert_eq!(full, bundle.text);
        assert_eq!(min, artifact.text);
        assert_eq!(artifact.length, min.len());
        assert!(artifact.length < full.len());
    }
}
