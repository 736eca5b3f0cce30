//! Template lookup and emission into the staging tree.
//!
//! Built-in templates ship inside the binary. A project can replace any of them
//! by placing a file with the same name in its override directory (`tmpl/`).

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{CodegenError, Result};
use crate::hash::{content_hash, hash_hex};
use crate::render::{RenderContext, Template};

/// Program-embedding source file template.
pub const JS_SOURCE_TEMPLATE: &str = "js_source.cpp.tmpl";
/// Entry-point source file template.
pub const MAIN_TEMPLATE: &str = "main.cpp.tmpl";
/// Native build makefile, copied verbatim.
pub const MAKEFILE_TEMPLATE: &str = "Makefile.tmpl";
/// mbed ignore list, copied verbatim.
pub const IGNORE_TEMPLATE: &str = "mbedignore.tmpl";

const BUILTIN: &[(&str, &str)] = &[
    (JS_SOURCE_TEMPLATE, include_str!("../templates/js_source.cpp.tmpl")),
    (MAIN_TEMPLATE, include_str!("../templates/main.cpp.tmpl")),
    (MAKEFILE_TEMPLATE, include_str!("../templates/Makefile.tmpl")),
    (IGNORE_TEMPLATE, include_str!("../templates/mbedignore.tmpl")),
];

/// Where template text comes from.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    override_dir: Option<PathBuf>,
}

impl TemplateSet {
    /// Built-in templates only.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Built-ins, shadowed by files in `dir` when present.
    pub fn with_overrides(dir: impl Into<PathBuf>) -> Self {
        Self {
            override_dir: Some(dir.into()),
        }
    }

    /// Names of all built-in templates.
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(name, _)| *name)
    }

    /// Path of the override file for `name`, if one exists.
    pub fn override_path(&self, name: &str) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|dir| dir.join(name))
            .filter(|path| path.is_file())
    }

    /// Fetch the raw text of a template.
    pub fn source(&self, name: &str) -> Result<Cow<'static, str>> {
        if let Some(path) = self.override_path(name) {
            debug!(template = name, path = %path.display(), "using project template");
            let text = fs::read_to_string(&path).map_err(|source| CodegenError::Io {
                path: path.clone(),
                source,
            })?;
            return Ok(Cow::Owned(text));
        }
        BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, text)| Cow::Borrowed(*text))
            .ok_or_else(|| CodegenError::MissingTemplate {
                name: name.to_string(),
            })
    }

    /// Parse and render a template.
    pub fn render(&self, name: &str, context: &RenderContext) -> Result<String> {
        let text = self.source(name)?;
        Template::parse(&text)?.render(context)
    }
}

/// A file written into the staging tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    /// Destination path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: usize,
    /// SHA-256 of the contents, hex encoded.
    pub digest: String,
}

impl GeneratedFile {
    fn describe(path: &Path, contents: &[u8]) -> Self {
        Self {
            path: path.to_path_buf(),
            size: contents.len(),
            digest: hash_hex(&content_hash(contents)),
        }
    }
}

/// Write `contents` to `dest`, creating parent directories.
pub fn write_file(dest: &Path, contents: &str) -> Result<GeneratedFile> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| CodegenError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(dest, contents).map_err(|source| CodegenError::Io {
        path: dest.to_path_buf(),
        source,
    })?;
    Ok(GeneratedFile::describe(dest, contents.as_bytes()))
}

/// Render template `name` with `context` and write the result to `dest`.
pub fn render_to_file(
    templates: &TemplateSet,
    name: &str,
    context: &RenderContext,
    dest: &Path,
) -> Result<GeneratedFile> {
    let text = templates.render(name, context)?;
    write_file(dest, &text)
}

/// Copy template `name` to `dest` without substitution.
pub fn copy_static(templates: &TemplateSet, name: &str, dest: &Path) -> Result<GeneratedFile> {
    let text = templates.source(name)?;
    write_file(dest, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::EmbeddedSource;
    use serde_json::json;

    fn js_source_context() -> RenderContext {
        RenderContext::new()
            .with("js_files", &vec![EmbeddedSource::new("fade-led", "a(\"x\");\nb();")])
            .unwrap()
            .with(
                "pins",
                &json!([{"symbol": "D0", "literal": "D0", "value": "3"}]),
            )
            .unwrap()
            .with("pin_count", &1)
            .unwrap()
    }

    #[test]
    fn builtin_templates_parse() {
        let set = TemplateSet::builtin();
        for name in TemplateSet::builtin_names() {
            let text = set.source(name).unwrap();
            Template::parse(&text).unwrap();
        }
    }

    #[test]
    fn builtin_js_source_embeds_program() {
        let out = TemplateSet::builtin()
            .render(JS_SOURCE_TEMPLATE, &js_source_context())
            .unwrap();
        assert!(out.contains("static const char fade_led_js[] = \"a(\\\"x\\\");\\nb();\";"));
        assert!(out.contains("fade_led_js_length = 12;"));
        assert!(out.contains("#define MBEDJS_PIN_D0 3"));
        assert!(out.contains("magic_string_count = 1;"));
    }

    #[test]
    fn builtin_main_lists_libraries() {
        let ctx = RenderContext::new()
            .with(
                "libraries",
                &json!([{"name": "mbed-dht", "symbol": "mbed_dht", "source_dirs": ["../x/src"], "config": {}}]),
            )
            .unwrap();
        let out = TemplateSet::builtin().render(MAIN_TEMPLATE, &ctx).unwrap();
        assert!(out.contains("#include \"mbed_dht_lib.h\""));
        assert!(out.contains("JERRY_USE_MBED_LIBRARY(mbed_dht);"));
        assert!(out.contains("// mbed-dht: ../x/src"));
    }

    #[test]
    fn override_directory_shadows_builtin() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MAKEFILE_TEMPLATE), "custom:\n").unwrap();
        let set = TemplateSet::with_overrides(dir.path());
        assert_eq!(set.source(MAKEFILE_TEMPLATE).unwrap(), "custom:\n");
        // Not overridden: falls back to the built-in.
        assert!(set.source(IGNORE_TEMPLATE).unwrap().contains("jerryscript/"));
    }

    #[test]
    fn missing_template_is_reported() {
        let err = TemplateSet::builtin().source("nope.tmpl").unwrap_err();
        assert!(matches!(err, CodegenError::MissingTemplate { .. }));
    }

    #[test]
    fn render_to_file_writes_and_digests() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("source").join("fade_js_source.cpp");
        let set = TemplateSet::builtin();

        let first = render_to_file(&set, JS_SOURCE_TEMPLATE, &js_source_context(), &dest).unwrap();
        let second = render_to_file(&set, JS_SOURCE_TEMPLATE, &js_source_context(), &dest).unwrap();

        assert!(dest.is_file());
        assert_eq!(first.size, fs::read(&dest).unwrap().len());
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn copy_static_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join(".mbedignore");
        copy_static(&TemplateSet::builtin(), IGNORE_TEMPLATE, &dest).unwrap();
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            TemplateSet::builtin().source(IGNORE_TEMPLATE).unwrap()
        );
    }
}
