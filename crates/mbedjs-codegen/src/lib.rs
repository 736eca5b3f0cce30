//! Code generation support for mbedjs builds.
//!
//! Turns build-scoped values into C++ sources for the JavaScript launcher:
//! - **Sanitization:** symbol names and string literal bodies safe to splice
//!   into generated C++
//! - **Rendering:** a small substitution-only template language
//! - **Emission:** writing rendered files into the staging tree with a digest

pub mod error;
pub mod hash;
pub mod render;
pub mod sanitize;
pub mod templates;

pub use error::{CodegenError, Result};
pub use hash::{content_hash, hash_hex, ContentHash};
pub use render::{RenderContext, Template};
pub use sanitize::{sanitize_identifier, sanitize_string_literal, EmbeddedSource, LITERAL_ESCAPES};
pub use templates::{
    copy_static, render_to_file, write_file, GeneratedFile, TemplateSet, IGNORE_TEMPLATE,
    JS_SOURCE_TEMPLATE, MAIN_TEMPLATE, MAKEFILE_TEMPLATE,
};
