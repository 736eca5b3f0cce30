//! Bundling of a CommonJS program into one self-contained script.
//!
//! The bundler walks `require()` calls from an entry file, assigns module ids
//! in discovery order and concatenates every module behind a small loader
//! prelude. The result is then minified for embedding on the device.

pub mod bundle;
pub mod error;
pub mod minify;
pub mod resolve;

pub use bundle::{bundle, Bundle, BundleArtifact, Module};
pub use error::{BundleError, Result};
pub use minify::minify;
pub use resolve::{find_requires, resolve_specifier};
