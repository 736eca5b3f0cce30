//! Native library discovery.
//!
//! A dependency that ships native code carries an `mbedjs.json` file at its
//! package root. Each declared dependency is probed concurrently. A dependency
//! without the file is skipped; one whose file cannot be read or parsed is
//! reported and left out of the build. A file that disappears between the
//! probe and the read aborts aggregation.

use std::io;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{BuildError, Result};

/// Library metadata file name, at the root of a dependency.
pub const LIBRARY_METADATA_FILE: &str = "mbedjs.json";

/// Prefix for library source directories as seen from the native build's
/// working directory inside the fetched toolchain.
pub const LIBRARY_PATH_PREFIX: &str = "../../../../node_modules";

/// A native library contributed by a dependency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryDescriptor {
    /// Dependency name.
    pub name: String,
    /// Source directories, rewritten relative to the native build.
    pub source_dirs: Vec<String>,
    /// The metadata document as written.
    pub config: Value,
}

/// A dependency whose metadata could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataIssue {
    pub dependency: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of probing every dependency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    /// Usable libraries, in dependency declaration order.
    pub libraries: Vec<LibraryDescriptor>,
    /// Dependencies excluded because of unreadable or malformed metadata.
    pub skipped: Vec<MetadataIssue>,
}

impl Aggregation {
    /// Every library source directory, in order.
    pub fn source_dirs(&self) -> impl Iterator<Item = &str> {
        self.libraries
            .iter()
            .flat_map(|lib| lib.source_dirs.iter().map(String::as_str))
    }
}

#[derive(Debug, Deserialize)]
struct LibraryMetadata {
    #[serde(default)]
    source: Vec<String>,
}

#[derive(Debug)]
enum Probe {
    Absent,
    Found(LibraryDescriptor),
    Unusable(MetadataIssue),
}

/// Probe each of `dependencies` under `node_modules` for library metadata.
pub async fn aggregate_libraries(node_modules: &Path, dependencies: &[String]) -> Result<Aggregation> {
    let probes = dependencies
        .iter()
        .map(|dep| probe(dep, node_modules.join(dep).join(LIBRARY_METADATA_FILE)));
    let results = join_all(probes).await;

    let mut aggregation = Aggregation::default();
    for result in results {
        match result? {
            Probe::Absent => {}
            Probe::Found(library) => aggregation.libraries.push(library),
            Probe::Unusable(issue) => {
                warn!(
                    dependency = %issue.dependency,
                    path = %issue.path.display(),
                    reason = %issue.reason,
                    "ignoring library metadata"
                );
                aggregation.skipped.push(issue);
            }
        }
    }
    info!(
        libraries = aggregation.libraries.len(),
        skipped = aggregation.skipped.len(),
        "aggregated native libraries"
    );
    Ok(aggregation)
}

async fn probe(dependency: &str, path: PathBuf) -> Result<Probe> {
    match tokio::fs::try_exists(&path).await {
        Ok(true) => read_metadata(dependency, path).await,
        Ok(false) => {
            debug!(dependency, "no library metadata");
            Ok(Probe::Absent)
        }
        Err(err) => Ok(Probe::Unusable(issue(dependency, path, err.to_string()))),
    }
}

/// Read metadata already known to exist.
async fn read_metadata(dependency: &str, path: PathBuf) -> Result<Probe> {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(BuildError::MetadataRace {
                dependency: dependency.to_string(),
                path,
            });
        }
        Err(err) => return Ok(Probe::Unusable(issue(dependency, path, err.to_string()))),
    };

    let config: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => return Ok(Probe::Unusable(issue(dependency, path, err.to_string()))),
    };
    let metadata: LibraryMetadata = match serde_json::from_value(config.clone()) {
        Ok(metadata) => metadata,
        Err(err) => return Ok(Probe::Unusable(issue(dependency, path, err.to_string()))),
    };

    let source_dirs = metadata
        .source
        .iter()
        .map(|dir| format!("{LIBRARY_PATH_PREFIX}/{dependency}/{dir}"))
        .collect();
    debug!(dependency, "found native library");
    Ok(Probe::Found(LibraryDescriptor {
        name: dependency.to_string(),
        source_dirs,
        config,
    }))
}

fn issue(dependency: &str, path: PathBuf, reason: String) -> MetadataIssue {
    MetadataIssue {
        dependency: dependency.to_string(),
        path,
        reason,
    }
}
