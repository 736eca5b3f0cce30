//! CLI command implementations.

pub mod build;
pub mod bundle;
pub mod clean;
pub mod doctor;
pub mod init;
pub mod libs;
pub mod pins;

use std::future::Future;

use anyhow::{Context, Result};

/// Run an async operation to completion on a fresh multi-threaded runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    Ok(runtime.block_on(future))
}
