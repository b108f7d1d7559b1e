pub mod account;
pub mod config;
pub mod ou;

use std::future::Future;
use std::path::Path;

use anyhow::Context;
use vending_core::{Config, Provider};

/// Load the config at `path` and build a provider from it.
pub fn provider(path: &Path) -> anyhow::Result<Provider> {
    let config = Config::load(path).context("failed to load config")?;
    Provider::from_config(&config).context("failed to configure remote clients")
}

/// Drive `fut` to completion on a fresh single-threaded runtime.
pub fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    Ok(rt.block_on(fut))
}
