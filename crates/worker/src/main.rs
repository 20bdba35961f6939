//! Standalone cache priming binary.
//!
//! Runs the install and activate lifecycle against the configured origin
//! with a detached host runtime, leaving a primed cache database behind.
//! Embedding hosts drive the same `Worker` through `Worker::handle`
//! instead of this binary.

mod events;
mod lifecycle;
mod response;
mod runtime;
mod strategies;
#[cfg(test)]
mod testutil;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use units_hub_client::{FetchClient, FetchConfig};
use units_hub_core::cache::CacheDb;
use units_hub_core::AppConfig;

use events::WorkerEvent;
use lifecycle::Worker;
use runtime::DetachedRuntime;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    info!(version = %config.cache_version, origin = %config.origin, "starting offline worker");

    let cache = CacheDb::open(&config.db_path).await?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from_app(&config))?);
    let worker = Worker::new(cache.clone(), fetcher, Arc::new(DetachedRuntime), Arc::new(config));

    worker.handle(WorkerEvent::Install).await?;
    worker.handle(WorkerEvent::Activate).await?;

    for name in cache.list_partition_names().await? {
        let entries = cache.count(&name).await?;
        info!(partition = %name, entries, "primed");
    }

    Ok(())
}
