//! The three fetch strategies.
//!
//! Each strategy composes cache reads and writes with a network fetch:
//!
//! - **cache-first**: serve from cache, fetch only on miss
//! - **network-first**: fetch, fall back to cache when the network fails
//! - **stale-while-revalidate**: serve stale immediately, refresh detached
//!
//! Failures propagate to the caller unretried; the lifecycle layer turns
//! them into offline fallbacks. Cache write failures never propagate —
//! storage exhaustion degrades to "the response was not persisted".

use std::sync::Arc;

use units_hub_core::cache::{CacheDb, CachedEntry};
use units_hub_core::strategy::{self, PartitionKind, Strategy};
use units_hub_core::{AppConfig, Error, ResourceRequest};
use units_hub_client::{FetchResponse, NetworkFetch};

use crate::response::WorkerResponse;

/// Executes a caching strategy for one request.
pub struct StrategyExecutor {
    cache: CacheDb,
    fetcher: Arc<dyn NetworkFetch>,
    config: Arc<AppConfig>,
}

impl StrategyExecutor {
    pub fn new(cache: CacheDb, fetcher: Arc<dyn NetworkFetch>, config: Arc<AppConfig>) -> Self {
        Self { cache, fetcher, config }
    }

    /// Execute the given strategy for a request.
    ///
    /// # Errors
    ///
    /// Propagates the network failure when neither network nor cache can
    /// produce a response; the caller substitutes the offline fallback.
    pub async fn execute(&self, request: &ResourceRequest, strategy: Strategy) -> Result<WorkerResponse, Error> {
        match strategy {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    /// Look the request up in all partitions, static first.
    ///
    /// Store errors degrade to a miss so a broken cache never takes the
    /// request path down with it.
    pub(crate) async fn find_cached(&self, request: &ResourceRequest) -> Option<CachedEntry> {
        let partitions = self.config.partition_names();
        match self.cache.find(&partitions, &request.cache_key()).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn cache_first(&self, request: &ResourceRequest) -> Result<WorkerResponse, Error> {
        if let Some(entry) = self.find_cached(request).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(WorkerResponse::from_cached(entry));
        }

        tracing::debug!(url = %request.url, "cache miss, fetching from network");
        let response = self.fetcher.fetch(request).await?;
        write_through(&self.cache, &self.config, request, &response).await;
        Ok(WorkerResponse::from_network(&response))
    }

    async fn network_first(&self, request: &ResourceRequest) -> Result<WorkerResponse, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                write_through(&self.cache, &self.config, request, &response).await;
                Ok(WorkerResponse::from_network(&response))
            }
            Err(network_err) => {
                tracing::debug!(url = %request.url, error = %network_err, "network failed, trying cache");
                match self.find_cached(request).await {
                    Some(entry) => Ok(WorkerResponse::from_cached(entry)),
                    None => Err(network_err),
                }
            }
        }
    }

    async fn stale_while_revalidate(&self, request: &ResourceRequest) -> Result<WorkerResponse, Error> {
        match self.find_cached(request).await {
            Some(entry) => {
                // Serve stale immediately; refresh without a join point.
                self.spawn_revalidate(request.clone());
                tracing::debug!(url = %request.url, "stale cache hit");
                Ok(WorkerResponse::from_cached(entry))
            }
            None => {
                tracing::debug!(url = %request.url, "no cached copy, waiting for network");
                let response = self.fetcher.fetch(request).await?;
                write_through(&self.cache, &self.config, request, &response).await;
                Ok(WorkerResponse::from_network(&response))
            }
        }
    }

    /// Detached revalidation fetch. It runs to completion or failure
    /// regardless of the original caller; failure only reaches the log.
    fn spawn_revalidate(&self, request: ResourceRequest) {
        let cache = self.cache.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let config = Arc::clone(&self.config);
        tokio::spawn(async move {
            match fetcher.fetch(&request).await {
                Ok(response) => {
                    write_through(&cache, &config, &request, &response).await;
                    tracing::debug!(url = %request.url, "background cache update");
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "background update failed");
                }
            }
        });
    }
}

/// Store a successful network response in the partition the request
/// targets, bounding the dynamic partition afterwards.
///
/// Shared by every strategy. Store failures are logged and contained
/// here.
pub(crate) async fn write_through(
    cache: &CacheDb, config: &AppConfig, request: &ResourceRequest, response: &FetchResponse,
) {
    if !response.is_success() {
        return;
    }

    let kind = strategy::target_partition(request, config);
    let partition = config.partition_name(kind);
    let entry = response.to_entry(&request.cache_key());

    match cache.put(&partition, &entry).await {
        Ok(stored) => {
            if stored && kind == PartitionKind::Dynamic {
                if let Err(e) = cache.enforce_limit(&partition, config.max_dynamic_items).await {
                    tracing::warn!(partition, error = %e, "failed to bound dynamic partition");
                }
            }
            tracing::debug!(url = %request.url, partition, "cached response");
        }
        Err(e) => {
            tracing::warn!(url = %request.url, partition, error = %e, "response was not persisted");
        }
    }
}
