//! Worker lifecycle: install, activate, request interception, and the
//! background hooks.
//!
//! Install pre-populates the caches (core assets fatally, optional assets
//! best-effort), activate sweeps partitions left behind by older versions
//! and claims the open contexts, and interception delegates to the
//! strategy executor with an offline fallback when everything fails.

use std::sync::{Arc, RwLock};

use units_hub_core::cache::CacheDb;
use units_hub_core::strategy::{self, PartitionKind};
use units_hub_core::{AppConfig, Error, ResourceRequest};
use units_hub_client::{FetchResponse, NetworkFetch};

use crate::response::WorkerResponse;
use crate::runtime::{HostRuntime, Notification, NotificationAction};
use crate::strategies::StrategyExecutor;

/// Lifecycle states. A new install supersedes whatever was active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Installing,
    Waiting,
    Active,
}

/// The offline worker: owns the caches and orchestrates the lifecycle.
pub struct Worker {
    cache: CacheDb,
    fetcher: Arc<dyn NetworkFetch>,
    runtime: Arc<dyn HostRuntime>,
    executor: StrategyExecutor,
    config: Arc<AppConfig>,
    state: RwLock<WorkerState>,
}

impl Worker {
    pub fn new(
        cache: CacheDb, fetcher: Arc<dyn NetworkFetch>, runtime: Arc<dyn HostRuntime>, config: Arc<AppConfig>,
    ) -> Self {
        let executor = StrategyExecutor::new(cache.clone(), Arc::clone(&fetcher), Arc::clone(&config));
        Self { cache, fetcher, runtime, executor, config, state: RwLock::new(WorkerState::Idle) }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().expect("state lock poisoned")
    }

    fn set_state(&self, state: WorkerState) {
        let mut guard = self.state.write().expect("state lock poisoned");
        tracing::debug!(from = ?*guard, to = ?state, "lifecycle transition");
        *guard = state;
    }

    /// Install: pre-populate the caches.
    ///
    /// Every core asset must land in the static partition or the whole
    /// install fails; no partial core cache is acceptable. Optional assets
    /// are cached into the image partition independently and any subset
    /// may fail. On success the worker preempts any active instance
    /// instead of waiting for it to be released.
    pub async fn install(&self) -> Result<(), Error> {
        self.set_state(WorkerState::Installing);
        tracing::info!(version = %self.config.cache_version, "installing new version");

        for name in self.config.partition_names() {
            self.cache
                .open_partition(&name)
                .await
                .map_err(|e| Error::InstallFailed(format!("could not open partition {name}: {e}")))?;
        }

        self.populate_static(true).await?;
        self.cache_optional_assets().await;

        tracing::info!("install complete, preempting any active instance");
        self.set_state(WorkerState::Waiting);
        Ok(())
    }

    /// Activate: sweep stale partitions, purge expired entries, and take
    /// control of all currently open contexts. Activation is only
    /// reported done once all of it has completed.
    pub async fn activate(&self) -> Result<(), Error> {
        tracing::info!(version = %self.config.cache_version, "activating");

        self.cleanup_stale_partitions().await;

        match self.cache.purge_expired(self.config.max_age()).await {
            Ok(0) => {}
            Ok(purged) => tracing::info!(purged, "purged expired entries"),
            Err(e) => tracing::warn!(error = %e, "expiry purge failed"),
        }

        self.runtime.claim_contexts().await?;

        self.set_state(WorkerState::Active);
        Ok(())
    }

    /// Intercept one incoming request.
    ///
    /// Non-GET requests bypass caching entirely and go straight to the
    /// network. For GET requests the classified strategy runs; if it
    /// fails, a deterministic offline fallback is substituted so the
    /// requester never sees a hard error.
    pub async fn intercept(&self, request: &ResourceRequest) -> Result<WorkerResponse, Error> {
        if !request.is_get() {
            let response = self.fetcher.fetch(request).await?;
            return Ok(WorkerResponse::from_network(&response));
        }

        let chosen = strategy::classify(request, &self.config);
        tracing::debug!(url = %request.url, strategy = ?chosen, "intercepting");

        match self.executor.execute(request, chosen).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "strategy failed, serving offline fallback");
                Ok(self.offline_fallback(request).await)
            }
        }
    }

    /// Deterministic fallback when both network and cache have failed:
    /// the cached application shell for HTML, the cached placeholder icon
    /// for images, a synthesized 503 JSON response for everything else.
    async fn offline_fallback(&self, request: &ResourceRequest) -> WorkerResponse {
        if request.accepts_html()
            && let Some(shell) = self.find_asset(&self.config.shell_asset).await
        {
            return WorkerResponse::fallback_from_cached(shell);
        }

        if strategy::is_image_path(request)
            && let Some(icon) = self.find_asset(&self.config.placeholder_icon).await
        {
            return WorkerResponse::fallback_from_cached(icon);
        }

        WorkerResponse::offline()
    }

    /// Look an application asset up across all partitions.
    async fn find_asset(&self, path: &str) -> Option<units_hub_core::CachedEntry> {
        let url = self.config.asset_url(path).ok()?;
        let request = ResourceRequest::get(url.as_str()).ok()?;
        self.executor.find_cached(&request).await
    }

    /// Background sync hook. The conversions tag is a no-op stub; there
    /// is no offline mutation queue to replay yet.
    pub async fn sync(&self, tag: &str) -> Result<(), Error> {
        tracing::info!(tag, "background sync triggered");
        if tag == "background-sync-conversions" {
            tracing::debug!("conversion sync complete (nothing to replay)");
        }
        Ok(())
    }

    /// Push hook: turn the payload into a displayed notification.
    pub async fn push(&self, payload: Option<serde_json::Value>) -> Result<(), Error> {
        let Some(payload) = payload else {
            tracing::debug!("push event without payload, ignoring");
            return Ok(());
        };

        let title = payload
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Units Hub")
            .to_string();
        let body = payload
            .get("body")
            .and_then(|v| v.as_str())
            .unwrap_or("New update available!")
            .to_string();

        let notification = Notification {
            title,
            body,
            icon: self.config.placeholder_icon.clone(),
            badge: self.config.placeholder_icon.clone(),
            actions: vec![
                NotificationAction { action: "open".into(), title: "Open App".into() },
                NotificationAction { action: "dismiss".into(), title: "Dismiss".into() },
            ],
            data: payload.get("data").cloned(),
        };

        self.runtime.show_notification(&notification).await
    }

    /// Notification click hook: focus an open context or open a new one.
    pub async fn notification_click(&self, action: &str) -> Result<(), Error> {
        if action != "open" {
            return Ok(());
        }

        let contexts = self.runtime.open_contexts().await?;
        match contexts.first() {
            Some(id) => self.runtime.focus_context(id).await,
            None => self.runtime.open_window("/").await,
        }
    }

    /// Periodic sync hook: refresh the static partition in the background
    /// with the same fetch and write path as install, each asset
    /// best-effort.
    pub async fn periodic_sync(&self, tag: &str) -> Result<(), Error> {
        tracing::info!(tag, "periodic sync triggered");
        if tag == "update-cache" {
            self.populate_static(false).await?;
            tracing::debug!("background cache update complete");
        }
        Ok(())
    }

    /// Fetch every core asset into the static partition.
    ///
    /// With `fatal` set any failure aborts (install); otherwise failures
    /// are logged per asset and the rest continue (periodic refresh).
    async fn populate_static(&self, fatal: bool) -> Result<(), Error> {
        let partition = self.config.partition_name(PartitionKind::Static);

        for asset in &self.config.core_assets {
            match self.fetch_asset(asset).await {
                Ok((request, response)) if response.is_success() => {
                    let entry = response.to_entry(&request.cache_key());
                    if let Err(e) = self.cache.put(&partition, &entry).await {
                        if fatal {
                            return Err(Error::InstallFailed(format!("{asset}: {e}")));
                        }
                        tracing::warn!(asset, error = %e, "could not store core asset");
                    }
                }
                Ok((_, response)) => {
                    if fatal {
                        return Err(Error::InstallFailed(format!("{asset}: status {}", response.status)));
                    }
                    tracing::warn!(asset, status = %response.status, "could not update core asset");
                }
                Err(e) => {
                    if fatal {
                        return Err(Error::InstallFailed(format!("{asset}: {e}")));
                    }
                    tracing::warn!(asset, error = %e, "could not update core asset");
                }
            }
        }

        Ok(())
    }

    /// Cache optional assets into the image partition, each attempted
    /// independently.
    async fn cache_optional_assets(&self) {
        let partition = self.config.partition_name(PartitionKind::Image);

        for asset in &self.config.optional_assets {
            match self.fetch_asset(asset).await {
                Ok((request, response)) if response.is_success() => {
                    let entry = response.to_entry(&request.cache_key());
                    match self.cache.put(&partition, &entry).await {
                        Ok(_) => tracing::debug!(asset, "cached optional asset"),
                        Err(e) => tracing::warn!(asset, error = %e, "could not store optional asset"),
                    }
                }
                Ok((_, response)) => {
                    tracing::warn!(asset, status = %response.status, "could not cache optional asset");
                }
                Err(e) => {
                    tracing::warn!(asset, error = %e, "could not cache optional asset");
                }
            }
        }
    }

    async fn fetch_asset(&self, path: &str) -> Result<(ResourceRequest, FetchResponse), Error> {
        let url = self.config.asset_url(path)?;
        let request = ResourceRequest::get(url.as_str())?;
        let response = self.fetcher.fetch(&request).await?;
        Ok((request, response))
    }

    /// Delete every partition carrying this application's prefix that is
    /// not one of the three current-version partitions. Unrelated caches
    /// are left alone. Individual deletion failures are logged; the
    /// remaining sweep continues.
    async fn cleanup_stale_partitions(&self) {
        let names = match self.cache.list_partition_names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate partitions for cleanup");
                return;
            }
        };

        let current = self.config.partition_names();
        let prefix = format!("{}-", self.config.cache_prefix);

        for name in names {
            if !name.starts_with(&prefix) || current.contains(&name) {
                continue;
            }
            match self.cache.delete_partition(&name).await {
                Ok(entries) => tracing::info!(partition = %name, entries, "deleted stale partition"),
                Err(e) => tracing::warn!(partition = %name, error = %e, "could not delete stale partition"),
            }
        }
    }
}
