//! Caching strategy classification and partition targeting.
//!
//! Both classifiers are pure and total: every GET request is assigned
//! exactly one strategy and exactly one write-through partition, derived
//! from the request URL, the serving origin and the core asset set.

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::request::ResourceRequest;

/// Extensions treated as images for classification, partition targeting
/// and offline fallbacks.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "ico"];

/// Fetch strategies applied by the interception layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve from cache, fetch only on miss. For resources that rarely change.
    CacheFirst,
    /// Fetch first, fall back to cache when the network fails.
    NetworkFirst,
    /// Serve stale from cache immediately, refresh in the background.
    StaleWhileRevalidate,
}

/// The three cache partitions, in lookup priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Static,
    Dynamic,
    Image,
}

impl PartitionKind {
    /// Segment used in partition names (`{prefix}-{kind}-{version}`).
    pub fn as_str(self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Dynamic => "dynamic",
            PartitionKind::Image => "images",
        }
    }
}

/// Whether the request path names an image by extension.
pub fn is_image_path(request: &ResourceRequest) -> bool {
    request.path_extension().is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether the request path matches an entry of the core asset set.
///
/// The root asset `/` matches only the root path exactly; every other
/// asset matches by path suffix so that relative deployments (`/app/style.css`)
/// still hit.
pub fn is_core_asset(request: &ResourceRequest, core_assets: &[String]) -> bool {
    let path = request.url.path();
    core_assets.iter().any(|asset| {
        if asset == "/" { path == "/" } else { path.ends_with(asset.as_str()) }
    })
}

/// Whether the request targets the serving origin.
fn is_same_origin(request: &ResourceRequest, config: &AppConfig) -> bool {
    match url::Url::parse(&config.origin) {
        Ok(origin) => request.url.origin() == origin.origin(),
        // Unparseable origin is rejected at config validation; classify
        // conservatively if one slips through.
        Err(_) => false,
    }
}

/// Assign a caching strategy to a request. First match wins:
///
/// 1. Core assets rarely change: cache-first.
/// 2. Images and static assets: cache-first.
/// 3. Cross-origin resources (API calls, CDNs): network-first.
/// 4. Everything else: stale-while-revalidate.
pub fn classify(request: &ResourceRequest, config: &AppConfig) -> Strategy {
    if is_core_asset(request, &config.core_assets) {
        return Strategy::CacheFirst;
    }

    if is_image_path(request) {
        return Strategy::CacheFirst;
    }

    if !is_same_origin(request, config) {
        return Strategy::NetworkFirst;
    }

    Strategy::StaleWhileRevalidate
}

/// Partition a successful response for this request is written through to.
///
/// Images land in the image partition, core assets in static, everything
/// else in dynamic (which is size-bounded).
pub fn target_partition(request: &ResourceRequest, config: &AppConfig) -> PartitionKind {
    if is_image_path(request) {
        PartitionKind::Image
    } else if is_core_asset(request, &config.core_assets) {
        PartitionKind::Static
    } else {
        PartitionKind::Dynamic
    }
}
