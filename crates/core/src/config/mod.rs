//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (UNITS_HUB_*)
//! 2. TOML config file (if UNITS_HUB_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The configuration is immutable once loaded and is passed explicitly to
//! every component: the cache version, partition prefix and asset sets have
//! a single source of truth instead of globals.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::strategy::PartitionKind;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (UNITS_HUB_*)
/// 2. TOML config file (if UNITS_HUB_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Opaque version string embedded in every partition name.
    ///
    /// Bumping it on deploy creates fresh partitions and orphans the old
    /// ones for the activate-time cleanup sweep.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Partition name prefix; partitions are named `{prefix}-{kind}-{version}`.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Origin the application is served from.
    ///
    /// Requests to any other origin are classified network-first.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of entries in the dynamic partition.
    ///
    /// Enforced after every dynamic write, oldest-inserted entries first.
    #[serde(default = "default_max_dynamic_items")]
    pub max_dynamic_items: usize,

    /// Maximum age of a cached entry in days.
    ///
    /// Entries older than this are purged during activation, in addition
    /// to the whole-partition replacement on version bump.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,

    /// Paths that must be cached for the application shell to work offline.
    ///
    /// Install fails if any of these cannot be fetched and stored.
    #[serde(default = "default_core_assets")]
    pub core_assets: Vec<String>,

    /// Paths cached best-effort; individual failures are tolerated.
    #[serde(default = "default_optional_assets")]
    pub optional_assets: Vec<String>,

    /// Application shell served as the offline fallback for HTML requests.
    #[serde(default = "default_shell_asset")]
    pub shell_asset: String,

    /// Placeholder served as the offline fallback for image requests.
    #[serde(default = "default_placeholder_icon")]
    pub placeholder_icon: String,
}

fn default_cache_version() -> String {
    "v2.1.0".into()
}

fn default_cache_prefix() -> String {
    "units-hub".into()
}

fn default_origin() -> String {
    "https://units-hub.app".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./units-hub-cache.sqlite")
}

fn default_user_agent() -> String {
    "units-hub-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_dynamic_items() -> usize {
    50
}

fn default_max_age_days() -> i64 {
    30
}

fn default_core_assets() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/style.css",
        "/script.js",
        "/manifest.json",
        "/icon-192.png",
        "/icon-512.png",
    ]
    .map(String::from)
    .to_vec()
}

fn default_optional_assets() -> Vec<String> {
    ["/screenshot-wide.png", "/screenshot-mobile.png"].map(String::from).to_vec()
}

fn default_shell_asset() -> String {
    "/index.html".into()
}

fn default_placeholder_icon() -> String {
    "/icon-192.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_version: default_cache_version(),
            cache_prefix: default_cache_prefix(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_dynamic_items: default_max_dynamic_items(),
            max_age_days: default_max_age_days(),
            core_assets: default_core_assets(),
            optional_assets: default_optional_assets(),
            shell_asset: default_shell_asset(),
            placeholder_icon: default_placeholder_icon(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Maximum entry age as a chrono Duration.
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.max_age_days)
    }

    /// Full partition name for a partition kind at the current version,
    /// e.g. `units-hub-static-v2.1.0`.
    pub fn partition_name(&self, kind: PartitionKind) -> String {
        format!("{}-{}-{}", self.cache_prefix, kind.as_str(), self.cache_version)
    }

    /// The three current-version partition names in lookup priority order:
    /// static, dynamic, images.
    pub fn partition_names(&self) -> [String; 3] {
        [
            self.partition_name(PartitionKind::Static),
            self.partition_name(PartitionKind::Dynamic),
            self.partition_name(PartitionKind::Image),
        ]
    }

    /// Absolute URL for an application asset path on the serving origin.
    pub fn asset_url(&self, path: &str) -> Result<url::Url, crate::Error> {
        let base = url::Url::parse(&self.origin).map_err(|e| crate::Error::InvalidUrl(e.to_string()))?;
        base.join(path).map_err(|e| crate::Error::InvalidUrl(e.to_string()))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `UNITS_HUB_`
    /// 2. TOML file from `UNITS_HUB_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("UNITS_HUB_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("UNITS_HUB_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_version, "v2.1.0");
        assert_eq!(config.cache_prefix, "units-hub");
        assert_eq!(config.db_path, PathBuf::from("./units-hub-cache.sqlite"));
        assert_eq!(config.max_dynamic_items, 50);
        assert_eq!(config.max_age_days, 30);
        assert!(config.core_assets.contains(&"/index.html".to_string()));
        assert!(config.core_assets.contains(&"/style.css".to_string()));
        assert_eq!(config.optional_assets.len(), 2);
    }

    #[test]
    fn test_partition_names() {
        let config = AppConfig::default();
        assert_eq!(config.partition_name(PartitionKind::Static), "units-hub-static-v2.1.0");
        assert_eq!(config.partition_name(PartitionKind::Dynamic), "units-hub-dynamic-v2.1.0");
        assert_eq!(config.partition_name(PartitionKind::Image), "units-hub-images-v2.1.0");
    }

    #[test]
    fn test_partition_names_order() {
        let config = AppConfig::default();
        let names = config.partition_names();
        assert!(names[0].contains("-static-"));
        assert!(names[1].contains("-dynamic-"));
        assert!(names[2].contains("-images-"));
    }

    #[test]
    fn test_partition_names_follow_version() {
        let config = AppConfig { cache_version: "v3.0.0".into(), ..Default::default() };
        assert_eq!(config.partition_name(PartitionKind::Static), "units-hub-static-v3.0.0");
    }

    #[test]
    fn test_asset_url() {
        let config = AppConfig::default();
        let url = config.asset_url("/style.css").unwrap();
        assert_eq!(url.as_str(), "https://units-hub.app/style.css");
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }
}
