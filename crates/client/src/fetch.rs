//! HTTP fetch pipeline.
//!
//! ### Behavior
//! - Non-2xx responses are returned to the caller, not mapped to errors;
//!   the strategy layer decides what to do with them (only 2xx is ever
//!   written through to the cache).
//! - Network-level failures (DNS, refused, timeout) surface as
//!   `Error::FetchFailed` so strategies can fall back to the cache.
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, StatusCode, Url, header};
use std::time::{Duration, Instant};

use units_hub_core::cache::CachedEntry;
use units_hub_core::{Error, ResourceRequest};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "units-hub-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "units-hub-sw/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    /// Derive the fetch knobs from the application configuration.
    pub fn from_app(config: &units_hub_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Headers as a JSON array of (name, value) pairs, the shape the
    /// cache store persists. Values that aren't valid UTF-8 are skipped.
    pub fn headers_json(&self) -> Option<String> {
        let pairs: Vec<(String, String)> = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();
        serde_json::to_string(&pairs).ok()
    }

    /// Capture this response as a cache entry for the given request key.
    pub fn to_entry(&self, key: &str) -> CachedEntry {
        CachedEntry::new(key, self.url.as_str(), self.status.as_u16(), self.headers_json(), self.bytes.to_vec())
    }
}

/// The network-fetch primitive the strategy layer composes with cache
/// reads and writes. Implemented by `FetchClient` in production and by
/// mocks in strategy tests.
#[async_trait]
pub trait NetworkFetch: Send + Sync {
    async fn fetch(&self, request: &ResourceRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl NetworkFetch for FetchClient {
    /// Fetch a request, returning raw bytes and metadata.
    ///
    /// Respects the redirect and byte limits; any HTTP status is returned
    /// as a response rather than an error.
    async fn fetch(&self, request: &ResourceRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = Url::parse(request.url.as_str()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method =
            Method::from_bytes(request.method.as_bytes()).map_err(|e| Error::InvalidInput(e.to_string()))?;

        let accept = request
            .accept
            .as_deref()
            .unwrap_or("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8");

        let response = self
            .http
            .request(method, url.clone())
            .header(header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| Error::FetchFailed(format!("network error: {}", e)))?;

        let status = response.status();

        let content_length = response.content_length();
        if let Some(len) = content_length
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::FetchFailed(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} {} in {}ms ({} bytes)", url, final_url, status, fetch_ms, bytes.len());

        Ok(FetchResponse { url, final_url, status, content_type, bytes, headers, fetch_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "units-hub-sw/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = units_hub_core::AppConfig { timeout_ms: 5_000, ..Default::default() };
        let config = FetchConfig::from_app(&app);
        assert_eq!(config.user_agent, app.user_agent);
        assert_eq!(config.timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn test_response_to_entry() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "text/css".parse().unwrap());

        let response = FetchResponse {
            url: Url::parse("https://units-hub.app/style.css").unwrap(),
            final_url: Url::parse("https://units-hub.app/style.css").unwrap(),
            status: StatusCode::OK,
            content_type: Some("text/css".to_string()),
            bytes: Bytes::from_static(b"body { margin: 0 }"),
            headers,
            fetch_ms: 12,
        };

        let entry = response.to_entry("abc123");
        assert_eq!(entry.key, "abc123");
        assert_eq!(entry.status, 200);
        assert!(entry.is_success());
        assert_eq!(entry.body, b"body { margin: 0 }");
        assert_eq!(entry.headers(), vec![("content-type".to_string(), "text/css".to_string())]);
    }

    #[test]
    fn test_non_success_entry_not_storable() {
        let response = FetchResponse {
            url: Url::parse("https://units-hub.app/missing").unwrap(),
            final_url: Url::parse("https://units-hub.app/missing").unwrap(),
            status: StatusCode::NOT_FOUND,
            content_type: None,
            bytes: Bytes::new(),
            headers: header::HeaderMap::new(),
            fetch_ms: 3,
        };

        assert!(!response.is_success());
        assert!(!response.to_entry("k").is_success());
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let config = FetchConfig::default();
        let client = FetchClient::new(config);
        assert!(client.is_ok());
    }
}
