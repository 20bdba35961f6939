//! Normalized request identity and cache key derivation.
//!
//! A cache entry is keyed by the request identity: HTTP method plus the
//! normalized URL. Normalization keeps two requests for the same resource
//! from producing distinct keys:
//!
//! 1. Lowercase the host
//! 2. Remove fragment (#...)
//! 3. Keep query string intact (do not reorder)

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::Error;

/// An incoming resource request as delivered by the host runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// Uppercase HTTP method.
    pub method: String,
    /// Normalized request URL.
    pub url: Url,
    /// Value of the Accept header, if the request carried one.
    pub accept: Option<String>,
}

impl ResourceRequest {
    /// Build a request from a method and URL string, normalizing the URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` for unparseable URLs or non-http(s)
    /// schemes.
    pub fn new(method: &str, url: &str) -> Result<Self, Error> {
        let mut parsed = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
        }

        if let Some(host) = parsed.host_str() {
            let lowered = host.to_lowercase();
            if lowered != host {
                parsed.set_host(Some(&lowered)).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            }
        }

        parsed.set_fragment(None);

        Ok(Self { method: method.to_uppercase(), url: parsed, accept: None })
    }

    /// A GET request, the only kind the cache ever stores.
    pub fn get(url: &str) -> Result<Self, Error> {
        Self::new("GET", url)
    }

    /// Attach an Accept header value, used for offline fallback selection.
    pub fn with_accept(mut self, accept: &str) -> Self {
        self.accept = Some(accept.to_string());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Whether the request declares it accepts HTML.
    pub fn accepts_html(&self) -> bool {
        self.accept.as_deref().is_some_and(|a| a.contains("text/html"))
    }

    /// Lowercase extension of the final path segment, if any.
    pub fn path_extension(&self) -> Option<String> {
        let path = self.url.path();
        let segment = path.rsplit('/').next()?;
        let (_, ext) = segment.rsplit_once('.')?;
        if ext.is_empty() { None } else { Some(ext.to_lowercase()) }
    }

    /// Content-addressed cache key for this request identity.
    pub fn cache_key(&self) -> String {
        compute_cache_key(&self.method, self.url.as_str())
    }
}

/// Compute a content-addressed cache key for a request identity.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
