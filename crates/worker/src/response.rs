//! Responses served back to the interception caller.

use serde::{Deserialize, Serialize};
use units_hub_core::cache::CachedEntry;
use units_hub_client::FetchResponse;

/// Where a served response came from. Diagnostic only; the caller gets
/// the same shape either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    Fallback,
}

/// Response handed back from request interception.
#[derive(Debug, Clone)]
pub struct WorkerResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

/// JSON body of the synthesized offline response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineBody {
    pub error: String,
    pub message: String,
}

impl WorkerResponse {
    /// Serve a cached entry.
    pub fn from_cached(entry: CachedEntry) -> Self {
        Self { status: entry.status, headers: entry.headers(), body: entry.body, source: ResponseSource::Cache }
    }

    /// Serve a cached entry as an offline fallback.
    pub fn fallback_from_cached(entry: CachedEntry) -> Self {
        Self { source: ResponseSource::Fallback, ..Self::from_cached(entry) }
    }

    /// Serve a freshly fetched network response.
    pub fn from_network(response: &FetchResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();
        Self { status: response.status.as_u16(), headers, body: response.bytes.to_vec(), source: ResponseSource::Network }
    }

    /// Synthesized 503 response for requests nothing can satisfy offline.
    pub fn offline() -> Self {
        let body = OfflineBody {
            error: "offline".to_string(),
            message: "This feature is not available offline".to_string(),
        };
        // Serializing a plain two-string struct cannot fail.
        let bytes = serde_json::to_vec(&body).unwrap_or_default();
        Self {
            status: 503,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: bytes,
            source: ResponseSource::Fallback,
        }
    }
}
