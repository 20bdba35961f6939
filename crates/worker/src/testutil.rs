//! Shared test doubles for the worker crate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, Url, header::HeaderMap};

use units_hub_core::{Error, ResourceRequest};
use units_hub_client::{FetchResponse, NetworkFetch};

use crate::runtime::{HostRuntime, Notification};

/// Scripted network: serves canned responses by URL, counting every
/// fetch. URLs with no script fail as network errors, so `MockFetch::new()`
/// with nothing served behaves like a dead network for unknown hosts and
/// `MockFetch::offline()` is just the explicit spelling of that.
pub struct MockFetch {
    responses: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    calls: AtomicUsize,
}

impl MockFetch {
    pub fn new() -> Self {
        Self { responses: Mutex::new(HashMap::new()), calls: AtomicUsize::new(0) }
    }

    /// A network where every fetch fails.
    pub fn offline() -> Self {
        Self::new()
    }

    /// Script a response for a URL, replacing any earlier script.
    pub fn serve(&self, url: &str, status: u16, body: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_vec()));
    }

    /// Number of fetches attempted so far, failures included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkFetch for MockFetch {
    async fn fetch(&self, request: &ResourceRequest) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.responses.lock().unwrap().get(request.url.as_str()).cloned();
        let Some((status, body)) = scripted else {
            return Err(Error::FetchFailed(format!("network error: {} unreachable", request.url)));
        };

        let url = Url::parse(request.url.as_str()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(FetchResponse {
            final_url: url.clone(),
            url,
            status: StatusCode::from_u16(status).map_err(|e| Error::InvalidInput(e.to_string()))?,
            content_type: None,
            bytes: Bytes::from(body),
            headers: HeaderMap::new(),
            fetch_ms: 0,
        })
    }
}

/// Host runtime that records every interaction for assertions.
#[derive(Default)]
pub struct RecordingRuntime {
    contexts: Vec<String>,
    claims: AtomicUsize,
    focused: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingRuntime {
    /// A runtime with the given contexts already open.
    pub fn with_contexts(ids: &[&str]) -> Self {
        Self { contexts: ids.iter().map(|s| s.to_string()).collect(), ..Default::default() }
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    pub fn focused(&self) -> Vec<String> {
        self.focused.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostRuntime for RecordingRuntime {
    async fn open_contexts(&self) -> Result<Vec<String>, Error> {
        Ok(self.contexts.clone())
    }

    async fn claim_contexts(&self) -> Result<(), Error> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn focus_context(&self, id: &str) -> Result<(), Error> {
        self.focused.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn open_window(&self, path: &str) -> Result<(), Error> {
        self.opened.lock().unwrap().push(path.to_string());
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
