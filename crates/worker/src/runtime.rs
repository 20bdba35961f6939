//! Host runtime seam.
//!
//! The surrounding runtime owns the consuming contexts (open pages) and
//! the notification surface; the worker only ever talks to them through
//! this trait. Production embeds supply their own implementation;
//! `DetachedRuntime` backs the standalone priming binary and anything
//! else that runs without open contexts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use units_hub_core::Error;

/// An action button attached to a displayed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A notification handed to the host runtime for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub actions: Vec<NotificationAction>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Primitives the host runtime provides to the worker.
#[async_trait]
pub trait HostRuntime: Send + Sync {
    /// Identifiers of all currently open consuming contexts.
    async fn open_contexts(&self) -> Result<Vec<String>, Error>;

    /// Take control of all currently open contexts, not only future ones.
    async fn claim_contexts(&self) -> Result<(), Error>;

    /// Bring an open context to the foreground.
    async fn focus_context(&self, id: &str) -> Result<(), Error>;

    /// Open a new context at the given path.
    async fn open_window(&self, path: &str) -> Result<(), Error>;

    /// Display a notification.
    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;
}

/// Runtime for running the worker without any host embedding: there are
/// no contexts to claim or focus, and notifications go to the log.
#[derive(Debug, Default)]
pub struct DetachedRuntime;

#[async_trait]
impl HostRuntime for DetachedRuntime {
    async fn open_contexts(&self) -> Result<Vec<String>, Error> {
        Ok(Vec::new())
    }

    async fn claim_contexts(&self) -> Result<(), Error> {
        tracing::debug!("no open contexts to claim");
        Ok(())
    }

    async fn focus_context(&self, id: &str) -> Result<(), Error> {
        Err(Error::Runtime(format!("no such context: {id}")))
    }

    async fn open_window(&self, path: &str) -> Result<(), Error> {
        tracing::info!(path, "open window requested");
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, body = %notification.body, "notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_detached_runtime_has_no_contexts() {
        let runtime = DetachedRuntime;
        assert!(runtime.open_contexts().await.unwrap().is_empty());
        assert!(runtime.claim_contexts().await.is_ok());
        assert!(runtime.focus_context("ctx-1").await.is_err());
    }

    #[test]
    fn test_notification_serialization() {
        let notification = Notification {
            title: "Units Hub".into(),
            body: "New update available!".into(),
            icon: "/icon-192.png".into(),
            badge: "/icon-192.png".into(),
            actions: vec![NotificationAction { action: "open".into(), title: "Open App".into() }],
            data: None,
        };
        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("\"open\""));
    }
}
