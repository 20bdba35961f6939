//! Event dispatch.
//!
//! One entry point routes every host-delivered event to the matching
//! lifecycle handler. Each event is awaited to completion before the
//! outcome is reported; the worker is never torn down mid-handler.

use serde::{Deserialize, Serialize};

use units_hub_core::{Error, ResourceRequest};

use crate::lifecycle::Worker;
use crate::response::WorkerResponse;

/// Events delivered by the host runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(ResourceRequest),
    Sync { tag: String },
    Push { payload: Option<serde_json::Value> },
    NotificationClick { action: String },
    PeriodicSync { tag: String },
}

/// What handling an event produced.
#[derive(Debug)]
pub enum EventOutcome {
    /// The handler ran to completion with nothing to return.
    Completed,
    /// A fetch event produced a response.
    Response(WorkerResponse),
}

impl Worker {
    /// Dispatch one event to its handler and await the result.
    pub async fn handle(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        match event {
            WorkerEvent::Install => {
                self.install().await?;
                Ok(EventOutcome::Completed)
            }
            WorkerEvent::Activate => {
                self.activate().await?;
                Ok(EventOutcome::Completed)
            }
            WorkerEvent::Fetch(request) => {
                let response = self.intercept(&request).await?;
                Ok(EventOutcome::Response(response))
            }
            WorkerEvent::Sync { tag } => {
                self.sync(&tag).await?;
                Ok(EventOutcome::Completed)
            }
            WorkerEvent::Push { payload } => {
                self.push(payload).await?;
                Ok(EventOutcome::Completed)
            }
            WorkerEvent::NotificationClick { action } => {
                self.notification_click(&action).await?;
                Ok(EventOutcome::Completed)
            }
            WorkerEvent::PeriodicSync { tag } => {
                self.periodic_sync(&tag).await?;
                Ok(EventOutcome::Completed)
            }
        }
    }
}
