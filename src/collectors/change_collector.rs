use super::{bounded, StatusResult};
use crate::backends::DeploymentApi;
use crate::error::StatusError;
use crate::events::Timestamp;
use chrono::Utc;
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Stack statuses considered settled enough to report as a change
pub const SETTLED_STACK_STATUSES: [&str; 5] = [
    "CREATE_COMPLETE",
    "UPDATE_COMPLETE",
    "UPDATE_ROLLBACK_COMPLETE",
    "ROLLBACK_COMPLETE",
    "UPDATE_ROLLBACK_FAILED",
];

/// A deployment stack that changed inside the lookback window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentChange {
    pub stack_name: String,
    pub status: String,
    pub last_updated: Timestamp,
    /// Stack events inside the window
    pub recent_event_count: usize,
    pub failed_resources: Vec<FailedResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedResource {
    pub resource: String,
    pub status: String,
    pub reason: String,
}

pub struct ChangeCollector {
    api: Arc<dyn DeploymentApi>,
    timeout: Duration,
}

impl ChangeCollector {
    pub fn new(api: Arc<dyn DeploymentApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    /// Stacks changed within `window`, newest first
    pub async fn fetch_recent(&self, window: chrono::Duration) -> StatusResult<Vec<DeploymentChange>> {
        self.fetch_recent_at(window, Utc::now()).await
    }

    /// Same as [`fetch_recent`](Self::fetch_recent) with an explicit "now"
    pub async fn fetch_recent_at(&self, window: chrono::Duration, now: Timestamp) -> StatusResult<Vec<DeploymentChange>> {
        let cutoff = now - window;
        let result = bounded(self.timeout, self.collect(cutoff)).await;
        StatusResult::from_backend(result, "recent changes", "deployment stacks")
    }

    async fn collect(&self, cutoff: Timestamp) -> Result<Vec<DeploymentChange>, StatusError> {
        let stacks = self.api.list_stacks(&SETTLED_STACK_STATUSES).await?;
        let mut changes = Vec::new();

        for stack in stacks {
            let last_updated = stack.last_changed();
            if last_updated <= cutoff {
                continue;
            }

            let events = match self.api.describe_stack_events(&stack.stack_name).await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Skipping stack {}: {}", stack.stack_name, e);
                    continue;
                }
            };

            let recent: Vec<_> = events
                .into_iter()
                .filter(|event| event.timestamp > cutoff)
                .collect();
            if recent.is_empty() {
                continue;
            }

            let failed_resources = recent
                .iter()
                .filter(|event| event.resource_status.contains("FAILED"))
                .map(|event| FailedResource {
                    resource: event.logical_resource_id.clone(),
                    status: event.resource_status.clone(),
                    reason: event
                        .resource_status_reason
                        .clone()
                        .unwrap_or_default(),
                })
                .collect();

            changes.push(DeploymentChange {
                stack_name: stack.stack_name,
                status: stack.stack_status,
                last_updated,
                recent_event_count: recent.len(),
                failed_resources,
            });
        }

        changes.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        debug!("Found {} recently changed stacks", changes.len());
        Ok(changes)
    }
}
