//! Status collectors, one per backing subsystem
//!
//! Each collector wraps exactly one backend port, normalizes its raw records,
//! bounds the call with a timeout and folds every failure into
//! [`StatusResult::Unavailable`]. No `StatusError` crosses this boundary.

/// Recent deployment/stack changes
pub mod change_collector;
/// Compute instance and container task status
pub mod compute_collector;
/// Load balancer target health
pub mod load_balancer_collector;
/// Recent log tail
pub mod log_collector;
/// Time-series metrics reduction
pub mod metrics_collector;
/// Resource tags
pub mod tag_collector;

pub use change_collector::{ChangeCollector, DeploymentChange, FailedResource};
pub use compute_collector::{
    ComputeCollector, ComputeStatus, ComputeTarget, ContainerState, InstanceHealth,
    MaintenanceEvent, TaskHealth,
};
pub use load_balancer_collector::{
    LoadBalancerCollector, LoadBalancerHealth, TargetGroupHealth, TargetState,
};
pub use log_collector::LogCollector;
pub use metrics_collector::{
    MetricPlan, MetricSummary, MetricUnit, MetricsCollector, MetricsSnapshot,
};
pub use tag_collector::TagCollector;

use crate::backends::Backends;
use crate::error::StatusError;
use log::warn;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

/// Outcome of one status collector call
///
/// `Unavailable` is an expected outcome (missing resource, permission denied,
/// timeout, nothing matched), not a defect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum StatusResult<T> {
    Available(T),
    Unavailable(String),
}

impl<T> StatusResult<T> {
    /// Convert a backend result, logging the failure against its subsystem
    pub fn from_backend(result: Result<T, StatusError>, subsystem: &str, target: &str) -> Self {
        match result {
            Ok(value) => StatusResult::Available(value),
            Err(e) => {
                warn!("Failed to fetch {} for '{}': {}", subsystem, target, e);
                StatusResult::Unavailable(e.to_string())
            }
        }
    }

    /// The payload, if the call succeeded
    pub fn available(&self) -> Option<&T> {
        match self {
            StatusResult::Available(value) => Some(value),
            StatusResult::Unavailable(_) => None,
        }
    }

    /// The failure reason, if the call did not succeed
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            StatusResult::Available(_) => None,
            StatusResult::Unavailable(reason) => Some(reason),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, StatusResult::Available(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StatusResult<U> {
        match self {
            StatusResult::Available(value) => StatusResult::Available(f(value)),
            StatusResult::Unavailable(reason) => StatusResult::Unavailable(reason),
        }
    }
}

/// Run a backend interaction under a timeout, mapping expiry to `StatusError::Timeout`
pub(crate) async fn bounded<T, F>(timeout: Duration, future: F) -> Result<T, StatusError>
where
    F: Future<Output = Result<T, StatusError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(StatusError::Timeout(timeout)),
    }
}

/// Tunables shared by the collectors
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorSettings {
    /// Upper bound for one collector call
    pub call_timeout: Duration,
    /// Maximum number of recent log lines returned
    pub log_line_limit: usize,
    /// Maximum characters kept per log message
    pub log_message_max_chars: usize,
    /// Sampling period for metric queries
    pub metric_period_seconds: u32,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            log_line_limit: 50,
            log_message_max_chars: 500,
            metric_period_seconds: 300,
        }
    }
}

/// One collector per backing subsystem, built once from the backend handles
pub struct StatusClients {
    pub compute: ComputeCollector,
    pub load_balancer: LoadBalancerCollector,
    pub logs: LogCollector,
    pub changes: ChangeCollector,
    pub metrics: MetricsCollector,
    pub tags: TagCollector,
}

impl StatusClients {
    pub fn new(backends: &Backends, settings: &CollectorSettings) -> Self {
        let timeout = settings.call_timeout;
        Self {
            compute: ComputeCollector::new(backends.compute.clone(), timeout),
            load_balancer: LoadBalancerCollector::new(backends.load_balancer.clone(), timeout),
            logs: LogCollector::new(
                backends.logs.clone(),
                timeout,
                settings.log_line_limit,
                settings.log_message_max_chars,
            ),
            changes: ChangeCollector::new(backends.deployments.clone(), timeout),
            metrics: MetricsCollector::new(
                backends.metrics.clone(),
                timeout,
                settings.metric_period_seconds,
            ),
            tags: TagCollector::new(backends.tags.clone(), timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_result_from_backend() {
        let ok: StatusResult<u32> = StatusResult::from_backend(Ok(7), "test", "x");
        assert_eq!(ok.available(), Some(&7));
        assert!(ok.is_available());

        let failed: StatusResult<u32> =
            StatusResult::from_backend(Err(StatusError::NotFound("x".to_string())), "test", "x");
        assert_eq!(failed.available(), None);
        assert_eq!(failed.unavailable_reason(), Some("Resource not found: x"));
    }

    #[test]
    fn test_status_result_map_preserves_reason() {
        let failed: StatusResult<u32> = StatusResult::Unavailable("timed out".to_string());
        assert_eq!(failed.map(|v| v * 2), StatusResult::Unavailable("timed out".to_string()));
        assert_eq!(StatusResult::Available(2).map(|v| v * 2), StatusResult::Available(4));
    }

    #[test]
    fn test_status_result_serialization() {
        let json = serde_json::to_string(&StatusResult::Available(1)).unwrap();
        assert_eq!(json, r#"{"status":"available","value":1}"#);
        let json = serde_json::to_string(&StatusResult::<u32>::Unavailable("nope".to_string())).unwrap();
        assert_eq!(json, r#"{"status":"unavailable","value":"nope"}"#);
    }

    #[tokio::test]
    async fn test_bounded_maps_expiry_to_timeout() {
        let result: Result<(), StatusError> = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StatusError::Timeout(d)) if d == Duration::from_millis(10)));

        let result = bounded(Duration::from_secs(1), async { Ok::<_, StatusError>(3) }).await;
        assert_eq!(result.unwrap(), 3);
    }
}
