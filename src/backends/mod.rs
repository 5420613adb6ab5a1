//! External status backend ports
//!
//! One trait per backing subsystem. Each method is a single read-only call to
//! the external system and returns its raw records or a [`StatusError`]; no
//! normalization or failure absorption happens at this layer.

/// In-memory backend for tests and offline runs
pub mod fake;
/// HTTP/JSON gateway implementation of every port
pub mod http;
/// Raw records returned by the backends
pub mod records;

pub use fake::FakeBackend;
pub use http::HttpGateway;
pub use records::*;

use crate::error::StatusError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by every backend call
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StatusError>> + Send + 'a>>;

/// Compute inventory: virtual machine instances and container tasks
pub trait ComputeApi: Send + Sync {
    /// Status of one instance; empty when the instance does not exist
    fn describe_instance_status<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> BackendFuture<'a, Vec<InstanceStatusRecord>>;

    /// Every container cluster visible to the caller
    fn list_clusters(&self) -> BackendFuture<'_, Vec<String>>;

    /// Tasks in `cluster` matching `task_id`; empty when not in that cluster
    fn describe_tasks<'a>(&'a self, cluster: &'a str, task_id: &'a str) -> BackendFuture<'a, Vec<TaskRecord>>;
}

/// Application load balancers and their target groups
pub trait LoadBalancerApi: Send + Sync {
    fn describe_load_balancers<'a>(&'a self, name: &'a str) -> BackendFuture<'a, Vec<LoadBalancerRecord>>;

    fn describe_target_groups<'a>(
        &'a self,
        load_balancer_arn: &'a str,
    ) -> BackendFuture<'a, Vec<TargetGroupRecord>>;

    fn describe_target_health<'a>(
        &'a self,
        target_group_arn: &'a str,
    ) -> BackendFuture<'a, Vec<TargetHealthRecord>>;
}

/// Log storage
pub trait LogsApi: Send + Sync {
    fn get_log_events<'a>(&'a self, request: &'a LogEventsRequest) -> BackendFuture<'a, Vec<LogEventRecord>>;
}

/// Infrastructure deployment stacks
pub trait DeploymentApi: Send + Sync {
    fn list_stacks<'a>(&'a self, status_filter: &'a [&'a str]) -> BackendFuture<'a, Vec<StackSummaryRecord>>;

    fn describe_stack_events<'a>(&'a self, stack_name: &'a str) -> BackendFuture<'a, Vec<StackEventRecord>>;
}

/// Time-series metrics
pub trait MetricsApi: Send + Sync {
    fn get_metric_statistics<'a>(&'a self, query: &'a MetricQuery) -> BackendFuture<'a, Vec<Datapoint>>;
}

/// Resource tagging
pub trait TagsApi: Send + Sync {
    fn describe_tags<'a>(&'a self, resource_id: &'a str) -> BackendFuture<'a, Vec<TagRecord>>;
}

/// Long-lived backend handles, constructed once at process start
#[derive(Clone)]
pub struct Backends {
    pub compute: Arc<dyn ComputeApi>,
    pub load_balancer: Arc<dyn LoadBalancerApi>,
    pub logs: Arc<dyn LogsApi>,
    pub deployments: Arc<dyn DeploymentApi>,
    pub metrics: Arc<dyn MetricsApi>,
    pub tags: Arc<dyn TagsApi>,
}

impl Backends {
    /// Use one implementation for every port
    pub fn from_shared<B>(backend: Arc<B>) -> Self
    where
        B: ComputeApi + LoadBalancerApi + LogsApi + DeploymentApi + MetricsApi + TagsApi + 'static,
    {
        Self {
            compute: backend.clone(),
            load_balancer: backend.clone(),
            logs: backend.clone(),
            deployments: backend.clone(),
            metrics: backend.clone(),
            tags: backend,
        }
    }
}
