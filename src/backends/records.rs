//! Raw records returned by the external status backends
//!
//! Field names follow the PascalCase convention of the cloud APIs the gateway
//! forwards to. Collectors turn these into the normalized status types.

use crate::events::Timestamp;
use serde::{Deserialize, Serialize};

/// One entry of `DescribeInstanceStatus`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceStatusRecord {
    pub instance_id: String,
    pub instance_state: String,
    pub system_status: Option<String>,
    pub instance_status: Option<String>,
    #[serde(default)]
    pub events: Vec<InstanceEventRecord>,
}

/// Scheduled maintenance event attached to an instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceEventRecord {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub not_before: Option<Timestamp>,
}

/// One entry of `DescribeTasks`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct TaskRecord {
    pub task_arn: String,
    pub last_status: Option<String>,
    pub desired_status: Option<String>,
    pub health_status: Option<String>,
    #[serde(default)]
    pub containers: Vec<ContainerRecord>,
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

/// Container entry inside a task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerRecord {
    pub name: String,
    pub last_status: Option<String>,
    pub exit_code: Option<i32>,
    pub reason: Option<String>,
}

/// One entry of `DescribeLoadBalancers`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LoadBalancerRecord {
    pub load_balancer_arn: String,
    pub load_balancer_name: String,
    pub state: String,
}

/// One entry of `DescribeTargetGroups`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TargetGroupRecord {
    pub target_group_arn: String,
    pub target_group_name: String,
}

/// One entry of `DescribeTargetHealth`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TargetHealthRecord {
    pub target_id: String,
    pub port: Option<u16>,
    pub state: String,
    pub reason: Option<String>,
}

/// Parameters for `GetLogEvents`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LogEventsRequest {
    pub log_group_name: String,
    pub log_stream_name: String,
    /// Window start in epoch milliseconds
    pub start_time: i64,
    pub limit: u32,
    /// `false` reads from the newest end of the stream
    pub start_from_head: bool,
}

/// One entry of `GetLogEvents`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LogEventRecord {
    /// Epoch milliseconds
    pub timestamp: i64,
    pub message: String,
}

/// One entry of `ListStacks`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StackSummaryRecord {
    pub stack_name: String,
    pub stack_status: String,
    pub creation_time: Timestamp,
    pub last_updated_time: Option<Timestamp>,
}

impl StackSummaryRecord {
    /// Last update, falling back to creation for never-updated stacks
    pub fn last_changed(&self) -> Timestamp {
        self.last_updated_time.unwrap_or(self.creation_time)
    }
}

/// One entry of `DescribeStackEvents`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StackEventRecord {
    pub logical_resource_id: String,
    pub resource_status: String,
    pub resource_status_reason: Option<String>,
    pub timestamp: Timestamp,
}

/// Statistic requested for a metric series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Statistic {
    Sum,
    Average,
    Maximum,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Sum => "Sum",
            Statistic::Average => "Average",
            Statistic::Maximum => "Maximum",
        }
    }
}

/// Metric dimension filter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// Parameters for `GetMetricStatistics`
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub period_seconds: u32,
    pub statistic: Statistic,
}

/// One sample of a metric series, already reduced to the requested statistic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Datapoint {
    pub timestamp: Timestamp,
    pub value: f64,
}

/// One entry of `DescribeTags`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TagRecord {
    pub key: String,
    pub value: String,
}
