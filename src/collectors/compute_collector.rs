use super::{bounded, StatusResult};
use crate::backends::{ComputeApi, InstanceStatusRecord, TaskRecord};
use crate::error::StatusError;
use crate::events::Timestamp;
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Health of a virtual machine instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceHealth {
    pub instance_id: String,
    pub instance_state: String,
    pub system_status: String,
    pub instance_status: String,
    /// Scheduled maintenance events
    pub events: Vec<MaintenanceEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceEvent {
    pub code: String,
    pub description: String,
    pub not_before: Option<Timestamp>,
}

/// Health of a container task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskHealth {
    pub task_id: String,
    /// Cluster the task was found in
    pub cluster: String,
    pub task_arn: String,
    pub last_status: String,
    pub desired_status: String,
    pub health_status: String,
    pub containers: Vec<ContainerState>,
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerState {
    pub name: String,
    pub last_status: String,
    pub exit_code: Option<i32>,
    pub reason: String,
}

/// Compute status for whichever kind of resource the alert points at
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComputeStatus {
    Instance(InstanceHealth),
    Task(TaskHealth),
}

/// What to look up
#[derive(Debug, Clone, PartialEq)]
pub enum ComputeTarget {
    Instance { instance_id: String },
    Task { task_id: String, cluster_hint: Option<String> },
}

const UNKNOWN: &str = "UNKNOWN";

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN.to_string())
}

/// Short cluster name from either a bare name or a cluster ARN
fn cluster_short_name(cluster: &str) -> &str {
    cluster.rsplit('/').next().unwrap_or(cluster)
}

impl From<InstanceStatusRecord> for InstanceHealth {
    fn from(record: InstanceStatusRecord) -> Self {
        Self {
            instance_id: record.instance_id,
            instance_state: record.instance_state,
            system_status: or_unknown(record.system_status),
            instance_status: or_unknown(record.instance_status),
            events: record
                .events
                .into_iter()
                .map(|event| MaintenanceEvent {
                    code: event.code,
                    description: event.description,
                    not_before: event.not_before,
                })
                .collect(),
        }
    }
}

impl TaskHealth {
    fn from_record(task_id: &str, cluster: &str, record: TaskRecord) -> Self {
        Self {
            task_id: task_id.to_string(),
            cluster: cluster.to_string(),
            task_arn: record.task_arn,
            last_status: or_unknown(record.last_status),
            desired_status: or_unknown(record.desired_status),
            health_status: or_unknown(record.health_status),
            containers: record
                .containers
                .into_iter()
                .map(|container| ContainerState {
                    name: container.name,
                    last_status: or_unknown(container.last_status),
                    exit_code: container.exit_code,
                    reason: container.reason.unwrap_or_default(),
                })
                .collect(),
            cpu: record.cpu,
            memory: record.memory,
        }
    }
}

/// Looks up instance and task health through the compute API
pub struct ComputeCollector {
    api: Arc<dyn ComputeApi>,
    timeout: Duration,
}

impl ComputeCollector {
    pub fn new(api: Arc<dyn ComputeApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    pub async fn fetch(&self, target: &ComputeTarget) -> StatusResult<ComputeStatus> {
        match target {
            ComputeTarget::Instance { instance_id } => self
                .fetch_instance(instance_id)
                .await
                .map(ComputeStatus::Instance),
            ComputeTarget::Task {
                task_id,
                cluster_hint,
            } => self
                .fetch_task(task_id, cluster_hint.as_deref())
                .await
                .map(ComputeStatus::Task),
        }
    }

    /// Instance state, status checks and scheduled events
    pub async fn fetch_instance(&self, instance_id: &str) -> StatusResult<InstanceHealth> {
        let result = bounded(self.timeout, async {
            let records = self.api.describe_instance_status(instance_id).await?;
            records
                .into_iter()
                .next()
                .map(InstanceHealth::from)
                .ok_or_else(|| StatusError::NotFound(format!("instance {}", instance_id)))
        })
        .await;
        StatusResult::from_backend(result, "instance status", instance_id)
    }

    /// Task status, probing the hinted cluster first and then every known cluster
    pub async fn fetch_task(&self, task_id: &str, cluster_hint: Option<&str>) -> StatusResult<TaskHealth> {
        let result = bounded(self.timeout, self.find_task(task_id, cluster_hint)).await;
        StatusResult::from_backend(result, "task status", task_id)
    }

    async fn find_task(&self, task_id: &str, cluster_hint: Option<&str>) -> Result<TaskHealth, StatusError> {
        if let Some(cluster) = cluster_hint {
            if let Some(task) = self.probe_cluster(cluster, task_id).await {
                return Ok(task);
            }
        }

        let clusters = self.api.list_clusters().await?;
        for cluster in &clusters {
            let already_probed = cluster_hint.is_some_and(|hint| {
                cluster == hint || cluster_short_name(cluster) == cluster_short_name(hint)
            });
            if already_probed {
                continue;
            }
            if let Some(task) = self.probe_cluster(cluster, task_id).await {
                return Ok(task);
            }
        }

        Err(StatusError::NotFound(format!(
            "task {} in any of {} clusters",
            task_id,
            clusters.len()
        )))
    }

    /// One cluster lookup; failures only skip this cluster
    async fn probe_cluster(&self, cluster: &str, task_id: &str) -> Option<TaskHealth> {
        match self.api.describe_tasks(cluster, task_id).await {
            Ok(tasks) => {
                let task = tasks.into_iter().next()?;
                debug!("Found task {} in cluster {}", task_id, cluster);
                Some(TaskHealth::from_record(task_id, cluster, task))
            }
            Err(e) => {
                warn!("Task lookup in cluster {} failed: {}", cluster, e);
                None
            }
        }
    }
}
