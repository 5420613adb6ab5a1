use serde::{Deserialize, Serialize};
use std::fmt;

/// Infrastructure subsystem an alert was traced to
///
/// Serialized with the short labels downstream consumers already key on
/// (`ecs`, `lambda`, `ec2`, `kubernetes`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum InfrastructureKind {
    /// Nothing in the identifiers pointed at a known subsystem
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    /// Container-orchestration task (ECS)
    #[serde(rename = "ecs")]
    ContainerTask,
    /// Serverless function (Lambda)
    #[serde(rename = "lambda")]
    ServerlessFunction,
    /// Virtual machine instance (EC2)
    #[serde(rename = "ec2")]
    VirtualMachine,
    /// Kubernetes pod, detected from the message or stream name
    #[serde(rename = "kubernetes")]
    OrchestratedPod,
}

impl InfrastructureKind {
    /// Short label used in rendered context and outgoing summaries
    pub fn label(&self) -> &'static str {
        match self {
            InfrastructureKind::Unknown => "unknown",
            InfrastructureKind::ContainerTask => "ecs",
            InfrastructureKind::ServerlessFunction => "lambda",
            InfrastructureKind::VirtualMachine => "ec2",
            InfrastructureKind::OrchestratedPod => "kubernetes",
        }
    }

    /// Whether compute status can be fetched for this kind given a resource id
    pub fn has_compute_status(&self) -> bool {
        matches!(
            self,
            InfrastructureKind::ContainerTask | InfrastructureKind::VirtualMachine
        )
    }
}

impl fmt::Display for InfrastructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifier result: which resource an alert concerns
///
/// Built once per alert by [`crate::classifier::Classifier`] and never
/// modified afterwards. `kind` is exclusive; the Kubernetes attributes,
/// `container_id` and `load_balancer_name` come from the free-text message and
/// may accompany any kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResourceLocator {
    /// Log group the alert came from
    pub log_group: String,
    /// Log stream the alert came from (empty when unknown)
    pub log_stream: String,
    /// Detected subsystem
    pub kind: InfrastructureKind,
    /// Canonical identifier of the detected resource
    pub resource_id: Option<String>,
    /// ECS task id, when the stream carried one
    pub task_id: Option<String>,
    /// ECS cluster name taken from the log group path
    pub cluster_name: Option<String>,
    /// Kubernetes pod name
    pub pod_name: Option<String>,
    /// Kubernetes node name
    pub node_name: Option<String>,
    /// Kubernetes namespace
    pub namespace: Option<String>,
    /// Container id mentioned in the message
    pub container_id: Option<String>,
    /// Load balancer ARN fragment (`app/<name>/<hex>`)
    pub load_balancer_name: Option<String>,
}

impl ResourceLocator {
    /// Locator for an alert nothing could be inferred from
    pub fn unknown(log_group: &str, log_stream: &str) -> Self {
        Self {
            log_group: log_group.to_string(),
            log_stream: log_stream.to_string(),
            ..Self::default()
        }
    }

    /// The resource id paired with a kind that supports compute lookups
    pub fn compute_target(&self) -> Option<&str> {
        if self.kind.has_compute_status() {
            self.resource_id.as_deref()
        } else {
            None
        }
    }
}
