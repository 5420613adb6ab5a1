//! Built-in classification rules
//!
//! Each rule looks at the alert identifiers independently and reports at most
//! one [`Finding`]. Rules never see each other's output; precedence between
//! findings is decided by the classifier when it composes the locator.

use crate::classifier::ClassificationRule;
use regex::Regex;
use std::sync::LazyLock;

static ECS_CLUSTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/ecs/([^/]+)").expect("valid ECS cluster pattern"));
static ECS_TASK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-f0-9]{32})").expect("valid ECS task pattern"));
static LAMBDA_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/aws/lambda/([^/]+)").expect("valid Lambda pattern"));
static EC2_INSTANCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(i-[a-f0-9]{8,17})").expect("valid EC2 instance pattern"));
static POD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pod[_-]?name[:\s]+([a-z0-9-]+)").expect("valid pod pattern"));
static NODE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)node[_-]?name[:\s]+([a-z0-9.-]+)").expect("valid node pattern")
});
static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)namespace(?:[_-]?name)?[:\s]+([a-z0-9-]+)").expect("valid namespace pattern")
});
static CONTAINER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)container[_\s-]?id[:\s]+([a-f0-9]{12,64})").expect("valid container pattern")
});
static LOAD_BALANCER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(app/[a-zA-Z0-9-]+/[a-f0-9]{16})").expect("valid load balancer pattern")
});

/// The three weakly-structured strings a locator is inferred from
#[derive(Debug, Clone, Copy)]
pub struct Identifiers<'a> {
    pub log_group: &'a str,
    pub log_stream: &'a str,
    pub message: &'a str,
}

/// Something a rule recognized in the identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// Path-based placement of the resource; only the first is kept
    Placement(Placement),
    /// Kubernetes signal; takes precedence over any placement kind
    Pod(PodAttributes),
    /// Container id labeled in the message
    ContainerId(String),
    /// Load balancer ARN fragment found in the message
    LoadBalancer(String),
}

/// Mutually exclusive, path-derived resource placements
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    ContainerTask {
        cluster_name: Option<String>,
        task_id: Option<String>,
    },
    ServerlessFunction {
        function_name: Option<String>,
    },
    VirtualMachine {
        instance_id: Option<String>,
    },
}

/// Kubernetes attributes extracted from the message, each independently optional
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PodAttributes {
    pub pod_name: Option<String>,
    pub node_name: Option<String>,
    pub namespace: Option<String>,
}

fn capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Detects ECS tasks from `/ecs/` in the group or stream
///
/// The cluster is the path segment following `/ecs/` in the group and the
/// task id is the first 32-hex-character token in the stream.
pub struct EcsTaskRule;

impl ClassificationRule for EcsTaskRule {
    fn name(&self) -> &str {
        "EcsTaskRule"
    }

    fn evaluate(&self, ids: &Identifiers<'_>) -> Option<Finding> {
        if !ids.log_group.contains("/ecs/") && !ids.log_stream.contains("/ecs/") {
            return None;
        }
        Some(Finding::Placement(Placement::ContainerTask {
            cluster_name: capture(&ECS_CLUSTER, ids.log_group),
            task_id: capture(&ECS_TASK_ID, ids.log_stream),
        }))
    }
}

/// Detects Lambda functions from `/lambda/` in the group
pub struct LambdaFunctionRule;

impl ClassificationRule for LambdaFunctionRule {
    fn name(&self) -> &str {
        "LambdaFunctionRule"
    }

    fn evaluate(&self, ids: &Identifiers<'_>) -> Option<Finding> {
        if !ids.log_group.contains("/lambda/") {
            return None;
        }
        Some(Finding::Placement(Placement::ServerlessFunction {
            function_name: capture(&LAMBDA_FUNCTION, ids.log_group),
        }))
    }
}

/// Detects EC2 instances from `ec2` anywhere in the group (case-insensitive)
pub struct Ec2InstanceRule;

impl ClassificationRule for Ec2InstanceRule {
    fn name(&self) -> &str {
        "Ec2InstanceRule"
    }

    fn evaluate(&self, ids: &Identifiers<'_>) -> Option<Finding> {
        if !ids.log_group.to_lowercase().contains("ec2") {
            return None;
        }
        Some(Finding::Placement(Placement::VirtualMachine {
            instance_id: capture(&EC2_INSTANCE_ID, ids.log_stream),
        }))
    }
}

/// Detects Kubernetes workloads shipped through Fluent Bit
///
/// Fires when the message mentions "kubernetes" or the stream mentions "pod",
/// then pulls `pod_name`, `node_name` and `namespace` out of labeled tokens.
pub struct KubernetesPodRule;

impl ClassificationRule for KubernetesPodRule {
    fn name(&self) -> &str {
        "KubernetesPodRule"
    }

    fn evaluate(&self, ids: &Identifiers<'_>) -> Option<Finding> {
        let signalled = ids.message.to_lowercase().contains("kubernetes")
            || ids.log_stream.to_lowercase().contains("pod");
        if !signalled {
            return None;
        }
        Some(Finding::Pod(PodAttributes {
            pod_name: capture(&POD_NAME, ids.message),
            node_name: capture(&NODE_NAME, ids.message),
            namespace: capture(&NAMESPACE, ids.message),
        }))
    }
}

/// Extracts a labeled container id (12 to 64 hex characters) from the message
pub struct ContainerIdRule;

impl ClassificationRule for ContainerIdRule {
    fn name(&self) -> &str {
        "ContainerIdRule"
    }

    fn evaluate(&self, ids: &Identifiers<'_>) -> Option<Finding> {
        capture(&CONTAINER_ID, ids.message).map(Finding::ContainerId)
    }
}

/// Extracts an ALB ARN fragment `app/<name>/<16 hex>` from the message
pub struct LoadBalancerRule;

impl ClassificationRule for LoadBalancerRule {
    fn name(&self) -> &str {
        "LoadBalancerRule"
    }

    fn evaluate(&self, ids: &Identifiers<'_>) -> Option<Finding> {
        capture(&LOAD_BALANCER, ids.message).map(Finding::LoadBalancer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<'a>(log_group: &'a str, log_stream: &'a str, message: &'a str) -> Identifiers<'a> {
        Identifiers {
            log_group,
            log_stream,
            message,
        }
    }

    #[test]
    fn test_ecs_rule_extracts_cluster_and_task() {
        let finding = EcsTaskRule.evaluate(&ids(
            "/ecs/my-cluster/service",
            "web/app/0123456789abcdef0123456789abcdef",
            "",
        ));
        assert_eq!(
            finding,
            Some(Finding::Placement(Placement::ContainerTask {
                cluster_name: Some("my-cluster".to_string()),
                task_id: Some("0123456789abcdef0123456789abcdef".to_string()),
            }))
        );
    }

    #[test]
    fn test_ecs_rule_matches_on_stream_only() {
        let finding = EcsTaskRule.evaluate(&ids("/app/logs", "prefix/ecs/worker", ""));
        assert_eq!(
            finding,
            Some(Finding::Placement(Placement::ContainerTask {
                cluster_name: None,
                task_id: None,
            }))
        );
    }

    #[test]
    fn test_ecs_rule_ignores_other_groups() {
        assert_eq!(EcsTaskRule.evaluate(&ids("/aws/lambda/f", "s", "")), None);
    }

    #[test]
    fn test_lambda_rule_extracts_function_name() {
        let finding = LambdaFunctionRule.evaluate(&ids("/aws/lambda/my-func", "2024/01/01/[$LATEST]abc", ""));
        assert_eq!(
            finding,
            Some(Finding::Placement(Placement::ServerlessFunction {
                function_name: Some("my-func".to_string()),
            }))
        );
    }

    #[test]
    fn test_lambda_rule_without_standard_prefix_has_no_name() {
        let finding = LambdaFunctionRule.evaluate(&ids("/custom/lambda/thing", "", ""));
        assert_eq!(
            finding,
            Some(Finding::Placement(Placement::ServerlessFunction {
                function_name: None
            }))
        );
    }

    #[test]
    fn test_ec2_rule_is_case_insensitive_on_group() {
        let finding = Ec2InstanceRule.evaluate(&ids("/prod/EC2/syslog", "i-0abc1234def567890", ""));
        assert_eq!(
            finding,
            Some(Finding::Placement(Placement::VirtualMachine {
                instance_id: Some("i-0abc1234def567890".to_string()),
            }))
        );
    }

    #[test]
    fn test_ec2_rule_rejects_short_instance_ids() {
        let finding = Ec2InstanceRule.evaluate(&ids("/ec2/app", "i-abc", ""));
        assert_eq!(
            finding,
            Some(Finding::Placement(Placement::VirtualMachine { instance_id: None }))
        );
    }

    #[test]
    fn test_kubernetes_rule_extracts_attributes() {
        let finding = KubernetesPodRule.evaluate(&ids(
            "/ecs/c/s",
            "s",
            "kubernetes pod_name: web-1 node_name: ip-10-0-1-5 namespace: payments",
        ));
        assert_eq!(
            finding,
            Some(Finding::Pod(PodAttributes {
                pod_name: Some("web-1".to_string()),
                node_name: Some("ip-10-0-1-5".to_string()),
                namespace: Some("payments".to_string()),
            }))
        );
    }

    #[test]
    fn test_kubernetes_rule_matches_labels_case_insensitively() {
        let finding = KubernetesPodRule.evaluate(&ids(
            "/k8s",
            "",
            "Kubernetes POD-NAME: Api-7f9 NodeName ip-10-0-2-9.ec2.internal namespace_name: kube-system",
        ));
        assert_eq!(
            finding,
            Some(Finding::Pod(PodAttributes {
                pod_name: Some("Api-7f9".to_string()),
                node_name: Some("ip-10-0-2-9.ec2.internal".to_string()),
                namespace: Some("kube-system".to_string()),
            }))
        );
    }

    #[test]
    fn test_kubernetes_rule_fires_on_stream_without_attributes() {
        let finding = KubernetesPodRule.evaluate(&ids("/app", "my-pod-stream", "plain failure"));
        assert_eq!(finding, Some(Finding::Pod(PodAttributes::default())));
    }

    #[test]
    fn test_kubernetes_rule_silent_without_signal() {
        assert_eq!(KubernetesPodRule.evaluate(&ids("/app", "stream", "disk full")), None);
    }

    #[test]
    fn test_container_id_rule() {
        let finding = ContainerIdRule.evaluate(&ids("", "", "crash container_id: 3f4e5d6c7b8a9f0e1d2c"));
        assert_eq!(finding, Some(Finding::ContainerId("3f4e5d6c7b8a9f0e1d2c".to_string())));

        let finding = ContainerIdRule.evaluate(&ids("", "", "Container ID 0123456789ab exited"));
        assert_eq!(finding, Some(Finding::ContainerId("0123456789ab".to_string())));

        // Fewer than 12 hex characters is not a container id
        assert_eq!(ContainerIdRule.evaluate(&ids("", "", "container_id: abc123")), None);
    }

    #[test]
    fn test_load_balancer_rule() {
        let finding = LoadBalancerRule.evaluate(&ids(
            "",
            "",
            "502 from arn:aws:elasticloadbalancing:us-east-1:123:loadbalancer/app/prod-alb/50dc6c495c0c9188",
        ));
        assert_eq!(
            finding,
            Some(Finding::LoadBalancer("app/prod-alb/50dc6c495c0c9188".to_string()))
        );

        assert_eq!(LoadBalancerRule.evaluate(&ids("", "", "app/prod-alb/xyz")), None);
    }
}
