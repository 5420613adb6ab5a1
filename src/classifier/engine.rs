use crate::classifier::locator::{InfrastructureKind, ResourceLocator};
use crate::classifier::rules::{
    ContainerIdRule, Ec2InstanceRule, EcsTaskRule, Finding, Identifiers, KubernetesPodRule,
    LambdaFunctionRule, LoadBalancerRule, PodAttributes, Placement,
};
use log::debug;
use std::sync::LazyLock;

/// Trait for rules that recognize infrastructure signals in alert identifiers
pub trait ClassificationRule: Send + Sync {
    /// Human-readable name for this rule
    fn name(&self) -> &str;

    /// Inspect the identifiers and report what, if anything, was recognized
    fn evaluate(&self, ids: &Identifiers<'_>) -> Option<Finding>;
}

/// Ordered list of classification rules
///
/// Rules are evaluated independently and in order. Composition follows a fixed
/// precedence: the first placement wins, a Kubernetes signal then overrides
/// the placement kind, and message-level fields are attached regardless of
/// kind. Kubernetes running on top of ECS legitimately carries both signals
/// and the pod is the more specific one.
pub struct Classifier {
    rules: Vec<Box<dyn ClassificationRule>>,
}

static DEFAULT_CLASSIFIER: LazyLock<Classifier> = LazyLock::new(Classifier::with_default_rules);

/// Classify an alert with the built-in rule set
///
/// Pure and total: unmatched input yields an `unknown` locator.
pub fn classify(log_group: &str, log_stream: &str, message: &str) -> ResourceLocator {
    DEFAULT_CLASSIFIER.classify(log_group, log_stream, message)
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl Classifier {
    /// Create a classifier with no rules
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a classifier with the built-in rules in their required order
    pub fn with_default_rules() -> Self {
        let mut classifier = Self::new();
        classifier.add_rule(Box::new(EcsTaskRule));
        classifier.add_rule(Box::new(LambdaFunctionRule));
        classifier.add_rule(Box::new(Ec2InstanceRule));
        classifier.add_rule(Box::new(KubernetesPodRule));
        classifier.add_rule(Box::new(ContainerIdRule));
        classifier.add_rule(Box::new(LoadBalancerRule));
        classifier
    }

    /// Append a rule; rules run in insertion order
    pub fn add_rule(&mut self, rule: Box<dyn ClassificationRule>) {
        self.rules.push(rule);
    }

    /// Get the number of configured rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Infer the resource an alert concerns from its identifiers
    pub fn classify(&self, log_group: &str, log_stream: &str, message: &str) -> ResourceLocator {
        let ids = Identifiers {
            log_group,
            log_stream,
            message,
        };

        let findings = self.rules.iter().filter_map(|rule| {
            let finding = rule.evaluate(&ids);
            if let Some(ref finding) = finding {
                debug!("Rule '{}' matched: {:?}", rule.name(), finding);
            }
            finding
        });

        compose(ResourceLocator::unknown(log_group, log_stream), findings)
    }
}

/// Fold rule findings into a locator, applying placement/pod precedence
fn compose(base: ResourceLocator, findings: impl Iterator<Item = Finding>) -> ResourceLocator {
    let mut placement: Option<Placement> = None;
    let mut pod: Option<PodAttributes> = None;
    let mut container_id = None;
    let mut load_balancer_name = None;

    for finding in findings {
        match finding {
            Finding::Placement(found) => {
                placement.get_or_insert(found);
            }
            Finding::Pod(found) => {
                pod.get_or_insert(found);
            }
            Finding::ContainerId(id) => {
                container_id.get_or_insert(id);
            }
            Finding::LoadBalancer(name) => {
                load_balancer_name.get_or_insert(name);
            }
        }
    }

    let mut locator = ResourceLocator {
        container_id,
        load_balancer_name,
        ..base
    };

    match placement {
        Some(Placement::ContainerTask {
            cluster_name,
            task_id,
        }) => {
            locator.kind = InfrastructureKind::ContainerTask;
            locator.cluster_name = cluster_name;
            locator.resource_id = task_id.clone();
            locator.task_id = task_id;
        }
        Some(Placement::ServerlessFunction { function_name }) => {
            locator.kind = InfrastructureKind::ServerlessFunction;
            locator.resource_id = function_name;
        }
        Some(Placement::VirtualMachine { instance_id }) => {
            locator.kind = InfrastructureKind::VirtualMachine;
            locator.resource_id = instance_id;
        }
        None => {}
    }

    // A pod signal is more specific than any path-based placement
    if let Some(attributes) = pod {
        locator.kind = InfrastructureKind::OrchestratedPod;
        locator.pod_name = attributes.pod_name;
        locator.node_name = attributes.node_name;
        locator.namespace = attributes.namespace;
    }

    locator
}
