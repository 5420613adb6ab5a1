//! Closed set of status probes and their dispatch table

use super::context::LookbackWindows;
use crate::classifier::{InfrastructureKind, ResourceLocator};
use crate::collectors::{
    ComputeStatus, ComputeTarget, DeploymentChange, LoadBalancerHealth, MetricsSnapshot,
    StatusClients, StatusResult,
};
use crate::events::LogLine;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Which field of the enriched context a probe fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeSource {
    RecentLogs,
    Compute,
    LoadBalancer,
    RecentChanges,
    Metrics,
    ResourceTags,
}

impl ProbeSource {
    pub fn name(&self) -> &'static str {
        match self {
            ProbeSource::RecentLogs => "recent_logs",
            ProbeSource::Compute => "compute",
            ProbeSource::LoadBalancer => "load_balancer",
            ProbeSource::RecentChanges => "recent_changes",
            ProbeSource::Metrics => "metrics",
            ProbeSource::ResourceTags => "resource_tags",
        }
    }
}

impl fmt::Display for ProbeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One status lookup, carrying exactly the parameters its collector needs
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    RecentLogs { log_group: String, log_stream: String },
    Compute(ComputeTarget),
    LoadBalancer { fragment: String },
    RecentChanges,
    Metrics { log_group: String, cluster_name: Option<String> },
    ResourceTags { resource_id: String, kind: InfrastructureKind },
}

impl Probe {
    pub fn source(&self) -> ProbeSource {
        match self {
            Probe::RecentLogs { .. } => ProbeSource::RecentLogs,
            Probe::Compute(_) => ProbeSource::Compute,
            Probe::LoadBalancer { .. } => ProbeSource::LoadBalancer,
            Probe::RecentChanges => ProbeSource::RecentChanges,
            Probe::Metrics { .. } => ProbeSource::Metrics,
            Probe::ResourceTags { .. } => ProbeSource::ResourceTags,
        }
    }
}

/// Result of one probe, tagged by the field it belongs to
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    RecentLogs(StatusResult<Vec<LogLine>>),
    Compute(StatusResult<ComputeStatus>),
    LoadBalancer(StatusResult<LoadBalancerHealth>),
    RecentChanges(StatusResult<Vec<DeploymentChange>>),
    Metrics(StatusResult<MetricsSnapshot>),
    ResourceTags(StatusResult<BTreeMap<String, String>>),
}

impl ProbeOutcome {
    /// Failed outcome for `source`, used when the probe itself never reported
    pub fn unavailable(source: ProbeSource, reason: &str) -> Self {
        let reason = reason.to_string();
        match source {
            ProbeSource::RecentLogs => ProbeOutcome::RecentLogs(StatusResult::Unavailable(reason)),
            ProbeSource::Compute => ProbeOutcome::Compute(StatusResult::Unavailable(reason)),
            ProbeSource::LoadBalancer => ProbeOutcome::LoadBalancer(StatusResult::Unavailable(reason)),
            ProbeSource::RecentChanges => ProbeOutcome::RecentChanges(StatusResult::Unavailable(reason)),
            ProbeSource::Metrics => ProbeOutcome::Metrics(StatusResult::Unavailable(reason)),
            ProbeSource::ResourceTags => ProbeOutcome::ResourceTags(StatusResult::Unavailable(reason)),
        }
    }

    pub fn source(&self) -> ProbeSource {
        match self {
            ProbeOutcome::RecentLogs(_) => ProbeSource::RecentLogs,
            ProbeOutcome::Compute(_) => ProbeSource::Compute,
            ProbeOutcome::LoadBalancer(_) => ProbeSource::LoadBalancer,
            ProbeOutcome::RecentChanges(_) => ProbeSource::RecentChanges,
            ProbeOutcome::Metrics(_) => ProbeSource::Metrics,
            ProbeOutcome::ResourceTags(_) => ProbeSource::ResourceTags,
        }
    }
}

fn compute_target(locator: &ResourceLocator) -> Option<ComputeTarget> {
    let resource_id = locator.compute_target()?.to_string();
    match locator.kind {
        InfrastructureKind::ContainerTask => Some(ComputeTarget::Task {
            task_id: resource_id,
            cluster_hint: locator.cluster_name.clone(),
        }),
        InfrastructureKind::VirtualMachine => Some(ComputeTarget::Instance {
            instance_id: resource_id,
        }),
        _ => None,
    }
}

/// Probes applicable to a located resource
///
/// Recent logs, changes and metrics are always attempted when their inputs
/// exist; compute, load balancer and tags depend on what was classified.
pub fn plan(locator: &ResourceLocator) -> Vec<Probe> {
    let mut probes = Vec::new();

    if !locator.log_group.is_empty() && !locator.log_stream.is_empty() {
        probes.push(Probe::RecentLogs {
            log_group: locator.log_group.clone(),
            log_stream: locator.log_stream.clone(),
        });
    }

    if let Some(target) = compute_target(locator) {
        probes.push(Probe::Compute(target));
    }

    if let Some(fragment) = &locator.load_balancer_name {
        probes.push(Probe::LoadBalancer {
            fragment: fragment.clone(),
        });
    }

    probes.push(Probe::RecentChanges);

    if !locator.log_group.is_empty() {
        probes.push(Probe::Metrics {
            log_group: locator.log_group.clone(),
            cluster_name: locator.cluster_name.clone(),
        });
    }

    if let Some(resource_id) = &locator.resource_id {
        if locator.kind != InfrastructureKind::Unknown {
            probes.push(Probe::ResourceTags {
                resource_id: resource_id.clone(),
                kind: locator.kind,
            });
        }
    }

    probes
}

/// Run one probe against its collector
pub async fn dispatch(probe: Probe, clients: &StatusClients, windows: &LookbackWindows) -> ProbeOutcome {
    match probe {
        Probe::RecentLogs {
            log_group,
            log_stream,
        } => ProbeOutcome::RecentLogs(
            clients
                .logs
                .fetch_recent(&log_group, &log_stream, windows.logs())
                .await,
        ),
        Probe::Compute(target) => ProbeOutcome::Compute(clients.compute.fetch(&target).await),
        Probe::LoadBalancer { fragment } => {
            ProbeOutcome::LoadBalancer(clients.load_balancer.fetch(&fragment).await)
        }
        Probe::RecentChanges => {
            ProbeOutcome::RecentChanges(clients.changes.fetch_recent(windows.changes()).await)
        }
        Probe::Metrics {
            log_group,
            cluster_name,
        } => ProbeOutcome::Metrics(
            clients
                .metrics
                .fetch(&log_group, cluster_name.as_deref(), windows.metrics())
                .await,
        ),
        Probe::ResourceTags { resource_id, kind } => {
            ProbeOutcome::ResourceTags(clients.tags.fetch(&resource_id, kind).await)
        }
    }
}
