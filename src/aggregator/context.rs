use super::probes::{ProbeOutcome, ProbeSource};
use crate::classifier::ResourceLocator;
use crate::collectors::{
    ComputeStatus, DeploymentChange, LoadBalancerHealth, MetricsSnapshot, StatusResult,
};
use crate::events::LogLine;
use serde::Serialize;
use std::collections::BTreeMap;

/// Trailing windows used by the time-based probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LookbackWindows {
    pub log_minutes: i64,
    pub change_hours: i64,
    pub metric_minutes: i64,
}

impl Default for LookbackWindows {
    fn default() -> Self {
        Self {
            log_minutes: 10,
            change_hours: 24,
            metric_minutes: 30,
        }
    }
}

impl LookbackWindows {
    pub fn logs(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.log_minutes)
    }

    pub fn changes(&self) -> chrono::Duration {
        chrono::Duration::hours(self.change_hours)
    }

    pub fn metrics(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.metric_minutes)
    }
}

/// Everything gathered about one alert
///
/// Each source is `None` when it was not dispatched and `Some(Unavailable)`
/// when it was dispatched but failed. The accessors collapse both cases into
/// `None`. Built once by the aggregator; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedContext {
    locator: ResourceLocator,
    windows: LookbackWindows,
    recent_logs: Option<StatusResult<Vec<LogLine>>>,
    compute: Option<StatusResult<ComputeStatus>>,
    load_balancer: Option<StatusResult<LoadBalancerHealth>>,
    recent_changes: Option<StatusResult<Vec<DeploymentChange>>>,
    metrics: Option<StatusResult<MetricsSnapshot>>,
    resource_tags: Option<StatusResult<BTreeMap<String, String>>>,
}

impl EnrichedContext {
    /// Context with only the locator filled in
    pub fn new(locator: ResourceLocator, windows: LookbackWindows) -> Self {
        Self {
            locator,
            windows,
            recent_logs: None,
            compute: None,
            load_balancer: None,
            recent_changes: None,
            metrics: None,
            resource_tags: None,
        }
    }

    /// Attach a probe outcome to its field
    pub(crate) fn record(&mut self, outcome: ProbeOutcome) {
        match outcome {
            ProbeOutcome::RecentLogs(result) => self.recent_logs = Some(result),
            ProbeOutcome::Compute(result) => self.compute = Some(result),
            ProbeOutcome::LoadBalancer(result) => self.load_balancer = Some(result),
            ProbeOutcome::RecentChanges(result) => self.recent_changes = Some(result),
            ProbeOutcome::Metrics(result) => self.metrics = Some(result),
            ProbeOutcome::ResourceTags(result) => self.resource_tags = Some(result),
        }
    }

    /// Builder form of [`record`](Self::record)
    pub fn with_outcome(mut self, outcome: ProbeOutcome) -> Self {
        self.record(outcome);
        self
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn windows(&self) -> &LookbackWindows {
        &self.windows
    }

    pub fn recent_logs(&self) -> Option<&Vec<LogLine>> {
        self.recent_logs.as_ref()?.available().filter(|v| !v.is_empty())
    }

    pub fn compute(&self) -> Option<&ComputeStatus> {
        self.compute.as_ref()?.available()
    }

    pub fn load_balancer(&self) -> Option<&LoadBalancerHealth> {
        self.load_balancer.as_ref()?.available()
    }

    pub fn recent_changes(&self) -> Option<&Vec<DeploymentChange>> {
        self.recent_changes.as_ref()?.available().filter(|v| !v.is_empty())
    }

    pub fn metrics(&self) -> Option<&MetricsSnapshot> {
        self.metrics.as_ref()?.available().filter(|m| !m.is_empty())
    }

    pub fn resource_tags(&self) -> Option<&BTreeMap<String, String>> {
        self.resource_tags.as_ref()?.available().filter(|v| !v.is_empty())
    }

    /// Raw outcome for a source, distinguishing "not dispatched" from "failed"
    pub fn outcome_reason(&self, source: ProbeSource) -> Option<Option<&str>> {
        match source {
            ProbeSource::RecentLogs => self.recent_logs.as_ref().map(StatusResult::unavailable_reason),
            ProbeSource::Compute => self.compute.as_ref().map(StatusResult::unavailable_reason),
            ProbeSource::LoadBalancer => self.load_balancer.as_ref().map(StatusResult::unavailable_reason),
            ProbeSource::RecentChanges => self.recent_changes.as_ref().map(StatusResult::unavailable_reason),
            ProbeSource::Metrics => self.metrics.as_ref().map(StatusResult::unavailable_reason),
            ProbeSource::ResourceTags => self.resource_tags.as_ref().map(StatusResult::unavailable_reason),
        }
    }

    /// Sources that were dispatched and failed, with their reasons
    pub fn unavailable_sources(&self) -> Vec<(ProbeSource, &str)> {
        ALL_SOURCES
            .iter()
            .filter_map(|source| match self.outcome_reason(*source) {
                Some(Some(reason)) => Some((*source, reason)),
                _ => None,
            })
            .collect()
    }

    /// Sources that were dispatched, failed or not
    pub fn dispatched_sources(&self) -> Vec<ProbeSource> {
        ALL_SOURCES
            .iter()
            .copied()
            .filter(|source| self.outcome_reason(*source).is_some())
            .collect()
    }

    /// True when at least one dispatched source failed
    pub fn is_degraded(&self) -> bool {
        !self.unavailable_sources().is_empty()
    }
}

const ALL_SOURCES: [ProbeSource; 6] = [
    ProbeSource::RecentLogs,
    ProbeSource::Compute,
    ProbeSource::LoadBalancer,
    ProbeSource::RecentChanges,
    ProbeSource::Metrics,
    ProbeSource::ResourceTags,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> EnrichedContext {
        EnrichedContext::new(
            ResourceLocator::unknown("/app/web", "web-1"),
            LookbackWindows::default(),
        )
    }

    #[test]
    fn test_absent_and_failed_both_read_as_none() {
        let context = context().with_outcome(ProbeOutcome::unavailable(
            ProbeSource::Metrics,
            "Timed out after 5s",
        ));
        assert!(context.metrics().is_none());
        assert!(context.compute().is_none());
        assert_eq!(context.outcome_reason(ProbeSource::Metrics), Some(Some("Timed out after 5s")));
        assert_eq!(context.outcome_reason(ProbeSource::Compute), None);
    }

    #[test]
    fn test_empty_collections_read_as_absent() {
        let context = context()
            .with_outcome(ProbeOutcome::RecentChanges(StatusResult::Available(vec![])))
            .with_outcome(ProbeOutcome::ResourceTags(StatusResult::Available(BTreeMap::new())));
        assert!(context.recent_changes().is_none());
        assert!(context.resource_tags().is_none());
        assert!(!context.is_degraded());
    }

    #[test]
    fn test_degraded_marker() {
        let context = context().with_outcome(ProbeOutcome::RecentChanges(StatusResult::Available(vec![])));
        assert!(!context.is_degraded());
        assert_eq!(context.dispatched_sources(), vec![ProbeSource::RecentChanges]);

        let context = context
            .with_outcome(ProbeOutcome::unavailable(ProbeSource::RecentLogs, "Resource not found: s"));
        assert!(context.is_degraded());
        assert_eq!(
            context.unavailable_sources(),
            vec![(ProbeSource::RecentLogs, "Resource not found: s")]
        );
    }

    #[test]
    fn test_windows_as_durations() {
        let windows = LookbackWindows::default();
        assert_eq!(windows.logs(), chrono::Duration::minutes(10));
        assert_eq!(windows.changes(), chrono::Duration::hours(24));
        assert_eq!(windows.metrics(), chrono::Duration::minutes(30));
    }
}
