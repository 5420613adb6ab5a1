use super::context::{EnrichedContext, LookbackWindows};
use super::probes::{dispatch, plan, ProbeOutcome, ProbeSource};
use crate::classifier::Classifier;
use crate::collectors::StatusClients;
use crate::events::Alert;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Reason recorded for a probe whose task failed unexpectedly
pub const AGGREGATION_ERROR: &str = "aggregation error";
/// Reason recorded for a probe still running at the gather deadline
pub const DEADLINE_EXCEEDED: &str = "gather deadline exceeded";

/// Bounds for one gather
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatherSettings {
    /// Overall bound; probes still running when it passes are abandoned
    pub deadline: Duration,
    pub windows: LookbackWindows,
}

impl Default for GatherSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(20),
            windows: LookbackWindows::default(),
        }
    }
}

/// Probes still running; aborted when dropped
struct InFlight(Vec<(ProbeSource, JoinHandle<ProbeOutcome>)>);

impl Drop for InFlight {
    fn drop(&mut self) {
        for (_, handle) in &self.0 {
            handle.abort();
        }
    }
}

/// Fans an alert out to the applicable status collectors
///
/// Every probe runs as its own task, so a slow or panicking collector
/// cannot hold up or take down the others. `gather` always returns a
/// context; failures are recorded per source.
pub struct ContextAggregator {
    clients: Arc<StatusClients>,
    classifier: Classifier,
    settings: GatherSettings,
}

impl ContextAggregator {
    pub fn new(clients: StatusClients, classifier: Classifier, settings: GatherSettings) -> Self {
        Self {
            clients: Arc::new(clients),
            classifier,
            settings,
        }
    }

    pub fn settings(&self) -> &GatherSettings {
        &self.settings
    }

    /// Classify the alert and collect everything known about its resource
    pub async fn gather(&self, alert: &Alert) -> EnrichedContext {
        let started = Instant::now();
        let locator = self
            .classifier
            .classify(&alert.log_group, alert.stream(), &alert.message);
        let probes = plan(&locator);
        debug!(
            "Gathering context for {} resource {:?}: {:?}",
            locator.kind,
            locator.resource_id,
            probes.iter().map(|p| p.source()).collect::<Vec<_>>()
        );

        let mut context = EnrichedContext::new(locator, self.settings.windows);
        let deadline = tokio::time::Instant::now() + self.settings.deadline;

        let mut in_flight = InFlight(Vec::with_capacity(probes.len()));
        for probe in probes {
            let source = probe.source();
            let clients = Arc::clone(&self.clients);
            let windows = self.settings.windows;
            let handle = tokio::spawn(async move { dispatch(probe, &clients, &windows).await });
            in_flight.0.push((source, handle));
        }

        for (source, handle) in in_flight.0.iter_mut() {
            let outcome = match tokio::time::timeout_at(deadline, &mut *handle).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    error!("Probe {} failed unexpectedly: {}", source, e);
                    ProbeOutcome::unavailable(*source, AGGREGATION_ERROR)
                }
                Err(_) => {
                    handle.abort();
                    warn!(
                        "Probe {} still running after {:?}, abandoning it",
                        source, self.settings.deadline
                    );
                    ProbeOutcome::unavailable(*source, DEADLINE_EXCEEDED)
                }
            };
            context.record(outcome);
        }

        let dispatched = context.dispatched_sources().len();
        let unavailable = context.unavailable_sources();
        info!(
            "Gathered {}/{} sources for {} in {:?}{}",
            dispatched - unavailable.len(),
            dispatched,
            context.locator().log_group,
            started.elapsed(),
            if unavailable.is_empty() {
                String::new()
            } else {
                format!(
                    " (unavailable: {})",
                    unavailable
                        .iter()
                        .map(|(source, _)| source.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        );

        context
    }
}
