use super::{bounded, StatusResult};
use crate::backends::{Datapoint, Dimension, MetricQuery, MetricsApi, Statistic};
use crate::error::StatusError;
use crate::events::Timestamp;
use chrono::Utc;
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    Percent,
    Count,
    Milliseconds,
}

/// One metric to query and the key it is reported under
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSpec {
    pub metric_name: &'static str,
    pub statistic: Statistic,
    pub key: &'static str,
    pub unit: MetricUnit,
}

const SERVERLESS_METRICS: [MetricSpec; 3] = [
    MetricSpec {
        metric_name: "Errors",
        statistic: Statistic::Sum,
        key: "errors",
        unit: MetricUnit::Count,
    },
    MetricSpec {
        metric_name: "Duration",
        statistic: Statistic::Average,
        key: "duration",
        unit: MetricUnit::Milliseconds,
    },
    MetricSpec {
        metric_name: "ConcurrentExecutions",
        statistic: Statistic::Maximum,
        key: "concurrency",
        unit: MetricUnit::Count,
    },
];

const CONTAINER_METRICS: [MetricSpec; 2] = [
    MetricSpec {
        metric_name: "CPUUtilization",
        statistic: Statistic::Average,
        key: "cpu",
        unit: MetricUnit::Percent,
    },
    MetricSpec {
        metric_name: "MemoryUtilization",
        statistic: Statistic::Average,
        key: "memory",
        unit: MetricUnit::Percent,
    },
];

/// Which metrics to query for a log group
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPlan {
    pub namespace: &'static str,
    pub dimensions: Vec<Dimension>,
    pub metrics: &'static [MetricSpec],
}

impl MetricPlan {
    /// Plan for a log group; `None` when no metric source is known for it
    pub fn for_log_group(log_group: &str, cluster_name: Option<&str>) -> Option<Self> {
        if log_group.contains("/lambda/") {
            let function_name = log_group.rsplit('/').next().unwrap_or(log_group);
            return Some(Self {
                namespace: "AWS/Lambda",
                dimensions: vec![Dimension {
                    name: "FunctionName".to_string(),
                    value: function_name.to_string(),
                }],
                metrics: &SERVERLESS_METRICS,
            });
        }
        if log_group.contains("/ecs/") {
            let dimensions = cluster_name
                .map(|cluster| {
                    vec![Dimension {
                        name: "ClusterName".to_string(),
                        value: cluster.to_string(),
                    }]
                })
                .unwrap_or_default();
            return Some(Self {
                namespace: "AWS/ECS",
                dimensions,
                metrics: &CONTAINER_METRICS,
            });
        }
        None
    }
}

/// One series reduced to a handful of numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub unit: MetricUnit,
    /// Most recent sample
    pub current: f64,
    pub average: f64,
    pub max: f64,
    pub sample_count: usize,
}

impl MetricSummary {
    /// Reduce a series; `None` for an empty series
    pub fn from_series(unit: MetricUnit, points: &[Datapoint]) -> Option<Self> {
        let latest = points.iter().max_by_key(|point| point.timestamp)?;
        let sum: f64 = points.iter().map(|point| point.value).sum();
        let max = points
            .iter()
            .map(|point| point.value)
            .fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            unit,
            current: latest.value,
            average: sum / points.len() as f64,
            max,
            sample_count: points.len(),
        })
    }
}

/// Metric summaries keyed by their report name
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub series: BTreeMap<String, MetricSummary>,
}

impl MetricsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&MetricSummary> {
        self.series.get(key)
    }
}

pub struct MetricsCollector {
    api: Arc<dyn MetricsApi>,
    timeout: Duration,
    period_seconds: u32,
}

impl MetricsCollector {
    pub fn new(api: Arc<dyn MetricsApi>, timeout: Duration, period_seconds: u32) -> Self {
        Self {
            api,
            timeout,
            period_seconds,
        }
    }

    pub async fn fetch(&self, log_group: &str, cluster_name: Option<&str>, window: chrono::Duration) -> StatusResult<MetricsSnapshot> {
        self.fetch_at(log_group, cluster_name, window, Utc::now())
            .await
    }

    /// Same as [`fetch`](Self::fetch) with an explicit "now"
    pub async fn fetch_at(
        &self,
        log_group: &str,
        cluster_name: Option<&str>,
        window: chrono::Duration,
        now: Timestamp,
    ) -> StatusResult<MetricsSnapshot> {
        let Some(plan) = MetricPlan::for_log_group(log_group, cluster_name) else {
            debug!("No metric source known for {}", log_group);
            return StatusResult::Available(MetricsSnapshot::default());
        };

        let result = bounded(self.timeout, self.query_plan(&plan, now - window, now)).await;
        StatusResult::from_backend(result, "metrics", log_group)
    }

    async fn query_plan(&self, plan: &MetricPlan, start: Timestamp, end: Timestamp) -> Result<MetricsSnapshot, StatusError> {
        let mut snapshot = MetricsSnapshot::default();
        let mut failures = 0;
        let mut last_error = None;

        for spec in plan.metrics {
            let query = MetricQuery {
                namespace: plan.namespace.to_string(),
                metric_name: spec.metric_name.to_string(),
                dimensions: plan.dimensions.clone(),
                start_time: start,
                end_time: end,
                period_seconds: self.period_seconds,
                statistic: spec.statistic,
            };
            match self.api.get_metric_statistics(&query).await {
                Ok(points) => {
                    if let Some(summary) = MetricSummary::from_series(spec.unit, &points) {
                        snapshot.series.insert(spec.key.to_string(), summary);
                    }
                }
                Err(e) => {
                    warn!("Metric {}/{} unavailable: {}", plan.namespace, spec.metric_name, e);
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if failures == plan.metrics.len() => Err(e),
            _ => Ok(snapshot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::FakeBackend;
    use chrono::TimeZone;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn series(values: &[f64]) -> Vec<Datapoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| Datapoint {
                timestamp: now() - chrono::Duration::minutes(25 - 5 * i as i64),
                value: *value,
            })
            .collect()
    }

    #[test]
    fn test_plan_for_serverless_function() {
        let plan = MetricPlan::for_log_group("/aws/lambda/checkout", None).unwrap();
        assert_eq!(plan.namespace, "AWS/Lambda");
        assert_eq!(plan.dimensions[0].value, "checkout");
        let keys: Vec<&str> = plan.metrics.iter().map(|m| m.key).collect();
        assert_eq!(keys, vec!["errors", "duration", "concurrency"]);
    }

    #[test]
    fn test_plan_for_container_service() {
        let plan = MetricPlan::for_log_group("/ecs/web", Some("prod")).unwrap();
        assert_eq!(plan.namespace, "AWS/ECS");
        assert_eq!(plan.dimensions[0].name, "ClusterName");

        let plan = MetricPlan::for_log_group("/ecs/web", None).unwrap();
        assert!(plan.dimensions.is_empty());

        assert!(MetricPlan::for_log_group("/var/log/syslog", None).is_none());
    }

    #[test]
    fn test_summary_reduction() {
        // Points out of order: current must be the latest by timestamp
        let mut points = series(&[10.0, 30.0, 20.0]);
        points.reverse();
        let summary = MetricSummary::from_series(MetricUnit::Percent, &points).unwrap();
        assert_eq!(summary.current, 20.0);
        assert_eq!(summary.average, 20.0);
        assert_eq!(summary.max, 30.0);
        assert_eq!(summary.sample_count, 3);

        assert!(MetricSummary::from_series(MetricUnit::Count, &[]).is_none());
    }

    #[tokio::test]
    async fn test_fetch_serverless_metrics() {
        let backend = Arc::new(
            FakeBackend::new()
                .with_datapoints("Errors", series(&[1.0, 4.0]))
                .with_datapoints("Duration", series(&[120.0, 180.0])),
        );
        let collector = MetricsCollector::new(backend.clone(), Duration::from_secs(1), 300);

        let snapshot = collector
            .fetch_at("/aws/lambda/checkout", None, chrono::Duration::minutes(30), now())
            .await;
        let snapshot = snapshot.available().unwrap();

        assert_eq!(snapshot.get("errors").unwrap().current, 4.0);
        assert_eq!(snapshot.get("duration").unwrap().unit, MetricUnit::Milliseconds);
        // No samples for concurrency: omitted rather than zero
        assert!(snapshot.get("concurrency").is_none());
        assert_eq!(backend.call_count("GetMetricStatistics"), 3);
    }

    #[tokio::test]
    async fn test_unknown_source_is_empty_without_calls() {
        let backend = Arc::new(FakeBackend::new());
        let collector = MetricsCollector::new(backend.clone(), Duration::from_secs(1), 300);
        let snapshot = collector
            .fetch("/var/log/app", None, chrono::Duration::minutes(30))
            .await;
        assert_eq!(snapshot, StatusResult::Available(MetricsSnapshot::default()));
        assert_eq!(backend.call_count("GetMetricStatistics"), 0);
    }

    #[tokio::test]
    async fn test_every_query_failing_is_unavailable() {
        let backend = Arc::new(FakeBackend::new().deny("GetMetricStatistics", "cloudwatch:GetMetricStatistics"));
        let collector = MetricsCollector::new(backend, Duration::from_secs(1), 300);
        let snapshot = collector
            .fetch("/ecs/web", Some("prod"), chrono::Duration::minutes(30))
            .await;
        assert!(snapshot.unavailable_reason().unwrap().contains("Permission denied"));
    }
}
