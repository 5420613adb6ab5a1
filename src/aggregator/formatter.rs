//! Text rendering of an enriched context
//!
//! Section order is fixed. A section whose data is absent or empty is left out.

use super::context::EnrichedContext;
use crate::collectors::{ComputeStatus, MetricSummary, MetricUnit};
use crate::events::truncate_chars;

/// Log lines shown in the prompt
const MAX_LOG_LINES: usize = 10;
/// Characters shown per log line
const MAX_LOG_CHARS: usize = 200;
/// Deployment changes shown in the prompt
const MAX_CHANGES: usize = 5;
/// Characters of a container id shown
const CONTAINER_ID_CHARS: usize = 12;

/// Render the context as prompt-ready text
pub fn format_for_prompt(context: &EnrichedContext) -> String {
    let sections: Vec<Vec<String>> = vec![
        infrastructure_section(context),
        log_section(context),
        compute_section(context),
        load_balancer_section(context),
        changes_section(context),
        metrics_section(context),
        tags_section(context),
    ];

    sections
        .into_iter()
        .filter(|lines| !lines.is_empty())
        .map(|lines| lines.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn infrastructure_section(context: &EnrichedContext) -> Vec<String> {
    let locator = context.locator();
    let mut lines = vec![
        "## Infrastructure Context".to_string(),
        format!("- Type: {}", locator.kind.label()),
    ];

    let fields = [
        ("Pod", locator.pod_name.as_deref()),
        ("Node", locator.node_name.as_deref()),
        ("Namespace", locator.namespace.as_deref()),
        ("ECS Task", locator.task_id.as_deref()),
        ("Cluster", locator.cluster_name.as_deref()),
        (
            "Container",
            locator
                .container_id
                .as_deref()
                .map(|id| truncate_chars(id, CONTAINER_ID_CHARS)),
        ),
        ("Load Balancer", locator.load_balancer_name.as_deref()),
        ("Resource ID", locator.resource_id.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            lines.push(format!("- {}: {}", label, value));
        }
    }
    lines
}

fn log_section(context: &EnrichedContext) -> Vec<String> {
    let Some(logs) = context.recent_logs() else {
        return Vec::new();
    };

    let mut lines = vec![format!(
        "## Recent Log Entries (last {} minutes)",
        context.windows().log_minutes
    )];
    for line in logs.iter().take(MAX_LOG_LINES) {
        lines.push(format!(
            "[{}] {}",
            line.timestamp.format("%H:%M:%S"),
            truncate_chars(&line.message, MAX_LOG_CHARS)
        ));
    }
    lines
}

fn compute_section(context: &EnrichedContext) -> Vec<String> {
    match context.compute() {
        Some(ComputeStatus::Instance(instance)) => {
            let mut lines = vec![
                "## EC2 Instance Health".to_string(),
                format!("- State: {}", instance.instance_state),
                format!("- System Status: {}", instance.system_status),
                format!("- Instance Status: {}", instance.instance_status),
            ];
            if !instance.events.is_empty() {
                let codes: Vec<&str> = instance.events.iter().map(|e| e.code.as_str()).collect();
                lines.push(format!("- Events: {}", codes.join(", ")));
            }
            lines
        }
        Some(ComputeStatus::Task(task)) => {
            let mut lines = vec![
                "## ECS Task Health".to_string(),
                format!("- Last Status: {}", task.last_status),
                format!("- Desired Status: {}", task.desired_status),
                format!("- Health: {}", task.health_status),
            ];
            if !task.containers.is_empty() {
                lines.push("- Containers:".to_string());
                for container in &task.containers {
                    lines.push(format!("  - {}: {}", container.name, container.last_status));
                    if let Some(code) = container.exit_code.filter(|code| *code != 0) {
                        lines.push(format!("    Exit code: {}", code));
                    }
                }
            }
            lines
        }
        None => Vec::new(),
    }
}

fn load_balancer_section(context: &EnrichedContext) -> Vec<String> {
    let Some(health) = context.load_balancer() else {
        return Vec::new();
    };

    let mut lines = vec![
        "## Load Balancer Health".to_string(),
        format!("- State: {}", health.state),
    ];
    for group in &health.target_groups {
        lines.push(format!(
            "- {}: {}/{} healthy",
            group.name, group.healthy_targets, group.total_targets
        ));
    }
    lines
}

fn changes_section(context: &EnrichedContext) -> Vec<String> {
    let Some(changes) = context.recent_changes() else {
        return Vec::new();
    };

    let mut lines = vec![format!(
        "## Recent Infrastructure Changes (last {}h)",
        context.windows().change_hours
    )];
    for change in changes.iter().take(MAX_CHANGES) {
        lines.push(format!("- {}: {}", change.stack_name, change.status));
        for failed in &change.failed_resources {
            lines.push(format!("  ⚠️ {}: {}", failed.resource, failed.reason));
        }
    }
    lines
}

fn format_value(unit: MetricUnit, value: f64) -> String {
    match unit {
        MetricUnit::Percent => format!("{:.1}%", value),
        MetricUnit::Milliseconds => format!("{:.1}ms", value),
        MetricUnit::Count => format!("{}", value.round() as i64),
    }
}

fn metric_line(key: &str, summary: &MetricSummary) -> String {
    format!(
        "- {}: current={}, avg={}, max={} ({} samples)",
        key,
        format_value(summary.unit, summary.current),
        format_value(summary.unit, summary.average),
        format_value(summary.unit, summary.max),
        summary.sample_count
    )
}

fn metrics_section(context: &EnrichedContext) -> Vec<String> {
    let Some(metrics) = context.metrics() else {
        return Vec::new();
    };

    let mut lines = vec![format!(
        "## Metrics (last {} minutes)",
        context.windows().metric_minutes
    )];
    lines.extend(
        metrics
            .series
            .iter()
            .map(|(key, summary)| metric_line(key, summary)),
    );
    lines
}

fn tags_section(context: &EnrichedContext) -> Vec<String> {
    let Some(tags) = context.resource_tags() else {
        return Vec::new();
    };

    let mut lines = vec!["## Resource Tags".to_string()];
    lines.extend(tags.iter().map(|(key, value)| format!("- {}: {}", key, value)));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{LookbackWindows, ProbeOutcome, ProbeSource};
    use crate::classifier::classify;
    use crate::collectors::{
        ContainerState, DeploymentChange, FailedResource, LoadBalancerHealth, MetricsSnapshot,
        StatusResult, TaskHealth, TargetGroupHealth,
    };
    use crate::events::LogLine;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn task_context() -> EnrichedContext {
        let locator = classify(
            "/ecs/prod/web",
            "web/app/0123456789abcdef0123456789abcdef",
            "container id: 0123456789abcdef0123 failed behind app/my-alb/0123456789abcdef",
        );
        EnrichedContext::new(locator, LookbackWindows::default())
    }

    fn log_lines(count: usize) -> Vec<LogLine> {
        (0..count)
            .map(|i| LogLine {
                timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
                    - chrono::Duration::seconds(i as i64),
                message: format!("{}{}", i, "y".repeat(300)),
            })
            .collect()
    }

    fn full_context() -> EnrichedContext {
        let mut series = BTreeMap::new();
        series.insert(
            "cpu".to_string(),
            MetricSummary {
                unit: MetricUnit::Percent,
                current: 91.24,
                average: 60.0,
                max: 97.5,
                sample_count: 6,
            },
        );
        let mut tags = BTreeMap::new();
        tags.insert("team".to_string(), "payments".to_string());

        task_context()
            .with_outcome(ProbeOutcome::RecentLogs(StatusResult::Available(log_lines(12))))
            .with_outcome(ProbeOutcome::Compute(StatusResult::Available(ComputeStatus::Task(
                TaskHealth {
                    task_id: "0123456789abcdef0123456789abcdef".to_string(),
                    cluster: "prod".to_string(),
                    task_arn: "arn:task".to_string(),
                    last_status: "STOPPED".to_string(),
                    desired_status: "RUNNING".to_string(),
                    health_status: "UNHEALTHY".to_string(),
                    containers: vec![
                        ContainerState {
                            name: "web".to_string(),
                            last_status: "STOPPED".to_string(),
                            exit_code: Some(137),
                            reason: "OutOfMemoryError".to_string(),
                        },
                        ContainerState {
                            name: "sidecar".to_string(),
                            last_status: "STOPPED".to_string(),
                            exit_code: Some(0),
                            reason: String::new(),
                        },
                    ],
                    cpu: None,
                    memory: None,
                },
            ))))
            .with_outcome(ProbeOutcome::LoadBalancer(StatusResult::Available(LoadBalancerHealth {
                name: "my-alb".to_string(),
                state: "active".to_string(),
                target_groups: vec![TargetGroupHealth {
                    name: "web".to_string(),
                    healthy_targets: 1,
                    total_targets: 3,
                    targets: vec![],
                }],
            })))
            .with_outcome(ProbeOutcome::RecentChanges(StatusResult::Available(
                (0..7)
                    .map(|i| DeploymentChange {
                        stack_name: format!("stack-{}", i),
                        status: "UPDATE_ROLLBACK_COMPLETE".to_string(),
                        last_updated: Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap(),
                        recent_event_count: 2,
                        failed_resources: vec![FailedResource {
                            resource: "TaskDef".to_string(),
                            status: "UPDATE_FAILED".to_string(),
                            reason: "Invalid image".to_string(),
                        }],
                    })
                    .collect(),
            )))
            .with_outcome(ProbeOutcome::Metrics(StatusResult::Available(MetricsSnapshot { series })))
            .with_outcome(ProbeOutcome::ResourceTags(StatusResult::Available(tags)))
    }

    fn headers(text: &str) -> Vec<&str> {
        text.lines().filter(|line| line.starts_with("## ")).collect()
    }

    #[test]
    fn test_locator_only_renders_identity_section() {
        let text = format_for_prompt(&task_context());
        assert_eq!(
            text,
            "## Infrastructure Context\n\
             - Type: ecs\n\
             - ECS Task: 0123456789abcdef0123456789abcdef\n\
             - Cluster: prod\n\
             - Container: 0123456789ab\n\
             - Load Balancer: app/my-alb/0123456789abcdef\n\
             - Resource ID: 0123456789abcdef0123456789abcdef"
        );
    }

    #[test]
    fn test_unknown_locator_still_renders_header() {
        let context = EnrichedContext::new(classify("", "", "???"), LookbackWindows::default());
        assert_eq!(format_for_prompt(&context), "## Infrastructure Context\n- Type: unknown");
    }

    #[test]
    fn test_section_order_and_caps() {
        let text = format_for_prompt(&full_context());
        assert_eq!(
            headers(&text),
            vec![
                "## Infrastructure Context",
                "## Recent Log Entries (last 10 minutes)",
                "## ECS Task Health",
                "## Load Balancer Health",
                "## Recent Infrastructure Changes (last 24h)",
                "## Metrics (last 30 minutes)",
                "## Resource Tags",
            ]
        );

        let log_lines: Vec<&str> = text.lines().filter(|l| l.starts_with('[')).collect();
        assert_eq!(log_lines.len(), 10);
        assert!(log_lines[0].starts_with("[12:00:00] 0y"));
        // "[HH:MM:SS] " prefix plus 200 characters
        assert!(log_lines.iter().all(|l| l.chars().count() == 11 + 200));

        assert_eq!(text.matches("- stack-").count(), 5);
        assert!(text.contains("  ⚠️ TaskDef: Invalid image"));
        assert!(text.contains("- web: 1/3 healthy"));
        assert!(text.contains("- cpu: current=91.2%, avg=60.0%, max=97.5% (6 samples)"));
        assert!(text.contains("    Exit code: 137"));
        assert!(!text.contains("Exit code: 0"));
        assert!(text.contains("- team: payments"));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let context = full_context();
        assert_eq!(format_for_prompt(&context), format_for_prompt(&context));
    }

    #[test]
    fn test_failed_and_empty_sections_omitted() {
        let context = task_context()
            .with_outcome(ProbeOutcome::unavailable(ProbeSource::Compute, "Timed out after 5s"))
            .with_outcome(ProbeOutcome::RecentLogs(StatusResult::Available(vec![])))
            .with_outcome(ProbeOutcome::RecentChanges(StatusResult::Available(vec![])))
            .with_outcome(ProbeOutcome::Metrics(StatusResult::Available(MetricsSnapshot::default())))
            .with_outcome(ProbeOutcome::ResourceTags(StatusResult::Available(BTreeMap::new())));
        assert_eq!(headers(&format_for_prompt(&context)), vec!["## Infrastructure Context"]);
    }

    #[test]
    fn test_metric_units_formatting() {
        assert_eq!(format_value(MetricUnit::Percent, 12.345), "12.3%");
        assert_eq!(format_value(MetricUnit::Milliseconds, 180.0), "180.0ms");
        assert_eq!(format_value(MetricUnit::Count, 4.0), "4");
        assert_eq!(format_value(MetricUnit::Count, 2.5), "3");
        assert_eq!(format_value(MetricUnit::Count, 0.4), "0");
    }
}
