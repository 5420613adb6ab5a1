use crate::backends::{
    BackendFuture, ComputeApi, Datapoint, DeploymentApi, InstanceStatusRecord, LoadBalancerApi,
    LoadBalancerRecord, LogEventRecord, LogEventsRequest, LogsApi, MetricQuery, MetricsApi,
    StackEventRecord, StackSummaryRecord, TagRecord, TagsApi, TargetGroupRecord,
    TargetHealthRecord, TaskRecord,
};
use crate::error::StatusError;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory backend for tests and offline runs
///
/// Answers every port from data supplied through the `with_*` builders and
/// behaves like the real APIs for lookups that miss (empty results, or
/// `NotFound` where the real API raises). Actions can be made to fail, panic,
/// or stall. Backends built with `new` record every call by action name;
/// `offline` records nothing and is safe to keep for the life of the process.
///
/// # Example
/// ```
/// use lens::backends::{FakeBackend, TagRecord};
///
/// let backend = FakeBackend::new().with_tags(
///     "i-0123456789abcdef0",
///     vec![TagRecord { key: "team".to_string(), value: "payments".to_string() }],
/// );
/// assert_eq!(backend.call_count("DescribeTags"), 0);
/// ```
#[derive(Default)]
pub struct FakeBackend {
    instances: Vec<InstanceStatusRecord>,
    clusters: Vec<String>,
    tasks: HashMap<String, Vec<TaskRecord>>,
    load_balancers: Vec<LoadBalancerRecord>,
    target_groups: HashMap<String, Vec<TargetGroupRecord>>,
    target_health: HashMap<String, Vec<TargetHealthRecord>>,
    log_events: HashMap<(String, String), Vec<LogEventRecord>>,
    stacks: Vec<StackSummaryRecord>,
    stack_events: HashMap<String, Vec<StackEventRecord>>,
    datapoints: HashMap<String, Vec<Datapoint>>,
    tags: HashMap<String, Vec<TagRecord>>,
    denied: HashMap<&'static str, String>,
    panicking: HashSet<&'static str>,
    delays: HashMap<&'static str, Duration>,
    calls: Option<Arc<Mutex<Vec<String>>>>,
}

impl FakeBackend {
    /// Create a backend that knows about nothing and records its calls
    pub fn new() -> Self {
        Self {
            calls: Some(Arc::new(Mutex::new(Vec::new()))),
            ..Self::default()
        }
    }

    /// Create a backend that knows about nothing and keeps no call history
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn with_instance(mut self, record: InstanceStatusRecord) -> Self {
        self.instances.push(record);
        self
    }

    /// Register a cluster and the tasks running in it
    pub fn with_cluster(mut self, cluster: &str, tasks: Vec<TaskRecord>) -> Self {
        self.clusters.push(cluster.to_string());
        self.tasks.insert(cluster.to_string(), tasks);
        self
    }

    /// Register a load balancer with its target groups and their targets
    pub fn with_load_balancer(
        mut self,
        record: LoadBalancerRecord,
        groups: Vec<(TargetGroupRecord, Vec<TargetHealthRecord>)>,
    ) -> Self {
        let mut group_records = Vec::new();
        for (group, targets) in groups {
            self.target_health
                .insert(group.target_group_arn.clone(), targets);
            group_records.push(group);
        }
        self.target_groups
            .insert(record.load_balancer_arn.clone(), group_records);
        self.load_balancers.push(record);
        self
    }

    /// Register the events of one log stream, in ingestion order
    pub fn with_log_events(mut self, group: &str, stream: &str, events: Vec<LogEventRecord>) -> Self {
        self.log_events
            .insert((group.to_string(), stream.to_string()), events);
        self
    }

    pub fn with_stack(mut self, stack: StackSummaryRecord, events: Vec<StackEventRecord>) -> Self {
        self.stack_events.insert(stack.stack_name.clone(), events);
        self.stacks.push(stack);
        self
    }

    /// Register the series returned for a metric name, regardless of dimensions
    pub fn with_datapoints(mut self, metric_name: &str, points: Vec<Datapoint>) -> Self {
        self.datapoints.insert(metric_name.to_string(), points);
        self
    }

    pub fn with_tags(mut self, resource_id: &str, tags: Vec<TagRecord>) -> Self {
        self.tags.insert(resource_id.to_string(), tags);
        self
    }

    /// Make an action fail with `PermissionDenied`
    pub fn deny(mut self, action: &'static str, message: &str) -> Self {
        self.denied.insert(action, message.to_string());
        self
    }

    /// Make an action panic, simulating a defect inside a client
    pub fn panic_on(mut self, action: &'static str) -> Self {
        self.panicking.insert(action);
        self
    }

    /// Make an action stall before answering
    pub fn with_delay(mut self, action: &'static str, delay: Duration) -> Self {
        self.delays.insert(action, delay);
        self
    }

    /// Every call made so far, as `Action(argument)`
    pub fn calls(&self) -> Vec<String> {
        match &self.calls {
            Some(calls) => calls.lock().unwrap().clone(),
            None => Vec::new(),
        }
    }

    /// Number of calls made to one action
    pub fn call_count(&self, action: &str) -> usize {
        let prefix = format!("{}(", action);
        self.calls()
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }

    /// Record a call and apply any configured delay, panic or denial
    async fn enter(&self, action: &'static str, argument: &str) -> Result<(), StatusError> {
        if let Some(calls) = &self.calls {
            calls.lock().unwrap().push(format!("{}({})", action, argument));
        }

        if let Some(delay) = self.delays.get(action) {
            tokio::time::sleep(*delay).await;
        }
        if self.panicking.contains(action) {
            panic!("FakeBackend configured to panic on {}", action);
        }
        match self.denied.get(action) {
            Some(message) => Err(StatusError::PermissionDenied(message.clone())),
            None => Ok(()),
        }
    }
}

impl ComputeApi for FakeBackend {
    fn describe_instance_status<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> BackendFuture<'a, Vec<InstanceStatusRecord>> {
        Box::pin(async move {
            self.enter("DescribeInstanceStatus", instance_id).await?;
            Ok(self
                .instances
                .iter()
                .filter(|record| record.instance_id == instance_id)
                .cloned()
                .collect())
        })
    }

    fn list_clusters(&self) -> BackendFuture<'_, Vec<String>> {
        Box::pin(async move {
            self.enter("ListClusters", "").await?;
            Ok(self.clusters.clone())
        })
    }

    fn describe_tasks<'a>(&'a self, cluster: &'a str, task_id: &'a str) -> BackendFuture<'a, Vec<TaskRecord>> {
        Box::pin(async move {
            self.enter("DescribeTasks", &format!("{}/{}", cluster, task_id))
                .await?;
            let tasks = self.tasks.get(cluster).ok_or_else(|| {
                StatusError::NotFound(format!("cluster {} not found", cluster))
            })?;
            Ok(tasks
                .iter()
                .filter(|task| task.task_arn.ends_with(task_id))
                .cloned()
                .collect())
        })
    }
}

impl LoadBalancerApi for FakeBackend {
    fn describe_load_balancers<'a>(&'a self, name: &'a str) -> BackendFuture<'a, Vec<LoadBalancerRecord>> {
        Box::pin(async move {
            self.enter("DescribeLoadBalancers", name).await?;
            let found: Vec<LoadBalancerRecord> = self
                .load_balancers
                .iter()
                .filter(|record| record.load_balancer_name == name)
                .cloned()
                .collect();
            if found.is_empty() {
                return Err(StatusError::NotFound(format!("load balancer {} not found", name)));
            }
            Ok(found)
        })
    }

    fn describe_target_groups<'a>(
        &'a self,
        load_balancer_arn: &'a str,
    ) -> BackendFuture<'a, Vec<TargetGroupRecord>> {
        Box::pin(async move {
            self.enter("DescribeTargetGroups", load_balancer_arn).await?;
            Ok(self
                .target_groups
                .get(load_balancer_arn)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn describe_target_health<'a>(
        &'a self,
        target_group_arn: &'a str,
    ) -> BackendFuture<'a, Vec<TargetHealthRecord>> {
        Box::pin(async move {
            self.enter("DescribeTargetHealth", target_group_arn).await?;
            Ok(self
                .target_health
                .get(target_group_arn)
                .cloned()
                .unwrap_or_default())
        })
    }
}

impl LogsApi for FakeBackend {
    fn get_log_events<'a>(&'a self, request: &'a LogEventsRequest) -> BackendFuture<'a, Vec<LogEventRecord>> {
        Box::pin(async move {
            self.enter(
                "GetLogEvents",
                &format!("{}/{}", request.log_group_name, request.log_stream_name),
            )
            .await?;
            let key = (request.log_group_name.clone(), request.log_stream_name.clone());
            let events = self.log_events.get(&key).ok_or_else(|| {
                StatusError::NotFound(format!("log stream {} not found", request.log_stream_name))
            })?;

            let in_window: Vec<LogEventRecord> = events
                .iter()
                .filter(|event| event.timestamp >= request.start_time)
                .cloned()
                .collect();
            let limit = request.limit as usize;
            // Reading from the tail yields the newest `limit` events, still in ascending order
            let skip = if request.start_from_head {
                0
            } else {
                in_window.len().saturating_sub(limit)
            };
            Ok(in_window.into_iter().skip(skip).take(limit).collect())
        })
    }
}

impl DeploymentApi for FakeBackend {
    fn list_stacks<'a>(&'a self, status_filter: &'a [&'a str]) -> BackendFuture<'a, Vec<StackSummaryRecord>> {
        Box::pin(async move {
            self.enter("ListStacks", "").await?;
            Ok(self
                .stacks
                .iter()
                .filter(|stack| status_filter.contains(&stack.stack_status.as_str()))
                .cloned()
                .collect())
        })
    }

    fn describe_stack_events<'a>(&'a self, stack_name: &'a str) -> BackendFuture<'a, Vec<StackEventRecord>> {
        Box::pin(async move {
            self.enter("DescribeStackEvents", stack_name).await?;
            self.stack_events
                .get(stack_name)
                .cloned()
                .ok_or_else(|| StatusError::NotFound(format!("stack {} does not exist", stack_name)))
        })
    }
}

impl MetricsApi for FakeBackend {
    fn get_metric_statistics<'a>(&'a self, query: &'a MetricQuery) -> BackendFuture<'a, Vec<Datapoint>> {
        Box::pin(async move {
            self.enter("GetMetricStatistics", &query.metric_name).await?;
            Ok(self
                .datapoints
                .get(&query.metric_name)
                .map(|points| {
                    points
                        .iter()
                        .filter(|p| p.timestamp >= query.start_time && p.timestamp <= query.end_time)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }
}

impl TagsApi for FakeBackend {
    fn describe_tags<'a>(&'a self, resource_id: &'a str) -> BackendFuture<'a, Vec<TagRecord>> {
        Box::pin(async move {
            self.enter("DescribeTags", resource_id).await?;
            Ok(self.tags.get(resource_id).cloned().unwrap_or_default())
        })
    }
}
