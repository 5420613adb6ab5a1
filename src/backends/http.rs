use crate::backends::{
    BackendFuture, ComputeApi, Datapoint, DeploymentApi, InstanceStatusRecord, LoadBalancerApi,
    LoadBalancerRecord, LogEventRecord, LogEventsRequest, LogsApi, MetricQuery, MetricsApi,
    StackEventRecord, StackSummaryRecord, TagRecord, TagsApi, TargetGroupRecord,
    TargetHealthRecord, TaskRecord,
};
use crate::error::StatusError;
use crate::events::Timestamp;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// Status gateway reached over HTTP/JSON
///
/// The gateway holds the cloud credentials and forwards read-only describe,
/// list and get calls. Every call is `POST {endpoint}/{service}/{Action}` with
/// a PascalCase JSON body.
pub struct HttpGateway {
    client: Client,
    endpoint: String,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceStatusesResponse {
    #[serde(default)]
    instance_statuses: Vec<InstanceStatusRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ClusterArnsResponse {
    #[serde(default)]
    cluster_arns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<TaskRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancersResponse {
    #[serde(default)]
    load_balancers: Vec<LoadBalancerRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TargetGroupsResponse {
    #[serde(default)]
    target_groups: Vec<TargetGroupRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TargetHealthResponse {
    #[serde(default)]
    target_health_descriptions: Vec<TargetHealthRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LogEventsResponse {
    #[serde(default)]
    events: Vec<LogEventRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackSummariesResponse {
    #[serde(default)]
    stack_summaries: Vec<StackSummaryRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackEventsResponse {
    #[serde(default)]
    stack_events: Vec<StackEventRecord>,
}

/// Datapoint as sent by the metrics API: one field per requested statistic
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireDatapoint {
    timestamp: Timestamp,
    #[serde(flatten)]
    values: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DatapointsResponse {
    #[serde(default)]
    datapoints: Vec<WireDatapoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TagsResponse {
    #[serde(default)]
    tags: Vec<TagRecord>,
}

impl HttpGateway {
    /// Create a gateway client
    ///
    /// # Arguments
    /// * `endpoint` - Gateway base URL (e.g., "http://localhost:8600")
    /// * `request_timeout` - Upper bound for a single HTTP exchange
    pub fn new(endpoint: String, request_timeout: Duration) -> Result<Self, StatusError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            request_timeout,
        })
    }

    /// Format the URL for one backend action
    fn action_url(&self, service: &str, action: &str) -> String {
        format!("{}/{}/{}", self.endpoint.trim_end_matches('/'), service, action)
    }

    /// Send one action and decode its response document
    async fn call<Req, Resp>(&self, service: &str, action: &str, request: &Req) -> Result<Resp, StatusError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.action_url(service, action);
        debug!("Calling status gateway: {}", url);

        let response = self
            .client
            .post(url.as_str())
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status.as_u16(), &format!("{}/{}", service, action), &body));
        }

        response.json::<Resp>().await.map_err(|e| {
            StatusError::InvalidResponse(format!("Failed to decode {}/{} response: {}", service, action, e))
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> StatusError {
        if error.is_timeout() {
            StatusError::Timeout(self.request_timeout)
        } else if error.is_connect() {
            StatusError::Transport(error.to_string())
        } else {
            StatusError::Http(error)
        }
    }
}

/// Map a non-success gateway status code onto the error taxonomy
pub(crate) fn status_error(status: u16, action: &str, body: &str) -> StatusError {
    match status {
        404 => StatusError::NotFound(format!("{}: {}", action, body)),
        401 | 403 => StatusError::PermissionDenied(format!("{}: {}", action, body)),
        _ => StatusError::Backend(format!("{} returned {}: {}", action, status, body)),
    }
}

fn metric_query_body(query: &MetricQuery) -> serde_json::Value {
    json!({
        "Namespace": query.namespace,
        "MetricName": query.metric_name,
        "Dimensions": query.dimensions,
        "StartTime": query.start_time,
        "EndTime": query.end_time,
        "Period": query.period_seconds,
        "Statistics": [query.statistic.as_str()],
    })
}

/// Keep datapoints that carry a numeric value for the requested statistic
fn select_statistic(datapoints: Vec<WireDatapoint>, statistic: &str) -> Vec<Datapoint> {
    datapoints
        .into_iter()
        .filter_map(|point| {
            let value = point.values.get(statistic)?.as_f64()?;
            Some(Datapoint {
                timestamp: point.timestamp,
                value,
            })
        })
        .collect()
}

impl ComputeApi for HttpGateway {
    fn describe_instance_status<'a>(
        &'a self,
        instance_id: &'a str,
    ) -> BackendFuture<'a, Vec<InstanceStatusRecord>> {
        Box::pin(async move {
            let body = json!({ "InstanceIds": [instance_id], "IncludeAllInstances": true });
            let response: InstanceStatusesResponse =
                self.call("ec2", "DescribeInstanceStatus", &body).await?;
            Ok(response.instance_statuses)
        })
    }

    fn list_clusters(&self) -> BackendFuture<'_, Vec<String>> {
        Box::pin(async move {
            let response: ClusterArnsResponse = self.call("ecs", "ListClusters", &json!({})).await?;
            Ok(response.cluster_arns)
        })
    }

    fn describe_tasks<'a>(&'a self, cluster: &'a str, task_id: &'a str) -> BackendFuture<'a, Vec<TaskRecord>> {
        Box::pin(async move {
            let body = json!({ "Cluster": cluster, "Tasks": [task_id] });
            let response: TasksResponse = self.call("ecs", "DescribeTasks", &body).await?;
            Ok(response.tasks)
        })
    }
}

impl LoadBalancerApi for HttpGateway {
    fn describe_load_balancers<'a>(&'a self, name: &'a str) -> BackendFuture<'a, Vec<LoadBalancerRecord>> {
        Box::pin(async move {
            let body = json!({ "Names": [name] });
            let response: LoadBalancersResponse =
                self.call("elbv2", "DescribeLoadBalancers", &body).await?;
            Ok(response.load_balancers)
        })
    }

    fn describe_target_groups<'a>(
        &'a self,
        load_balancer_arn: &'a str,
    ) -> BackendFuture<'a, Vec<TargetGroupRecord>> {
        Box::pin(async move {
            let body = json!({ "LoadBalancerArn": load_balancer_arn });
            let response: TargetGroupsResponse =
                self.call("elbv2", "DescribeTargetGroups", &body).await?;
            Ok(response.target_groups)
        })
    }

    fn describe_target_health<'a>(
        &'a self,
        target_group_arn: &'a str,
    ) -> BackendFuture<'a, Vec<TargetHealthRecord>> {
        Box::pin(async move {
            let body = json!({ "TargetGroupArn": target_group_arn });
            let response: TargetHealthResponse =
                self.call("elbv2", "DescribeTargetHealth", &body).await?;
            Ok(response.target_health_descriptions)
        })
    }
}

impl LogsApi for HttpGateway {
    fn get_log_events<'a>(&'a self, request: &'a LogEventsRequest) -> BackendFuture<'a, Vec<LogEventRecord>> {
        Box::pin(async move {
            let response: LogEventsResponse = self.call("logs", "GetLogEvents", request).await?;
            Ok(response.events)
        })
    }
}

impl DeploymentApi for HttpGateway {
    fn list_stacks<'a>(&'a self, status_filter: &'a [&'a str]) -> BackendFuture<'a, Vec<StackSummaryRecord>> {
        Box::pin(async move {
            let body = json!({ "StackStatusFilter": status_filter });
            let response: StackSummariesResponse =
                self.call("cloudformation", "ListStacks", &body).await?;
            Ok(response.stack_summaries)
        })
    }

    fn describe_stack_events<'a>(&'a self, stack_name: &'a str) -> BackendFuture<'a, Vec<StackEventRecord>> {
        Box::pin(async move {
            let body = json!({ "StackName": stack_name });
            let response: StackEventsResponse =
                self.call("cloudformation", "DescribeStackEvents", &body).await?;
            Ok(response.stack_events)
        })
    }
}

impl MetricsApi for HttpGateway {
    fn get_metric_statistics<'a>(&'a self, query: &'a MetricQuery) -> BackendFuture<'a, Vec<Datapoint>> {
        Box::pin(async move {
            let response: DatapointsResponse = self
                .call("cloudwatch", "GetMetricStatistics", &metric_query_body(query))
                .await?;
            Ok(select_statistic(response.datapoints, query.statistic.as_str()))
        })
    }
}

impl TagsApi for HttpGateway {
    fn describe_tags<'a>(&'a self, resource_id: &'a str) -> BackendFuture<'a, Vec<TagRecord>> {
        Box::pin(async move {
            let body = json!({ "Filters": [{ "Name": "resource-id", "Values": [resource_id] }] });
            let response: TagsResponse = self.call("ec2", "DescribeTags", &body).await?;
            Ok(response.tags)
        })
    }
}
