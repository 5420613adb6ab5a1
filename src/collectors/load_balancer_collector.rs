use super::{bounded, StatusResult};
use crate::backends::LoadBalancerApi;
use crate::error::StatusError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const HEALTHY: &str = "healthy";

/// Load balancer state plus per-target-group health
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadBalancerHealth {
    pub name: String,
    pub state: String,
    pub target_groups: Vec<TargetGroupHealth>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetGroupHealth {
    pub name: String,
    pub healthy_targets: usize,
    pub total_targets: usize,
    pub targets: Vec<TargetState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetState {
    pub id: String,
    pub port: Option<u16>,
    pub state: String,
    pub reason: String,
}

/// Balancer name from an `app/<name>/<hash>` fragment; anything else is taken as the name
pub fn balancer_name(fragment: &str) -> &str {
    let parts: Vec<&str> = fragment.split('/').collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2]
    } else {
        fragment
    }
}

pub struct LoadBalancerCollector {
    api: Arc<dyn LoadBalancerApi>,
    timeout: Duration,
}

impl LoadBalancerCollector {
    pub fn new(api: Arc<dyn LoadBalancerApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    /// Health for the balancer named by `fragment`
    pub async fn fetch(&self, fragment: &str) -> StatusResult<LoadBalancerHealth> {
        let result = bounded(self.timeout, self.describe(balancer_name(fragment))).await;
        StatusResult::from_backend(result, "load balancer health", fragment)
    }

    async fn describe(&self, name: &str) -> Result<LoadBalancerHealth, StatusError> {
        let balancer = self
            .api
            .describe_load_balancers(name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StatusError::NotFound(format!("load balancer {}", name)))?;

        let groups = self
            .api
            .describe_target_groups(&balancer.load_balancer_arn)
            .await?;

        let mut target_groups = Vec::with_capacity(groups.len());
        for group in groups {
            let targets: Vec<TargetState> = self
                .api
                .describe_target_health(&group.target_group_arn)
                .await?
                .into_iter()
                .map(|target| TargetState {
                    id: target.target_id,
                    port: target.port,
                    state: target.state,
                    reason: target.reason.unwrap_or_default(),
                })
                .collect();

            target_groups.push(TargetGroupHealth {
                name: group.target_group_name,
                healthy_targets: targets.iter().filter(|t| t.state == HEALTHY).count(),
                total_targets: targets.len(),
                targets,
            });
        }

        Ok(LoadBalancerHealth {
            name: balancer.load_balancer_name,
            state: balancer.state,
            target_groups,
        })
    }
}
