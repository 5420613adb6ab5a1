use super::{bounded, StatusResult};
use crate::backends::TagsApi;
use crate::classifier::InfrastructureKind;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Resource tags; only virtual machines carry queryable tags
pub struct TagCollector {
    api: Arc<dyn TagsApi>,
    timeout: Duration,
}

impl TagCollector {
    pub fn new(api: Arc<dyn TagsApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    pub async fn fetch(&self, resource_id: &str, kind: InfrastructureKind) -> StatusResult<BTreeMap<String, String>> {
        if kind != InfrastructureKind::VirtualMachine {
            return StatusResult::Available(BTreeMap::new());
        }

        let result = bounded(self.timeout, async {
            let tags = self.api.describe_tags(resource_id).await?;
            Ok(tags.into_iter().map(|tag| (tag.key, tag.value)).collect())
        })
        .await;
        StatusResult::from_backend(result, "tags", resource_id)
    }
}
