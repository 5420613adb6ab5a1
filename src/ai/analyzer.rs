use crate::aggregator::{format_for_prompt, ContextAggregator, EnrichedContext};
use crate::ai::backends::AnalysisBackend;
use crate::events::{Alert, Severity};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Prompt context used when nothing could be gathered
pub const CONTEXT_FALLBACK: &str = "Context gathering failed - analyzing with limited information";

const ANALYSIS_REQUEST: &str = "## Analysis Required
Provide a structured analysis with:

1. **Severity Assessment** (CRITICAL/HIGH/MEDIUM/LOW)
   - Validate or adjust the severity based on context
   - Consider impact on users and systems

2. **Root Cause Analysis**
   - What is the most likely root cause?
   - Use infrastructure context to identify specific issues
   - Reference specific resources (Pod names, Task IDs, etc.)

3. **Impact Assessment**
   - Which systems/users are affected?
   - Is this a partial or total outage?

4. **Recommended Actions** (prioritized list)
   - Immediate mitigation steps
   - Investigation steps
   - Long-term fixes

5. **Monitoring Recommendations**
   - What metrics should be watched?
   - What would indicate the issue is resolved?

6. **Confidence Score** (0.0-1.0)
   - How confident are you in this analysis?

Format the response clearly with headers and bullet points.";

/// Compact identity of the alerted resource attached to outgoing messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InfrastructureSummary {
    #[serde(rename = "type")]
    pub kind: String,
    pub resource_id: String,
    pub pod_name: String,
    pub task_id: String,
}

impl InfrastructureSummary {
    pub fn from_context(context: &EnrichedContext) -> Self {
        let locator = context.locator();
        Self {
            kind: locator.kind.label().to_string(),
            resource_id: locator.resource_id.clone().unwrap_or_default(),
            pod_name: locator.pod_name.clone().unwrap_or_default(),
            task_id: locator.task_id.clone().unwrap_or_default(),
        }
    }
}

/// Analysis result handed to the notification stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionMessage {
    pub alert_id: Option<String>,
    pub alert: String,
    pub analysis: String,
    pub severity: Severity,
    pub source: String,
    pub model: String,
    pub log_group: String,
    pub log_stream: String,
    pub infrastructure_context: InfrastructureSummary,
}

/// Gathers context for an alert and asks the analysis backend about it
pub struct AlertAnalyzer {
    aggregator: Arc<ContextAggregator>,
    backend: Arc<dyn AnalysisBackend>,
}

impl AlertAnalyzer {
    pub fn new(aggregator: Arc<ContextAggregator>, backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            aggregator,
            backend,
        }
    }

    /// Build the analysis prompt from the alert text and rendered context
    pub fn format_prompt(alert_message: &str, context_text: &str) -> String {
        let context_text = if context_text.trim().is_empty() {
            CONTEXT_FALLBACK
        } else {
            context_text
        };
        format!(
            "You are an expert SRE analyzing a production alert. Analyze this alert with the provided infrastructure context and provide actionable insights.\n\n## Alert\n{}\n\n{}\n\n{}",
            alert_message, context_text, ANALYSIS_REQUEST
        )
    }

    /// Gather, render, analyze. Never fails: model errors become the analysis text.
    pub async fn analyze(&self, alert: &Alert) -> DistributionMessage {
        let context = self.aggregator.gather(alert).await;
        let context_text = format_for_prompt(&context);
        let prompt = Self::format_prompt(&alert.message, &context_text);

        let model = self.backend.model().to_string();
        let analysis = match self.backend.complete(&prompt).await {
            Ok(text) => {
                info!(
                    "Analysis for {} complete ({} chars)",
                    alert.alert_id.as_deref().unwrap_or("alert"),
                    text.len()
                );
                text
            }
            Err(e) => {
                warn!("Analysis backend {} failed: {}", model, e);
                format!("Error calling {}: {}", model, e)
            }
        };

        DistributionMessage {
            alert_id: alert.alert_id.clone(),
            alert: alert.message.clone(),
            analysis,
            severity: alert.severity,
            source: alert.source.clone().unwrap_or_else(|| "unknown".to_string()),
            model,
            log_group: alert.log_group.clone(),
            log_stream: alert.stream().to_string(),
            infrastructure_context: InfrastructureSummary::from_context(&context),
        }
    }
}
