use super::{bounded, StatusResult};
use crate::backends::{LogEventRecord, LogEventsRequest, LogsApi};
use crate::error::StatusError;
use crate::events::{truncate_chars, LogLine};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Recent log tail of a single stream
///
/// Returns at most `line_limit` entries from inside the lookback window,
/// newest first, each message cut to `max_message_chars` characters.
pub struct LogCollector {
    api: Arc<dyn LogsApi>,
    timeout: Duration,
    line_limit: usize,
    max_message_chars: usize,
}

impl LogCollector {
    pub fn new(api: Arc<dyn LogsApi>, timeout: Duration, line_limit: usize, max_message_chars: usize) -> Self {
        Self {
            api,
            timeout,
            line_limit,
            max_message_chars,
        }
    }

    pub async fn fetch_recent(&self, log_group: &str, log_stream: &str, window: chrono::Duration) -> StatusResult<Vec<LogLine>> {
        self.fetch_recent_at(log_group, log_stream, window, Utc::now())
            .await
    }

    /// Same as [`fetch_recent`](Self::fetch_recent) with an explicit "now"
    pub async fn fetch_recent_at(
        &self,
        log_group: &str,
        log_stream: &str,
        window: chrono::Duration,
        now: DateTime<Utc>,
    ) -> StatusResult<Vec<LogLine>> {
        let start_millis = (now - window).timestamp_millis();
        let request = LogEventsRequest {
            log_group_name: log_group.to_string(),
            log_stream_name: log_stream.to_string(),
            start_time: start_millis,
            limit: u32::try_from(self.line_limit).unwrap_or(u32::MAX),
            start_from_head: false,
        };

        let result: Result<Vec<LogLine>, StatusError> = bounded(self.timeout, async {
            let records = self.api.get_log_events(&request).await?;
            Ok(self.normalize(records, start_millis))
        })
        .await;

        StatusResult::from_backend(result, "recent logs", &format!("{}/{}", log_group, log_stream))
    }

    fn normalize(&self, mut records: Vec<LogEventRecord>, start_millis: i64) -> Vec<LogLine> {
        records.retain(|record| record.timestamp >= start_millis);
        // Newest first; ties keep the later-ingested entry first
        records.reverse();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        records
            .into_iter()
            .filter_map(|record| {
                let timestamp = DateTime::from_timestamp_millis(record.timestamp)?;
                Some(LogLine {
                    timestamp,
                    message: truncate_chars(&record.message, self.max_message_chars).to_string(),
                })
            })
            .take(self.line_limit)
            .collect()
    }
}
