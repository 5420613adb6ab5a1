//! Core event types shared across the enrichment pipeline
//!
//! This module defines the inbound alert record, the severity levels it can
//! carry, and the log line type returned by the recent-log collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Infrastructure alert derived from a log event
///
/// Delivered by the upstream detection stage. Only `log_group` and `message`
/// are needed for enrichment; everything else is carried through to the
/// outgoing distribution message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Alert {
    /// Identifier assigned by the detection stage
    #[serde(default)]
    pub alert_id: Option<String>,
    /// Log group the triggering event was written to
    #[serde(default)]
    pub log_group: String,
    /// Log stream within the group, when known
    #[serde(default)]
    pub log_stream: Option<String>,
    /// Raw log message that triggered the alert
    #[serde(default = "default_message")]
    pub message: String,
    /// Severity assigned upstream
    #[serde(default)]
    pub severity: Severity,
    /// Name of the detector that produced the alert
    #[serde(default)]
    pub source: Option<String>,
}

fn default_message() -> String {
    "Unknown error".to_string()
}

impl Alert {
    /// Create an alert from its three identifying strings
    pub fn new(log_group: impl Into<String>, log_stream: impl Into<String>, message: impl Into<String>) -> Self {
        let log_stream = log_stream.into();
        Self {
            log_group: log_group.into(),
            log_stream: (!log_stream.is_empty()).then_some(log_stream),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Log stream, or an empty string when the alert did not name one
    pub fn stream(&self) -> &str {
        self.log_stream.as_deref().unwrap_or("")
    }
}

/// Severity assigned to an alert by the detection stage
///
/// `Unknown` catches unrecognized labels, so it must stay the last variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    /// Severity was not supplied or not recognized
    #[default]
    #[serde(other)]
    Unknown,
}

/// One entry from the recent-log tail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogLine {
    /// When the entry was ingested by the log store
    pub timestamp: Timestamp,
    /// Message text, already truncated by the collector
    pub message: String,
}

/// Truncate `text` to at most `max_chars` characters
///
/// Counts Unicode scalar values rather than bytes so multi-byte text is never
/// split mid-character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_deserialization_with_defaults() {
        let alert: Alert = serde_json::from_str(r#"{"log_group": "/aws/lambda/checkout"}"#).unwrap();
        assert_eq!(alert.log_group, "/aws/lambda/checkout");
        assert_eq!(alert.log_stream, None);
        assert_eq!(alert.message, "Unknown error");
        assert_eq!(alert.severity, Severity::Unknown);
        assert_eq!(alert.stream(), "");
    }

    #[test]
    fn test_alert_full_deserialization() {
        let json = r#"{
            "alert_id": "a-1",
            "log_group": "/ecs/prod/api",
            "log_stream": "api/web/0123456789abcdef0123456789abcdef",
            "message": "OOMKilled",
            "severity": "CRITICAL",
            "source": "error-rate"
        }"#;
        let alert: Alert = serde_json::from_str(json).unwrap();
        assert_eq!(alert.alert_id.as_deref(), Some("a-1"));
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.source.as_deref(), Some("error-rate"));
    }

    #[test]
    fn test_unrecognized_severity_maps_to_unknown() {
        let severity: Severity = serde_json::from_str("\"SEVERE\"").unwrap();
        assert_eq!(severity, Severity::Unknown);
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"HIGH\"");
    }

    #[test]
    fn test_severity_labels() {
        let cases = [
            ("\"LOW\"", Severity::Low),
            ("\"MEDIUM\"", Severity::Medium),
            ("\"HIGH\"", Severity::High),
            ("\"CRITICAL\"", Severity::Critical),
            ("\"UNKNOWN\"", Severity::Unknown),
            ("\"high\"", Severity::Unknown),
        ];
        for (json, expected) in cases {
            let severity: Severity = serde_json::from_str(json).unwrap();
            assert_eq!(severity, expected, "label {}", json);
        }
        assert_eq!(Severity::default(), Severity::Unknown);
        assert_eq!(serde_json::to_string(&Severity::Unknown).unwrap(), "\"UNKNOWN\"");
    }

    #[test]
    fn test_alert_new_treats_empty_stream_as_missing() {
        let alert = Alert::new("/app", "", "boom");
        assert_eq!(alert.log_stream, None);

        let alert = Alert::new("/app", "stream-1", "boom");
        assert_eq!(alert.stream(), "stream-1");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("", 3), "");
        // Multi-byte characters count once each
        assert_eq!(truncate_chars("héllo wörld", 8), "héllo wö");
    }
}
