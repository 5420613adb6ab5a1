use crate::aggregator::{GatherSettings, LookbackWindows};
use crate::collectors::CollectorSettings;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
///
/// Every section falls back to its defaults when missing. Credentials are
/// never read from this file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub gather: GatherConfig,
    pub analysis: AnalysisConfig,
}

/// Where status lookups go
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// HTTP/JSON status gateway holding the cloud credentials
    Gateway {
        endpoint: String,
        #[serde(default = "default_request_timeout_seconds")]
        request_timeout_seconds: u64,
    },
    /// No backend: every lookup answers "not found"
    #[default]
    Offline,
}

/// Timeouts, windows and limits for one gather
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatherConfig {
    pub call_timeout_seconds: u64,
    pub deadline_seconds: u64,
    pub log_lookback_minutes: i64,
    pub change_lookback_hours: i64,
    pub metric_lookback_minutes: i64,
    pub metric_period_seconds: u32,
    pub log_line_limit: usize,
    pub log_message_max_chars: usize,
}

/// Which model analyzes the gathered context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum AnalysisConfig {
    Gemini {
        #[serde(default = "default_model")]
        model: String,
        /// Environment variable holding the API key
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default = "default_analysis_timeout_seconds")]
        timeout_seconds: u64,
    },
    Mock,
}

fn default_request_timeout_seconds() -> u64 {
    5
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_analysis_timeout_seconds() -> u64 {
    60
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            call_timeout_seconds: 5,
            deadline_seconds: 20,
            log_lookback_minutes: 10,
            change_lookback_hours: 24,
            metric_lookback_minutes: 30,
            metric_period_seconds: 300,
            log_line_limit: 50,
            log_message_max_chars: 500,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig::Gemini {
            model: default_model(),
            api_key_env: default_api_key_env(),
            endpoint: None,
            timeout_seconds: default_analysis_timeout_seconds(),
        }
    }
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gather = &self.gather;

        if gather.call_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "gather.call_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if gather.deadline_seconds < gather.call_timeout_seconds {
            return Err(ConfigError::ValidationError(format!(
                "gather.deadline_seconds ({}) must not be shorter than gather.call_timeout_seconds ({})",
                gather.deadline_seconds, gather.call_timeout_seconds
            )));
        }

        let windows = [
            ("gather.log_lookback_minutes", gather.log_lookback_minutes),
            ("gather.change_lookback_hours", gather.change_lookback_hours),
            ("gather.metric_lookback_minutes", gather.metric_lookback_minutes),
        ];
        for (name, value) in windows {
            if value <= 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        if gather.metric_period_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "gather.metric_period_seconds must be greater than 0".to_string(),
            ));
        }
        if gather.log_line_limit == 0 || gather.log_message_max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "gather.log_line_limit and gather.log_message_max_chars must be greater than 0"
                    .to_string(),
            ));
        }

        if let BackendConfig::Gateway {
            endpoint,
            request_timeout_seconds,
        } = &self.backend
        {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "backend.endpoint must not be empty".to_string(),
                ));
            }
            if *request_timeout_seconds == 0 {
                return Err(ConfigError::ValidationError(
                    "backend.request_timeout_seconds must be greater than 0".to_string(),
                ));
            }
        }

        if let AnalysisConfig::Gemini {
            model,
            timeout_seconds,
            ..
        } = &self.analysis
        {
            if model.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "analysis.model must not be empty".to_string(),
                ));
            }
            if *timeout_seconds == 0 {
                return Err(ConfigError::ValidationError(
                    "analysis.timeout_seconds must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            call_timeout: Duration::from_secs(self.gather.call_timeout_seconds),
            log_line_limit: self.gather.log_line_limit,
            log_message_max_chars: self.gather.log_message_max_chars,
            metric_period_seconds: self.gather.metric_period_seconds,
        }
    }

    pub fn gather_settings(&self) -> GatherSettings {
        GatherSettings {
            deadline: Duration::from_secs(self.gather.deadline_seconds),
            windows: LookbackWindows {
                log_minutes: self.gather.log_lookback_minutes,
                change_hours: self.gather.change_lookback_hours,
                metric_minutes: self.gather.metric_lookback_minutes,
            },
        }
    }
}
