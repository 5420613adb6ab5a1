use anyhow::Context as _;
use clap::Parser;
use lens::aggregator::{format_for_prompt, ContextAggregator};
use lens::ai::{AlertAnalyzer, AnalysisBackend, GeminiBackend, InfrastructureSummary, MockBackend};
use lens::backends::{Backends, FakeBackend, HttpGateway};
use lens::classifier::Classifier;
use lens::collectors::StatusClients;
use lens::config::{AnalysisConfig, BackendConfig, Config};
use lens::error::{AnalysisError, ConfigError};
use lens::events::Alert;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Command-line arguments for the alert enrichment pipeline
#[derive(Parser)]
#[command(
    name = "lens",
    about = "Infrastructure alert enrichment - gathers live resource context and analyzes alerts",
    long_about = "Reads alerts as JSON lines, identifies the infrastructure resource behind each one, \
                  gathers its live status from the configured backend, and writes one analyzed \
                  result per alert as a JSON line on stdout."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// Alert input file; stdin when omitted
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Read alerts as JSON lines from FILE instead of stdin"
    )]
    input: Option<PathBuf>,

    /// Emit the gathered context without calling the model
    #[arg(long, help = "Write the rendered context instead of an analysis")]
    context_only: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// A missing config file is not an error here; `load_config` falls back
    /// to defaults. A missing input file is.
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        if let Some(ref input_path) = self.input {
            if !input_path.is_file() {
                return Err(format!(
                    "Input path is not a readable file: {}",
                    input_path.display()
                ));
            }
        }

        Ok(())
    }
}

/// Context-only output line
#[derive(Debug, Serialize)]
struct ContextLine {
    alert_id: Option<String>,
    infrastructure_context: InfrastructureSummary,
    context: String,
}

/// What to do with each alert
enum Mode {
    ContextOnly(Arc<ContextAggregator>),
    Analyze(AlertAnalyzer),
}

/// Load configuration, falling back to defaults when the file is unusable
fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        info!("No configuration file specified, using defaults");
        return Config::default();
    };

    match Config::from_file(path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(ConfigError::ReadError(e)) => {
            warn!("Could not read configuration file ({}), using defaults", e);
            Config::default()
        }
        Err(e) => {
            error!("Invalid configuration in {}: {}", path.display(), e);
            warn!("Falling back to default configuration");
            Config::default()
        }
    }
}

fn build_backends(config: &BackendConfig) -> anyhow::Result<Backends> {
    match config {
        BackendConfig::Gateway {
            endpoint,
            request_timeout_seconds,
        } => {
            info!("Using status gateway at {}", endpoint);
            let gateway = HttpGateway::new(
                endpoint.clone(),
                Duration::from_secs(*request_timeout_seconds),
            )
            .context("failed to create status gateway client")?;
            Ok(Backends::from_shared(Arc::new(gateway)))
        }
        BackendConfig::Offline => {
            warn!("No status backend configured, gathering will find nothing");
            Ok(Backends::from_shared(Arc::new(FakeBackend::offline())))
        }
    }
}

fn build_analysis_backend(config: &AnalysisConfig) -> Result<Arc<dyn AnalysisBackend>, AnalysisError> {
    match config {
        AnalysisConfig::Gemini {
            model,
            api_key_env,
            endpoint,
            timeout_seconds,
        } => {
            let backend = GeminiBackend::from_env(
                endpoint.clone(),
                model.clone(),
                api_key_env,
                Duration::from_secs(*timeout_seconds),
            )?;
            info!("Using Gemini model {}", model);
            Ok(Arc::new(backend))
        }
        AnalysisConfig::Mock => {
            info!("Using mock analysis backend");
            Ok(Arc::new(MockBackend::success()))
        }
    }
}

/// Parse one input line; blank and malformed lines yield `None`
fn parse_alert(line: &str, line_number: usize) -> Option<Alert> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Alert>(line) {
        Ok(alert) => Some(alert),
        Err(e) => {
            warn!("Skipping malformed alert on line {}: {}", line_number, e);
            None
        }
    }
}

/// Process alerts until input ends or `running` is cleared
///
/// Returns the number of alerts written.
async fn run<R, W>(reader: R, mut out: W, mode: &Mode, running: &AtomicBool) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = reader.lines();
    let mut line_number = 0;
    let mut written = 0;

    while running.load(Ordering::SeqCst) {
        let Some(line) = lines.next_line().await.context("failed to read alert input")? else {
            break;
        };
        line_number += 1;

        let Some(alert) = parse_alert(&line, line_number) else {
            continue;
        };
        debug!("Processing alert {:?} from {}", alert.alert_id, alert.log_group);

        let output = match mode {
            Mode::ContextOnly(aggregator) => {
                let context = aggregator.gather(&alert).await;
                serde_json::to_string(&ContextLine {
                    alert_id: alert.alert_id.clone(),
                    infrastructure_context: InfrastructureSummary::from_context(&context),
                    context: format_for_prompt(&context),
                })?
            }
            Mode::Analyze(analyzer) => serde_json::to_string(&analyzer.analyze(&alert).await)?,
        };

        writeln!(out, "{}", output).context("failed to write output")?;
        out.flush().context("failed to flush output")?;
        written += 1;
    }

    Ok(written)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = load_config(cli.config.as_deref());

    let backends = match build_backends(&config.backend) {
        Ok(backends) => backends,
        Err(e) => {
            error!("Failed to initialize status backend: {:#}", e);
            std::process::exit(1);
        }
    };
    let clients = StatusClients::new(&backends, &config.collector_settings());
    let aggregator = Arc::new(ContextAggregator::new(
        clients,
        Classifier::with_default_rules(),
        config.gather_settings(),
    ));

    let mode = if cli.context_only {
        Mode::ContextOnly(aggregator)
    } else {
        let backend = match build_analysis_backend(&config.analysis) {
            Ok(backend) => backend,
            Err(e) => {
                warn!("Analysis backend unavailable ({}), using mock backend", e);
                Arc::new(MockBackend::success())
            }
        };
        Mode::Analyze(AlertAnalyzer::new(aggregator, backend))
    };

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        if handler_flag.swap(false, Ordering::SeqCst) {
            info!("Received interrupt signal, stopping after the current alert");
        } else {
            std::process::exit(130);
        }
    }) {
        warn!("Failed to install interrupt handler: {}", e);
    }

    let result = match cli.input {
        Some(ref path) => match tokio::fs::File::open(path).await {
            Ok(file) => run(BufReader::new(file), std::io::stdout(), &mode, &running).await,
            Err(e) => {
                error!("Failed to open input {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => run(BufReader::new(tokio::io::stdin()), std::io::stdout(), &mode, &running).await,
    };

    match result {
        Ok(count) => info!("Processed {} alerts", count),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens::aggregator::GatherSettings;
    use lens::collectors::CollectorSettings;
    use tempfile::{Builder, NamedTempFile, TempDir};

    fn toml_file() -> NamedTempFile {
        Builder::new().suffix(".toml").tempfile().unwrap()
    }

    fn cli(config: Option<PathBuf>, input: Option<PathBuf>) -> Cli {
        Cli {
            config,
            verbose: false,
            input,
            context_only: false,
        }
    }

    fn offline_aggregator() -> Arc<ContextAggregator> {
        let backends = Backends::from_shared(Arc::new(FakeBackend::offline()));
        Arc::new(ContextAggregator::new(
            StatusClients::new(&backends, &CollectorSettings::default()),
            Classifier::with_default_rules(),
            GatherSettings::default(),
        ))
    }

    #[test]
    fn test_cli_validation_with_existing_file() {
        let file = toml_file();
        assert!(cli(Some(file.path().to_path_buf()), None).validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_missing_config() {
        let missing = PathBuf::from("/nonexistent/lens.toml");
        assert!(cli(Some(missing), None).validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_directory() {
        let dir = TempDir::new().unwrap();
        let result = cli(Some(dir.path().to_path_buf()), None).validate();
        assert!(result.unwrap_err().contains("not a file"));
    }

    #[test]
    fn test_cli_validation_with_missing_input() {
        let missing = PathBuf::from("/nonexistent/alerts.jsonl");
        assert!(cli(None, Some(missing)).validate().is_err());
    }

    #[test]
    fn test_cli_validation_no_arguments() {
        assert!(cli(None, None).validate().is_ok());
    }

    #[test]
    fn test_load_config_falls_back_to_defaults() {
        assert_eq!(load_config(None), Config::default());
        assert_eq!(
            load_config(Some(Path::new("/nonexistent/lens.toml"))),
            Config::default()
        );

        let mut invalid = toml_file();
        writeln!(invalid, "[gather]\ncall_timeout_seconds = 0").unwrap();
        assert_eq!(load_config(Some(invalid.path())), Config::default());
    }

    #[test]
    fn test_parse_alert_skips_blank_and_malformed_lines() {
        assert!(parse_alert("   ", 1).is_none());
        assert!(parse_alert("{not json", 2).is_none());

        let alert = parse_alert(r#"{"log_group": "/ecs/prod/web", "message": "boom"}"#, 3).unwrap();
        assert_eq!(alert.log_group, "/ecs/prod/web");
        assert_eq!(alert.message, "boom");
    }

    #[tokio::test]
    async fn test_context_only_run_writes_one_line_per_alert() {
        let input = concat!(
            r#"{"alert_id": "a-1", "log_group": "/aws/ec2/web", "message": "i-0abc1234def567890 unhealthy"}"#,
            "\n",
            "garbage\n",
            "\n",
            r#"{"alert_id": "a-2", "log_group": "nowhere", "message": "???"}"#,
            "\n",
        );
        let mode = Mode::ContextOnly(offline_aggregator());
        let running = AtomicBool::new(true);
        let mut out = Vec::new();

        let written = run(input.as_bytes(), &mut out, &mode, &running).await.unwrap();
        assert_eq!(written, 2);

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["alert_id"], "a-1");
        assert_eq!(lines[1]["alert_id"], "a-2");
        assert_eq!(lines[1]["infrastructure_context"]["type"], "unknown");
        assert_eq!(lines[1]["context"], "## Infrastructure Context\n- Type: unknown");
    }

    #[tokio::test]
    async fn test_analyze_run_emits_distribution_messages() {
        let backend = Arc::new(MockBackend::success());
        let mode = Mode::Analyze(AlertAnalyzer::new(offline_aggregator(), backend.clone()));
        let running = AtomicBool::new(true);
        let mut out = Vec::new();

        let input = r#"{"alert_id": "a-1", "log_group": "/aws/lambda/checkout", "message": "Task timed out"}"#;
        let written = run(input.as_bytes(), &mut out, &mode, &running).await.unwrap();

        assert_eq!(written, 1);
        assert_eq!(backend.call_count(), 1);
        let message: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(message["analysis"], "Mock analysis: no action required");
        assert_eq!(message["source"], "unknown");
    }

    #[tokio::test]
    async fn test_run_stops_when_interrupted() {
        let mode = Mode::ContextOnly(offline_aggregator());
        let running = AtomicBool::new(false);
        let mut out = Vec::new();

        let input = r#"{"log_group": "nowhere", "message": "x"}"#;
        let written = run(input.as_bytes(), &mut out, &mode, &running).await.unwrap();
        assert_eq!(written, 0);
        assert!(out.is_empty());
    }
}
