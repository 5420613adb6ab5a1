/// TOML configuration with defaults and validation
pub mod settings;

pub use settings::{AnalysisConfig, BackendConfig, Config, GatherConfig};
