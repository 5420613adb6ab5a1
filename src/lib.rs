/// Error types for status lookups, analysis and configuration
pub mod error;

/// Alert input record and shared event types
pub mod events;

/// Identifier extraction from alert log metadata
pub mod classifier;

/// External status backend ports and implementations
pub mod backends;

/// Per-subsystem status collectors
pub mod collectors;

/// Concurrent context gathering and prompt rendering
pub mod aggregator;

/// AI analyzer and backend implementations
pub mod ai;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use aggregator::{format_for_prompt, ContextAggregator, EnrichedContext};
pub use classifier::{Classifier, InfrastructureKind, ResourceLocator};
pub use collectors::{StatusClients, StatusResult};
pub use error::{AnalysisError, ConfigError, StatusError};
pub use events::{Alert, Severity};
