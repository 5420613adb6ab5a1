/// Alert analysis pipeline and analysis backends
pub mod analyzer;
pub mod backends;

pub use analyzer::{AlertAnalyzer, DistributionMessage, InfrastructureSummary, CONTEXT_FALLBACK};
pub use backends::{AnalysisBackend, GeminiBackend, MockBackend, GEMINI_ENDPOINT};
