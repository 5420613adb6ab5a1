//! Context gathering and rendering
//!
//! [`ContextAggregator`] classifies an alert, runs the applicable status
//! probes concurrently under one deadline and merges their outcomes into an
//! [`EnrichedContext`]. [`format_for_prompt`] renders that context as text.

pub mod context;
pub mod context_aggregator;
pub mod formatter;
pub mod probes;

pub use context::{EnrichedContext, LookbackWindows};
pub use context_aggregator::{
    ContextAggregator, GatherSettings, AGGREGATION_ERROR, DEADLINE_EXCEEDED,
};
pub use formatter::format_for_prompt;
pub use probes::{dispatch, plan, Probe, ProbeOutcome, ProbeSource};
