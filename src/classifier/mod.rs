/// Identifier classification: which subsystem and resource an alert concerns
pub mod engine;
pub mod locator;
pub mod rules;

pub use engine::{classify, ClassificationRule, Classifier};
pub use locator::{InfrastructureKind, ResourceLocator};
pub use rules::{Finding, Identifiers, PodAttributes, Placement};
