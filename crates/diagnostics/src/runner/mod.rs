//! Engine and registry: selecting, running, and merging rules.

pub mod engine;
pub mod registry;

pub use engine::{DiagnosticEngine, Evaluation, RuleInfo};
pub use registry::RuleRegistry;
