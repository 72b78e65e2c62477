//! Edgescope diagnostics - CDN distribution misconfiguration analysis.
//!
//! The pipeline: a [`SnapshotNormalizer`] turns control-plane records
//! into an immutable [`DistributionSnapshot`]; the [`DiagnosticEngine`]
//! evaluates the rule catalog selected by the operator's symptom,
//! correlates and ranks the findings, plans tiered remediation for each,
//! and assembles a [`DiagnosticReport`]. Data flows strictly forward; no
//! stage mutates a prior stage's output.

pub mod core;
pub mod error;
pub mod remediation;
pub mod rules;
pub mod runner;
pub mod snapshot;
pub mod source;
pub mod symptom;

pub mod testkit;

pub use crate::core::{
    DiagnosisContext, DiagnosticReport, DiagnosticsConfig, Evidence, Facet, Finding, Likelihood,
    ReportFormat, Rule, Severity,
};
pub use error::{DiagnosticError, SourceError};
pub use remediation::{RemediationAction, RemediationPlanner, Tier};
pub use runner::{DiagnosticEngine, RuleRegistry};
pub use snapshot::{DistributionSnapshot, SnapshotNormalizer};
pub use source::{ConfigDump, ConfigSource, FileConfigSource, MemoryConfigSource};
pub use symptom::{SymptomCategory, SymptomParams};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
