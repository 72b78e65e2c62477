//! The diagnostic engine: category selection, parallel rule evaluation,
//! correlation, ranking, planning, and report assembly.
//!
//! Rule evaluation is CPU-bound and embarrassingly parallel: rules are
//! pure functions over a shared immutable context, so they fan out across
//! worker threads and the merged findings are sorted deterministically
//! afterwards. A rule that returns an error is logged and skipped; it can
//! never take the run down with it.

use crate::core::context::{DiagnosisContext, DiagnosticsConfig};
use crate::core::correlation::Correlator;
use crate::core::finding::Finding;
use crate::core::ranking::rank;
use crate::core::report::{DiagnosticReport, ReportBuilder};
use crate::core::rule::Rule;
use crate::core::severity::{Likelihood, Severity};
use crate::error::Result;
use crate::remediation::RemediationPlanner;
use crate::rules::default_catalog;
use crate::runner::registry::RuleRegistry;
use crate::snapshot::model::DistributionSnapshot;
use crate::snapshot::normalizer::SnapshotNormalizer;
use crate::source::ConfigSource;
use crate::symptom::SymptomParams;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct DiagnosticEngine {
    registry: RuleRegistry,
    correlator: Correlator,
    planner: RemediationPlanner,
    config: DiagnosticsConfig,
}

/// Ranked findings plus run-level warnings (e.g. an unrecognized error
/// code that forced fallback to full analysis).
#[derive(Debug)]
pub struct Evaluation {
    pub findings: Vec<Finding>,
    pub warnings: Vec<String>,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self {
            registry: default_catalog(),
            correlator: Correlator::new(),
            planner: RemediationPlanner::new(),
            config: DiagnosticsConfig::default(),
        }
    }

    pub fn with_config(config: DiagnosticsConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_correlator(mut self, correlator: Correlator) -> Self {
        self.correlator = correlator;
        self
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    pub fn list_rules(&self) -> Vec<RuleInfo> {
        let mut rules: Vec<RuleInfo> = self
            .registry
            .all()
            .iter()
            .map(|r| RuleInfo {
                id: r.id().to_string(),
                name: r.name().to_string(),
                description: r.description().to_string(),
                categories: r.categories().iter().map(|c| c.to_string()).collect(),
                base_severity: r.base_severity(),
                base_likelihood: r.base_likelihood(),
            })
            .collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        rules
    }

    /// End-to-end run: normalize, evaluate, plan, assemble.
    pub async fn run(
        &self,
        source: &dyn ConfigSource,
        symptoms: &SymptomParams,
    ) -> Result<DiagnosticReport> {
        let normalizer = SnapshotNormalizer::new(source, self.config.clone());
        let snapshot = normalizer.build(symptoms).await?;

        let evaluation = self.evaluate(&snapshot, symptoms);
        let entries = self.planner.plan(&evaluation.findings, &snapshot.id);

        Ok(ReportBuilder::new()
            .with_executive_limit(self.config.max_executive_findings)
            .build(&snapshot, symptoms, entries, evaluation.warnings))
    }

    /// Evaluate the active rule set against an already-normalized
    /// snapshot. Pure and deterministic for identical inputs.
    pub fn evaluate(
        &self,
        snapshot: &DistributionSnapshot,
        symptoms: &SymptomParams,
    ) -> Evaluation {
        let (category, warning) = symptoms.resolve_category();
        let warnings: Vec<String> = warning.into_iter().collect();

        let context = DiagnosisContext::new(snapshot, symptoms, category);
        let active = self.registry.for_category(category);
        debug!(
            active_rules = active.len(),
            category = ?category,
            "evaluating rule set"
        );

        let raw_findings: Vec<Finding> = if self.config.parallel_evaluation {
            active
                .par_iter()
                .filter_map(|rule| run_rule(rule, &context))
                .collect()
        } else {
            active
                .iter()
                .filter_map(|rule| run_rule(rule, &context))
                .collect()
        };

        let correlated = self.correlator.correlate(raw_findings, &context);
        Evaluation {
            findings: rank(correlated),
            warnings,
        }
    }
}

fn run_rule(rule: &Arc<dyn Rule>, context: &DiagnosisContext<'_>) -> Option<Finding> {
    match rule.evaluate(context) {
        Ok(finding) => finding,
        Err(err) => {
            warn!(rule = rule.id(), %err, "rule evaluation failed, skipping");
            None
        }
    }
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct RuleInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub categories: Vec<String>,
    pub base_severity: Severity,
    pub base_likelihood: Likelihood,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{snapshot_with, storage_origin, SnapshotOptions};

    fn vulnerable_snapshot() -> DistributionSnapshot {
        snapshot_with(SnapshotOptions {
            origins: vec![storage_origin("origin-1", None)],
            default_root_object: None,
            ..Default::default()
        })
    }

    #[test]
    fn parallel_and_serial_evaluation_agree() {
        let snapshot = vulnerable_snapshot();
        let params = SymptomParams::new("E2EXAMPLE");

        let parallel = DiagnosticEngine::new().evaluate(&snapshot, &params);

        let mut config = DiagnosticsConfig::default();
        config.parallel_evaluation = false;
        let serial = DiagnosticEngine::with_config(config).evaluate(&snapshot, &params);

        let parallel_ids: Vec<_> = parallel.findings.iter().map(|f| f.rule_id.clone()).collect();
        let serial_ids: Vec<_> = serial.findings.iter().map(|f| f.rule_id.clone()).collect();
        assert_eq!(parallel_ids, serial_ids);
    }

    #[test]
    fn unknown_error_code_falls_back_to_full_analysis() {
        let snapshot = vulnerable_snapshot();
        let params = SymptomParams::new("E2EXAMPLE").with_error_code("499");

        let evaluation = DiagnosticEngine::new().evaluate(&snapshot, &params);
        assert_eq!(evaluation.warnings.len(), 1);
        // Both the access-denied and not-found findings surface, as in a
        // run with no error code at all.
        assert!(evaluation
            .findings
            .iter()
            .any(|f| f.rule_id == "access-control-missing"));
        assert!(evaluation
            .findings
            .iter()
            .any(|f| f.rule_id == "default-root-object-missing"));
    }

    #[test]
    fn rule_listing_is_sorted_and_complete() {
        let engine = DiagnosticEngine::new();
        let rules = engine.list_rules();
        assert_eq!(rules.len(), 16);
        let mut ids: Vec<_> = rules.iter().map(|r| r.id.clone()).collect();
        let sorted = {
            let mut s = ids.clone();
            s.sort();
            s
        };
        assert_eq!(ids, sorted);
        ids.dedup();
        assert_eq!(ids.len(), 16);
    }
}
