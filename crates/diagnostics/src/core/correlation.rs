//! Cross-facet correlation over raw findings.
//!
//! A finding in one facet can change meaning given the state of another:
//! two independent Medium findings may really be one Critical issue, and
//! a finding can be irrelevant to the symptom that triggered the run.
//! Correlation rules express this as `(finding predicate) × (snapshot
//! predicate) → adjustment`. They read the snapshot, never other
//! findings, so the outcome cannot depend on evaluation order.
//!
//! Findings are never edited in place; the correlator emits a new list.

use crate::core::context::DiagnosisContext;
use crate::core::finding::{Evidence, Finding};
use crate::core::severity::{Likelihood, Severity};
use crate::snapshot::model::{FacetState, OriginKind, ProbeOutcome};
use crate::symptom::SymptomCategory;
use std::collections::HashMap;
use tracing::debug;

pub enum Adjustment {
    Suppress { reason: String },

    Escalate {
        severity: Severity,
        reason: String,
        evidence: Vec<Evidence>,
    },

    RaiseLikelihood {
        likelihood: Likelihood,
        reason: String,
    },

    Annotate { note: String },
}

pub trait CorrelationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, finding: &Finding, context: &DiagnosisContext<'_>) -> Option<Adjustment>;
}

pub struct Correlator {
    rules: Vec<Box<dyn CorrelationRule>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(OffTopicRootObjectRule),
                Box::new(PublicBucketEscalationRule),
                Box::new(ExposureMergeRule),
                Box::new(ShadowedTrustCheckRule),
                Box::new(ProbeTimeoutEscalationRule),
                Box::new(WafPathAnnotationRule),
            ],
        }
    }

    pub fn add_rule(mut self, rule: Box<dyn CorrelationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Apply every correlation rule, then deduplicate to at most one
    /// finding per `(Facet, rule id)` pair.
    pub fn correlate(
        &self,
        findings: Vec<Finding>,
        context: &DiagnosisContext<'_>,
    ) -> Vec<Finding> {
        let mut surviving = Vec::new();

        for finding in findings {
            let mut current = finding;
            let mut suppressed = false;

            for rule in &self.rules {
                match rule.evaluate(&current, context) {
                    None => {}
                    Some(Adjustment::Suppress { reason }) => {
                        debug!(rule = rule.name(), %reason, finding = %current.rule_id, "suppressing finding");
                        suppressed = true;
                        break;
                    }
                    Some(Adjustment::Escalate {
                        severity,
                        reason,
                        evidence,
                    }) => {
                        debug!(rule = rule.name(), finding = %current.rule_id, %severity, "escalating finding");
                        current = current
                            .adjust_severity(severity)
                            .with_note(reason)
                            .with_evidence_list(evidence);
                    }
                    Some(Adjustment::RaiseLikelihood { likelihood, reason }) => {
                        if likelihood > current.likelihood {
                            current = current.adjust_likelihood(likelihood).with_note(reason);
                        }
                    }
                    Some(Adjustment::Annotate { note }) => {
                        current = current.with_note(note);
                    }
                }
            }

            if !suppressed {
                surviving.push(current);
            }
        }

        dedup(surviving)
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the higher-priority finding for each `(Facet, rule id)` pair.
/// Sorted by rule id first so the outcome is independent of input order.
fn dedup(mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));

    let mut by_key: HashMap<_, Finding> = HashMap::new();
    for finding in findings {
        match by_key.entry(finding.dedup_key()) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(finding);
            }
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                if finding.priority_score() > slot.get().priority_score() {
                    slot.insert(finding);
                }
            }
        }
    }

    by_key.into_values().collect()
}

// ---------------------------------------------------------------------------
// Built-in correlation rules
// ---------------------------------------------------------------------------

/// A missing default root object cannot cause an access-denied symptom.
struct OffTopicRootObjectRule;

impl CorrelationRule for OffTopicRootObjectRule {
    fn name(&self) -> &'static str {
        "off-topic-root-object"
    }

    fn evaluate(&self, finding: &Finding, context: &DiagnosisContext<'_>) -> Option<Adjustment> {
        if finding.rule_id == "default-root-object-missing"
            && context.category() == Some(SymptomCategory::AccessDenied)
        {
            return Some(Adjustment::Suppress {
                reason: "irrelevant to an access-denied symptom".to_string(),
            });
        }
        None
    }
}

/// Missing access control on a bucket that is also confirmed public is a
/// single compounded issue, not two independent findings.
struct PublicBucketEscalationRule;

fn bucket_confirmed_public(context: &DiagnosisContext<'_>) -> bool {
    context
        .security()
        .and_then(|s| s.bucket_policy.as_known())
        .map(|p| p.public_read)
        .unwrap_or(false)
}

impl CorrelationRule for PublicBucketEscalationRule {
    fn name(&self) -> &'static str {
        "public-bucket-escalation"
    }

    fn evaluate(&self, finding: &Finding, context: &DiagnosisContext<'_>) -> Option<Adjustment> {
        if finding.rule_id == "access-control-missing"
            && finding.confirmed
            && bucket_confirmed_public(context)
        {
            return Some(Adjustment::Escalate {
                severity: Severity::Critical,
                reason: "the origin bucket is also publicly readable, so the missing \
                         access control is actively exploitable"
                    .to_string(),
                evidence: vec![Evidence::new("security.bucket_policy.public_read", "true")],
            });
        }
        None
    }
}

/// Counterpart of the escalation above: fold the standalone exposure
/// finding into the escalated access-control finding.
struct ExposureMergeRule;

fn storage_origin_lacks_access_control(context: &DiagnosisContext<'_>) -> bool {
    context.snapshot().origins.iter().any(|o| {
        o.kind == OriginKind::ObjectStorage
            && matches!(o.access_control, FacetState::Known(None))
    })
}

impl CorrelationRule for ExposureMergeRule {
    fn name(&self) -> &'static str {
        "exposure-merge"
    }

    fn evaluate(&self, finding: &Finding, context: &DiagnosisContext<'_>) -> Option<Adjustment> {
        if finding.rule_id == "origin-publicly-exposed"
            && finding.confirmed
            && storage_origin_lacks_access_control(context)
        {
            return Some(Adjustment::Suppress {
                reason: "merged into the escalated access-control finding".to_string(),
            });
        }
        None
    }
}

/// When access control is confirmed missing on some origin, the
/// finer-grained trust check on another origin's access control is noise.
struct ShadowedTrustCheckRule;

impl CorrelationRule for ShadowedTrustCheckRule {
    fn name(&self) -> &'static str {
        "shadowed-trust-check"
    }

    fn evaluate(&self, finding: &Finding, context: &DiagnosisContext<'_>) -> Option<Adjustment> {
        if finding.rule_id == "access-control-unattached"
            && storage_origin_lacks_access_control(context)
        {
            return Some(Adjustment::Suppress {
                reason: "superseded by a confirmed missing access control".to_string(),
            });
        }
        None
    }
}

/// A probe timeout against the origin corroborates the untuned read
/// timeout in a general sweep.
struct ProbeTimeoutEscalationRule;

impl CorrelationRule for ProbeTimeoutEscalationRule {
    fn name(&self) -> &'static str {
        "probe-timeout-escalation"
    }

    fn evaluate(&self, finding: &Finding, context: &DiagnosisContext<'_>) -> Option<Adjustment> {
        if finding.rule_id != "origin-read-timeout-low" {
            return None;
        }
        let crate::core::finding::Facet::Origin(index) = finding.facet else {
            return None;
        };
        let origin = context.snapshot().origin(index)?;
        let probe = context.probe_for(&origin.id)?;
        if probe.outcome == ProbeOutcome::Timeout {
            return Some(Adjustment::RaiseLikelihood {
                likelihood: Likelihood::High,
                reason: "a reachability probe against this origin also timed out".to_string(),
            });
        }
        None
    }
}

/// Tie the WAF possibility to the concrete request the operator supplied.
struct WafPathAnnotationRule;

impl CorrelationRule for WafPathAnnotationRule {
    fn name(&self) -> &'static str {
        "waf-path-annotation"
    }

    fn evaluate(&self, finding: &Finding, context: &DiagnosisContext<'_>) -> Option<Adjustment> {
        if finding.rule_id != "waf-association" {
            return None;
        }
        let path = context.request_path()?;
        Some(Adjustment::Annotate {
            note: format!("check the WAF request log for blocked requests to {path}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::finding::Facet;
    use crate::snapshot::model::BucketPolicyInfo;
    use crate::symptom::SymptomParams;
    use crate::testkit::{snapshot_with, storage_origin, SnapshotOptions};

    fn access_finding() -> Finding {
        Finding::new(
            "access-control-missing",
            Facet::AccessControl,
            SymptomCategory::AccessDenied,
            Severity::Critical,
            Likelihood::High,
            "Object-storage origin has no access control",
            "test",
        )
    }

    fn exposure_finding() -> Finding {
        Finding::new(
            "origin-publicly-exposed",
            Facet::Security,
            SymptomCategory::Security,
            Severity::High,
            Likelihood::High,
            "Origin bucket is publicly readable",
            "test",
        )
    }

    #[test]
    fn compound_issue_collapses_to_one_critical() {
        let snapshot = snapshot_with(SnapshotOptions {
            origins: vec![storage_origin("origin-1", None)],
            bucket_policy: Some(FacetState::known(BucketPolicyInfo {
                public_read: true,
                trusted_access_control: None,
            })),
            ..Default::default()
        });
        let params = SymptomParams::new("E2EXAMPLE");
        let context = DiagnosisContext::new(&snapshot, &params, None);

        let correlated =
            Correlator::new().correlate(vec![access_finding(), exposure_finding()], &context);

        assert_eq!(correlated.len(), 1);
        let survivor = &correlated[0];
        assert_eq!(survivor.rule_id, "access-control-missing");
        assert_eq!(survivor.severity, Severity::Critical);
        assert!(!survivor.notes.is_empty());
    }

    #[test]
    fn root_object_finding_suppressed_for_access_denied_symptom() {
        let snapshot = snapshot_with(SnapshotOptions::default());
        let params = SymptomParams::new("E2EXAMPLE").with_error_code("403");
        let context = DiagnosisContext::new(&snapshot, &params, params.resolve_category().0);

        let finding = Finding::new(
            "default-root-object-missing",
            Facet::Distribution,
            SymptomCategory::NotFound,
            Severity::High,
            Likelihood::High,
            "No default root object configured",
            "test",
        );

        let correlated = Correlator::new().correlate(vec![finding], &context);
        assert!(correlated.is_empty());
    }

    #[test]
    fn dedup_keeps_one_finding_per_facet_and_rule() {
        let snapshot = snapshot_with(SnapshotOptions::default());
        let params = SymptomParams::new("E2EXAMPLE");
        let context = DiagnosisContext::new(&snapshot, &params, None);

        let low = exposure_finding().adjust_severity(Severity::Medium);
        let high = exposure_finding();
        let correlated = Correlator::new().correlate(vec![low, high], &context);

        assert_eq!(correlated.len(), 1);
        assert_eq!(correlated[0].severity, Severity::High);
    }
}
