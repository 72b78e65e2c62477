//! Final presentation ordering.
//!
//! Severity desc, then likelihood desc, then evidence specificity desc (a
//! finding anchored to the operator's exact request path or domain
//! outranks a generic facet finding), then rule id asc. Rule ids are
//! unique per run after dedup, so the order is total and reproducible.

use crate::core::finding::Finding;
use std::cmp::Ordering;

pub fn rank(mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.sort_by(compare);
    findings
}

fn compare(a: &Finding, b: &Finding) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then(b.likelihood.cmp(&a.likelihood))
        .then(b.specificity().cmp(&a.specificity()))
        .then(a.rule_id.cmp(&b.rule_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::finding::{Evidence, Facet};
    use crate::core::severity::{Likelihood, Severity};
    use crate::symptom::SymptomCategory;

    fn finding(rule_id: &str, severity: Severity, likelihood: Likelihood) -> Finding {
        Finding::new(
            rule_id,
            Facet::Distribution,
            SymptomCategory::General,
            severity,
            likelihood,
            rule_id,
            "test",
        )
    }

    #[test]
    fn orders_by_severity_then_likelihood() {
        let ranked = rank(vec![
            finding("b", Severity::Medium, Likelihood::High),
            finding("a", Severity::Critical, Likelihood::Low),
            finding("c", Severity::Medium, Likelihood::Low),
        ]);
        let ids: Vec<_> = ranked.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn specificity_breaks_ties() {
        let generic = finding("aaa", Severity::Medium, Likelihood::Medium);
        let specific = finding("zzz", Severity::Medium, Likelihood::Medium)
            .with_evidence(Evidence::new("request.path", "/x").matching_symptom());

        let ranked = rank(vec![generic, specific]);
        assert_eq!(ranked[0].rule_id, "zzz");
        assert_eq!(ranked[1].rule_id, "aaa");
    }

    #[test]
    fn rule_id_is_the_final_tiebreak() {
        let ranked = rank(vec![
            finding("beta", Severity::Low, Likelihood::Low),
            finding("alpha", Severity::Low, Likelihood::Low),
        ]);
        assert_eq!(ranked[0].rule_id, "alpha");
    }

    #[test]
    fn ranking_is_idempotent() {
        let input = vec![
            finding("b", Severity::High, Likelihood::Medium),
            finding("a", Severity::High, Likelihood::High),
            finding("c", Severity::Low, Likelihood::Low),
        ];
        let once = rank(input.clone());
        let twice = rank(once.clone());
        let once_ids: Vec<_> = once.iter().map(|f| f.rule_id.clone()).collect();
        let twice_ids: Vec<_> = twice.iter().map(|f| f.rule_id.clone()).collect();
        assert_eq!(once_ids, twice_ids);
    }
}
