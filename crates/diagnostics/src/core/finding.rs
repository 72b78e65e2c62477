use crate::core::{Likelihood, Severity};
use crate::symptom::SymptomCategory;
use serde::{Deserialize, Serialize};

/// The slice of the snapshot a finding concerns. Part of the dedup key:
/// after correlation at most one finding exists per `(Facet, rule id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Facet {
    Distribution,
    Origin(usize),
    CacheBehavior(usize),
    /// The behavior list as a whole, for findings about coverage or
    /// cache efficiency across behaviors.
    Behaviors,
    AccessControl,
    Security,
    Logging,
    Status,
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Distribution => write!(f, "distribution"),
            Self::Origin(i) => write!(f, "origins[{i}]"),
            Self::CacheBehavior(i) => write!(f, "behaviors[{i}]"),
            Self::Behaviors => write!(f, "behaviors"),
            Self::AccessControl => write!(f, "access-control"),
            Self::Security => write!(f, "security"),
            Self::Logging => write!(f, "logging"),
            Self::Status => write!(f, "status"),
        }
    }
}

/// One observed fact backing a finding, referencing the snapshot field it
/// was read from so the explanation is reconstructable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Snapshot reference, e.g. `origins[0].access_control`.
    pub path: String,

    /// The observed value, rendered for the report.
    pub observed: String,

    /// True when this evidence ties the finding to the operator-supplied
    /// request path or domain. Drives the ranker's specificity tie-break.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub matched_symptom: bool,
}

impl Evidence {
    pub fn new(path: impl Into<String>, observed: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            observed: observed.into(),
            matched_symptom: false,
        }
    }

    pub fn matching_symptom(mut self) -> Self {
        self.matched_symptom = true;
        self
    }
}

/// A single diagnosed issue. Immutable once emitted by a rule; the
/// correlator builds adjusted copies rather than editing in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,

    pub facet: Facet,

    pub category: SymptomCategory,

    pub severity: Severity,

    pub base_severity: Severity,

    pub likelihood: Likelihood,

    pub title: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,

    /// False when the backing facet was unreadable and the finding is a
    /// "cannot confirm" possibility rather than an observed violation.
    pub confirmed: bool,

    /// Correlator annotations, rendered alongside the description.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        facet: Facet,
        category: SymptomCategory,
        severity: Severity,
        likelihood: Likelihood,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            facet,
            category,
            severity,
            base_severity: severity,
            likelihood,
            title: title.into(),
            description: description.into(),
            evidence: Vec::new(),
            confirmed: true,
            notes: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    pub fn with_evidence_list(mut self, evidence: Vec<Evidence>) -> Self {
        self.evidence.extend(evidence);
        self
    }

    /// Mark the finding as an unconfirmed possibility. Used when the
    /// facet it reads was degraded to `Unknown`; such findings are capped
    /// at Medium likelihood.
    pub fn unconfirmed(mut self) -> Self {
        self.confirmed = false;
        if self.likelihood > Likelihood::Medium {
            self.likelihood = Likelihood::Medium;
        }
        self
    }

    pub fn adjust_severity(mut self, new_severity: Severity) -> Self {
        self.severity = new_severity;
        self
    }

    pub fn adjust_likelihood(mut self, new_likelihood: Likelihood) -> Self {
        self.likelihood = new_likelihood;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Count of evidence entries tied to the supplied request path or
    /// domain. A finding anchored to the operator's exact symptom outranks
    /// a generic facet finding at equal severity and likelihood.
    pub fn specificity(&self) -> usize {
        self.evidence.iter().filter(|e| e.matched_symptom).count()
    }

    /// Coarse ordering score used when the correlator has to pick one of
    /// two overlapping findings. Presentation order is decided by the
    /// ranker, not by this score.
    pub fn priority_score(&self) -> u32 {
        let severity_score = match self.severity {
            Severity::Critical => 1000,
            Severity::High => 100,
            Severity::Medium => 10,
            Severity::Low => 1,
        };

        let likelihood_multiplier = match self.likelihood {
            Likelihood::High => 10,
            Likelihood::Medium => 5,
            Likelihood::Low => 1,
        };

        severity_score * likelihood_multiplier
    }

    pub fn dedup_key(&self) -> (Facet, String) {
        (self.facet.clone(), self.rule_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity, likelihood: Likelihood) -> Finding {
        Finding::new(
            "test-rule",
            Facet::Distribution,
            SymptomCategory::General,
            severity,
            likelihood,
            "test",
            "test finding",
        )
    }

    #[test]
    fn priority_score_orders_severity_over_likelihood() {
        let critical_low = finding(Severity::Critical, Likelihood::Low);
        let high_high = finding(Severity::High, Likelihood::High);
        assert!(critical_low.priority_score() == high_high.priority_score());

        let critical_med = finding(Severity::Critical, Likelihood::Medium);
        assert!(critical_med.priority_score() > high_high.priority_score());
    }

    #[test]
    fn unconfirmed_caps_likelihood_at_medium() {
        let f = finding(Severity::High, Likelihood::High).unconfirmed();
        assert!(!f.confirmed);
        assert_eq!(f.likelihood, Likelihood::Medium);

        let f = finding(Severity::High, Likelihood::Low).unconfirmed();
        assert_eq!(f.likelihood, Likelihood::Low);
    }

    #[test]
    fn specificity_counts_symptom_matched_evidence() {
        let f = finding(Severity::Medium, Likelihood::Medium)
            .with_evidence(Evidence::new("behaviors[0]", "/*"))
            .with_evidence(Evidence::new("request.path", "/docs/a.html").matching_symptom());
        assert_eq!(f.specificity(), 1);
    }
}
