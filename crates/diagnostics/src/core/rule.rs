//! Rule trait and architecture for pluggable misconfiguration checks.
//!
//! ## Design: many small rules, one engine
//!
//! Rather than a monolithic decision function, each check is an
//! independent rule over the snapshot. This keeps every branch of the
//! diagnosis unit-testable in isolation, makes evaluation trivially
//! parallel (rules share no mutable state), and lets the catalog grow
//! without touching existing detectors.
//!
//! Rules must be order-independent: which findings are produced can never
//! depend on evaluation order. Presentation order is decided later by the
//! ranker, and cross-rule interactions live in the correlator, not in the
//! rules themselves.

use crate::core::context::DiagnosisContext;
use crate::core::finding::Finding;
use crate::core::severity::{Likelihood, Severity};
use crate::symptom::SymptomCategory;
use anyhow::Result;

pub trait Rule: Send + Sync {
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "No description provided"
    }

    /// Symptom categories this rule applies to. `General` rules run in
    /// every analysis.
    fn categories(&self) -> &'static [SymptomCategory];

    fn base_severity(&self) -> Severity;

    fn base_likelihood(&self) -> Likelihood;

    /// Pure evaluation: at most one finding per rule, with an evidence
    /// trail referencing the snapshot fields it read.
    fn evaluate(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>>;

    /// Whether this rule is in the active set for the resolved category.
    /// Full analysis (no error code) activates the entire catalog.
    fn applies_to(&self, category: Option<SymptomCategory>) -> bool {
        match category {
            None => true,
            Some(active) => {
                self.categories().contains(&active)
                    || self.categories().contains(&SymptomCategory::General)
            }
        }
    }
}

#[macro_export]
macro_rules! impl_rule {
    (
        $rule:ty,
        id: $id:expr,
        name: $name:expr,
        categories: $categories:expr,
        severity: $severity:expr,
        likelihood: $likelihood:expr
        $(, description: $description:expr)?
    ) => {
        impl $crate::core::Rule for $rule {
            fn id(&self) -> &'static str {
                $id
            }

            fn name(&self) -> &'static str {
                $name
            }

            fn categories(&self) -> &'static [$crate::symptom::SymptomCategory] {
                $categories
            }

            fn base_severity(&self) -> $crate::core::Severity {
                $severity
            }

            fn base_likelihood(&self) -> $crate::core::Likelihood {
                $likelihood
            }

            $(
                fn description(&self) -> &'static str {
                    $description
                }
            )?

            fn evaluate(
                &self,
                context: &$crate::core::DiagnosisContext<'_>,
            ) -> anyhow::Result<Option<$crate::core::Finding>> {
                self.evaluate_impl(context)
            }
        }
    };
}
