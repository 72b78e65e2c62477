//! Not-found rule family: the request resolved and was authorized, but
//! nothing answered at the key the origin was asked for.

use crate::core::{DiagnosisContext, Evidence, Facet, Finding, Likelihood, Severity};
use crate::impl_rule;
use crate::symptom::SymptomCategory;
use anyhow::Result;

/// Root-path requests are rewritten to the default root object; with none
/// configured the origin is asked for the bare bucket root, which does not
/// exist as an object.
pub struct DefaultRootObjectRule;

impl DefaultRootObjectRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        if !context.is_root_request() {
            return Ok(None);
        }
        if context.snapshot().default_root_object.is_some() {
            return Ok(None);
        }

        let mut finding = Finding::new(
            "default-root-object-missing",
            Facet::Distribution,
            SymptomCategory::NotFound,
            Severity::High,
            Likelihood::High,
            "No default root object configured",
            "Requests for the distribution root are forwarded to the origin without an \
             object key. With no default root object configured, the origin has nothing \
             to serve and returns 404.",
        )
        .with_evidence(Evidence::new("default_root_object", "absent"));

        if let Some(path) = context.request_path() {
            finding = finding.with_evidence(
                Evidence::new("request.path", path.to_string()).matching_symptom(),
            );
        }

        Ok(Some(finding))
    }
}

impl_rule! {
    DefaultRootObjectRule,
    id: "default-root-object-missing",
    name: "Default Root Object Missing",
    categories: &[SymptomCategory::NotFound],
    severity: Severity::High,
    likelihood: Likelihood::High,
    description: "Detects root-path requests with no default root object to serve"
}

/// The supplied request path falls through every configured path pattern
/// and lands on the default behavior, which may route to a different
/// origin than the operator expects.
pub struct UncoveredPathRule;

impl UncoveredPathRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let Some(path) = context.request_path() else {
            return Ok(None);
        };
        if context.is_root_request() {
            return Ok(None);
        }

        let patterns: Vec<(usize, &str)> = context
            .snapshot()
            .pattern_behaviors()
            .filter_map(|(i, b)| b.path_pattern.as_deref().map(|p| (i, p)))
            .collect();

        if patterns.is_empty() {
            return Ok(None);
        }
        if patterns
            .iter()
            .any(|(i, _)| context.snapshot().behaviors[*i].matches_path(path))
        {
            return Ok(None);
        }

        let pattern_list = patterns
            .iter()
            .map(|(_, p)| format!("\"{p}\""))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Some(
            Finding::new(
                "behavior-path-uncovered",
                Facet::Behaviors,
                SymptomCategory::NotFound,
                Severity::Medium,
                Likelihood::Medium,
                "Request path matches no configured path pattern",
                "The request path is not covered by any configured cache behavior \
                 pattern and falls through to the default behavior. If the default \
                 behavior routes to a different origin or origin path, the object \
                 lookup misses.",
            )
            .with_evidence(Evidence::new("request.path", path.to_string()).matching_symptom())
            .with_evidence(Evidence::new("behaviors[].path_pattern", pattern_list)),
        ))
    }
}

impl_rule! {
    UncoveredPathRule,
    id: "behavior-path-uncovered",
    name: "Uncovered Request Path",
    categories: &[SymptomCategory::NotFound],
    severity: Severity::Medium,
    likelihood: Likelihood::Medium,
    description: "Detects request paths no cache behavior pattern covers"
}

/// A non-empty origin path is prepended to every forwarded request; the
/// object has to live under that prefix or every lookup misses.
pub struct OriginPathPrefixRule;

impl OriginPathPrefixRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let prefixed: Vec<_> = context
            .snapshot()
            .origins
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.origin_path.is_empty())
            .collect();

        let Some((index, origin)) = prefixed.first().copied() else {
            return Ok(None);
        };

        let mut finding = Finding::new(
            "origin-path-prefix",
            Facet::Origin(index),
            SymptomCategory::NotFound,
            Severity::Medium,
            Likelihood::Medium,
            "Origin path prefix shifts every object key",
            "The origin has a path prefix configured. Every forwarded request key is \
             prepended with it, so objects must live under that prefix or the origin \
             returns 404 for keys that look correct from the viewer side.",
        )
        .with_evidence(Evidence::new(
            format!("origins[{index}].origin_path"),
            origin.origin_path.clone(),
        ));

        if let Some(path) = context.request_path() {
            finding = finding.with_evidence(
                Evidence::new(
                    "request.path",
                    format!(
                        "{path} resolves to origin key {}{path}",
                        origin.origin_path
                    ),
                )
                .matching_symptom(),
            );
        }

        Ok(Some(finding))
    }
}

impl_rule! {
    OriginPathPrefixRule,
    id: "origin-path-prefix",
    name: "Origin Path Prefix Mismatch",
    categories: &[SymptomCategory::NotFound],
    severity: Severity::Medium,
    likelihood: Likelihood::Medium,
    description: "Flags origin path prefixes as a source of shifted object keys"
}
