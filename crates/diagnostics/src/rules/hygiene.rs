//! Security and cache-hygiene rules that run in full analysis: exposure
//! that bypasses the front door, plaintext acceptance, and forwarding
//! configurations that quietly defeat caching.

use crate::core::{DiagnosisContext, Evidence, Facet, Finding, Likelihood, Severity};
use crate::impl_rule;
use crate::snapshot::model::{FacetState, ViewerProtocolPolicy};
use crate::symptom::SymptomCategory;
use anyhow::Result;

/// A bucket policy with public read makes the distribution decorative:
/// viewers can fetch objects directly, bypassing geo restriction, WAF,
/// and every cache behavior.
pub struct PublicExposureRule;

impl PublicExposureRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let bucket_policy = match &context.snapshot().security {
            FacetState::Known(security) => &security.bucket_policy,
            FacetState::Unknown { reason } => {
                return Ok(Some(
                    Finding::new(
                        "origin-publicly-exposed",
                        Facet::Security,
                        SymptomCategory::Security,
                        Severity::Medium,
                        Likelihood::Medium,
                        "Public exposure could not be ruled out",
                        "The security detail was unreadable, so whether the origin \
                         bucket is publicly readable cannot be confirmed.",
                    )
                    .with_evidence(Evidence::new("security", format!("unknown ({reason})")))
                    .unconfirmed(),
                ));
            }
        };

        match bucket_policy {
            FacetState::Unknown { reason } => Ok(Some(
                Finding::new(
                    "origin-publicly-exposed",
                    Facet::Security,
                    SymptomCategory::Security,
                    Severity::Medium,
                    Likelihood::Medium,
                    "Public exposure could not be ruled out",
                    "The origin bucket policy was unreadable, so public read access \
                     cannot be confirmed or ruled out.",
                )
                .with_evidence(Evidence::new(
                    "security.bucket_policy",
                    format!("unknown ({reason})"),
                ))
                .unconfirmed(),
            )),
            FacetState::Known(policy) if policy.public_read => Ok(Some(
                Finding::new(
                    "origin-publicly-exposed",
                    Facet::Security,
                    SymptomCategory::Security,
                    Severity::High,
                    Likelihood::High,
                    "Origin bucket is publicly readable",
                    "The origin bucket policy grants public read. Viewers can bypass \
                     the distribution entirely, which defeats access control, geo \
                     restriction, and WAF rules, and serves uncached traffic from the \
                     bucket.",
                )
                .with_evidence(Evidence::new(
                    "security.bucket_policy.public_read",
                    "true",
                )),
            )),
            FacetState::Known(_) => Ok(None),
        }
    }
}

impl_rule! {
    PublicExposureRule,
    id: "origin-publicly-exposed",
    name: "Origin Publicly Exposed",
    categories: &[SymptomCategory::Security],
    severity: Severity::High,
    likelihood: Likelihood::High,
    description: "Detects origin buckets readable without going through the front door"
}

/// Behaviors that accept plain HTTP hand session material to anyone on
/// the path.
pub struct PlaintextViewerRule;

impl PlaintextViewerRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let plaintext: Vec<usize> = context
            .snapshot()
            .behaviors
            .iter()
            .enumerate()
            .filter(|(_, b)| b.viewer_protocol_policy == ViewerProtocolPolicy::AllowAll)
            .map(|(i, _)| i)
            .collect();

        let Some(first) = plaintext.first().copied() else {
            return Ok(None);
        };

        let evidence = plaintext
            .iter()
            .map(|i| {
                let pattern = context.snapshot().behaviors[*i]
                    .path_pattern
                    .clone()
                    .unwrap_or_else(|| "(default)".to_string());
                Evidence::new(
                    format!("behaviors[{i}].viewer_protocol_policy"),
                    format!("allow-all on {pattern}"),
                )
            })
            .collect();

        Ok(Some(
            Finding::new(
                "viewer-protocol-plaintext",
                Facet::CacheBehavior(first),
                SymptomCategory::Security,
                Severity::Medium,
                Likelihood::High,
                "Behavior accepts plaintext HTTP from viewers",
                "At least one cache behavior allows plain HTTP. Responses, cookies, and \
                 any embedded credentials travel unencrypted between viewer and edge.",
            )
            .with_evidence_list(evidence),
        ))
    }
}

impl_rule! {
    PlaintextViewerRule,
    id: "viewer-protocol-plaintext",
    name: "Plaintext Viewer Protocol",
    categories: &[SymptomCategory::Security],
    severity: Severity::Medium,
    likelihood: Likelihood::High,
    description: "Detects cache behaviors that accept unencrypted viewer connections"
}

/// TLS floors below 1.2 admit protocol versions with known downgrade and
/// cipher weaknesses.
pub struct TlsPolicyRule;

const OUTDATED_TLS: &[&str] = &["SSLv3", "TLSv1", "TLSv1.0", "TLSv1.1"];

impl TlsPolicyRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let Some(security) = context.security() else {
            return Ok(None);
        };

        if !OUTDATED_TLS.contains(&security.minimum_tls.as_str()) {
            return Ok(None);
        }

        Ok(Some(
            Finding::new(
                "tls-policy-outdated",
                Facet::Security,
                SymptomCategory::Security,
                Severity::Medium,
                Likelihood::High,
                "Minimum TLS version is outdated",
                "The distribution accepts TLS versions with known weaknesses. Modern \
                 clients negotiate better, but the floor permits downgrade to protocols \
                 that should be retired.",
            )
            .with_evidence(Evidence::new(
                "security.minimum_tls",
                security.minimum_tls.clone(),
            )),
        ))
    }
}

impl_rule! {
    TlsPolicyRule,
    id: "tls-policy-outdated",
    name: "Outdated TLS Policy",
    categories: &[SymptomCategory::Security],
    severity: Severity::Medium,
    likelihood: Likelihood::High,
    description: "Detects minimum TLS versions below 1.2"
}

/// Compression off on GET-serving behaviors costs bandwidth and viewer
/// latency for free.
pub struct CompressionRule;

impl CompressionRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let uncompressed: Vec<usize> = context
            .snapshot()
            .behaviors
            .iter()
            .enumerate()
            .filter(|(_, b)| {
                !b.compression_enabled && b.allowed_methods.iter().any(|m| m == "GET")
            })
            .map(|(i, _)| i)
            .collect();

        if uncompressed.is_empty() {
            return Ok(None);
        }

        let evidence = uncompressed
            .iter()
            .map(|i| {
                let pattern = context.snapshot().behaviors[*i]
                    .path_pattern
                    .clone()
                    .unwrap_or_else(|| "(default)".to_string());
                Evidence::new(format!("behaviors[{i}].compression_enabled"), format!("false on {pattern}"))
            })
            .collect();

        Ok(Some(
            Finding::new(
                "compression-disabled",
                Facet::Behaviors,
                SymptomCategory::General,
                Severity::Low,
                Likelihood::Medium,
                "Compression disabled on content-serving behaviors",
                "Compressible responses are served uncompressed. Enabling compression \
                 typically cuts transfer sizes substantially for text-like content at \
                 no configuration risk.",
            )
            .with_evidence_list(evidence),
        ))
    }
}

impl_rule! {
    CompressionRule,
    id: "compression-disabled",
    name: "Compression Disabled",
    categories: &[SymptomCategory::General],
    severity: Severity::Low,
    likelihood: Likelihood::Medium,
    description: "Detects content-serving behaviors with compression off"
}

/// Forwarding all headers or cookies makes nearly every request a unique
/// cache key; the distribution degrades into a proxy.
pub struct ForwardingRule;

impl ForwardingRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let permissive: Vec<(usize, &'static str)> = context
            .snapshot()
            .behaviors
            .iter()
            .enumerate()
            .filter_map(|(i, b)| {
                if b.forwarded.headers.forwards_everything() {
                    Some((i, "all headers"))
                } else if b.forwarded.cookies.forwards_everything() {
                    Some((i, "all cookies"))
                } else {
                    None
                }
            })
            .collect();

        if permissive.is_empty() {
            return Ok(None);
        }

        let evidence = permissive
            .iter()
            .map(|(i, what)| {
                Evidence::new(format!("behaviors[{i}].forwarded"), what.to_string())
            })
            .collect();

        Ok(Some(
            Finding::new(
                "forwarding-defeats-caching",
                Facet::Behaviors,
                SymptomCategory::General,
                Severity::Low,
                Likelihood::High,
                "Forwarded values fragment the cache key",
                "At least one behavior forwards all headers or all cookies to the \
                 origin. Each distinct combination becomes its own cache entry, so the \
                 hit ratio collapses and most requests pay full origin latency.",
            )
            .with_evidence_list(evidence),
        ))
    }
}

impl_rule! {
    ForwardingRule,
    id: "forwarding-defeats-caching",
    name: "Permissive Forwarded Values",
    categories: &[SymptomCategory::General],
    severity: Severity::Low,
    likelihood: Likelihood::High,
    description: "Detects forwarding configurations that defeat caching"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rule;
    use crate::snapshot::model::BucketPolicyInfo;
    use crate::symptom::SymptomParams;
    use crate::testkit::{snapshot_with, SnapshotOptions};

    #[test]
    fn public_bucket_policy_is_a_confirmed_finding() {
        let snapshot = snapshot_with(SnapshotOptions {
            bucket_policy: Some(FacetState::known(BucketPolicyInfo {
                public_read: true,
                trusted_access_control: None,
            })),
            ..Default::default()
        });
        let params = SymptomParams::new("E2EXAMPLE");
        let context = DiagnosisContext::new(&snapshot, &params, None);

        let finding = PublicExposureRule
            .evaluate(&context)
            .unwrap()
            .expect("should fire");
        assert!(finding.confirmed);
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn unreadable_security_degrades_to_unconfirmed() {
        let snapshot = snapshot_with(SnapshotOptions {
            security: Some(FacetState::unknown("permission denied")),
            ..Default::default()
        });
        let params = SymptomParams::new("E2EXAMPLE");
        let context = DiagnosisContext::new(&snapshot, &params, None);

        let finding = PublicExposureRule
            .evaluate(&context)
            .unwrap()
            .expect("should fire unconfirmed");
        assert!(!finding.confirmed);
        assert_eq!(finding.likelihood, Likelihood::Medium);
    }
}
