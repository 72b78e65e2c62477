//! Access-denied rule family.
//!
//! The decision tree for a 403 symptom: origin kind → access-control
//! presence → bucket-policy compatibility, with geo restriction and WAF
//! association as independent branches.

use crate::core::{DiagnosisContext, Evidence, Facet, Finding, Likelihood, Severity};
use crate::impl_rule;
use crate::snapshot::model::{FacetState, OriginKind};
use crate::symptom::SymptomCategory;
use anyhow::Result;

/// Object-storage origin reachable only through the front door needs an
/// access-control association; without one every request the distribution
/// forwards is rejected by the bucket.
pub struct AccessControlMissingRule;

impl AccessControlMissingRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let mut missing = Vec::new();
        let mut unreadable = Vec::new();

        for (i, origin) in context.snapshot().origins.iter().enumerate() {
            if origin.kind != OriginKind::ObjectStorage {
                continue;
            }
            match &origin.access_control {
                FacetState::Known(None) => missing.push((i, origin)),
                FacetState::Unknown { reason } => unreadable.push((i, reason.clone())),
                FacetState::Known(Some(_)) => {}
            }
        }

        if !missing.is_empty() {
            let evidence = missing
                .iter()
                .map(|(i, origin)| {
                    Evidence::new(
                        format!("origins[{i}].access_control"),
                        format!("absent (origin {} at {})", origin.id, origin.domain),
                    )
                })
                .collect();

            let finding = Finding::new(
                "access-control-missing",
                Facet::AccessControl,
                SymptomCategory::AccessDenied,
                Severity::Critical,
                Likelihood::High,
                "Object-storage origin has no access control",
                "The distribution forwards requests to an object-storage origin that has \
                 no access-control association. The bucket rejects requests that do not \
                 carry a trusted signature, so every cache miss returns 403.",
            )
            .with_evidence_list(evidence);

            return Ok(Some(finding));
        }

        if let Some((i, reason)) = unreadable.into_iter().next() {
            let finding = Finding::new(
                "access-control-missing",
                Facet::AccessControl,
                SymptomCategory::AccessDenied,
                Severity::High,
                Likelihood::Medium,
                "Access-control configuration could not be read",
                "The origin detail record was unreadable, so a missing access-control \
                 association cannot be ruled out as the cause of the 403 responses.",
            )
            .with_evidence(Evidence::new(
                format!("origins[{i}].access_control"),
                format!("unknown ({reason})"),
            ))
            .unconfirmed();

            return Ok(Some(finding));
        }

        Ok(None)
    }
}

impl_rule! {
    AccessControlMissingRule,
    id: "access-control-missing",
    name: "Origin Access Control Missing",
    categories: &[SymptomCategory::AccessDenied],
    severity: Severity::Critical,
    likelihood: Likelihood::High,
    description: "Detects object-storage origins with no access-control association"
}

/// Access control exists but the bucket policy was never updated to trust
/// it. The two halves of the handshake have to agree.
pub struct AccessControlUnattachedRule;

impl AccessControlUnattachedRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let attached: Vec<_> = context
            .snapshot()
            .origins
            .iter()
            .enumerate()
            .filter_map(|(i, origin)| match &origin.access_control {
                FacetState::Known(Some(reference)) => Some((i, origin, reference.clone())),
                _ => None,
            })
            .collect();

        let Some((i, _origin, reference)) = attached.into_iter().next() else {
            return Ok(None);
        };

        let Some(security) = context.security() else {
            return Ok(Some(
                Finding::new(
                    "access-control-unattached",
                    Facet::AccessControl,
                    SymptomCategory::AccessDenied,
                    Severity::High,
                    Likelihood::Medium,
                    "Bucket policy trust could not be verified",
                    "An access control is configured, but the security detail was \
                     unreadable, so whether the bucket policy trusts it cannot be \
                     confirmed.",
                )
                .with_evidence(Evidence::new(
                    format!("origins[{i}].access_control"),
                    reference.0.clone(),
                ))
                .unconfirmed(),
            ));
        };

        match &security.bucket_policy {
            FacetState::Unknown { reason } => Ok(Some(
                Finding::new(
                    "access-control-unattached",
                    Facet::AccessControl,
                    SymptomCategory::AccessDenied,
                    Severity::High,
                    Likelihood::Medium,
                    "Bucket policy trust could not be verified",
                    "An access control is configured, but the bucket policy was \
                     unreadable, so whether it trusts the access control cannot be \
                     confirmed.",
                )
                .with_evidence(Evidence::new(
                    "security.bucket_policy",
                    format!("unknown ({reason})"),
                ))
                .unconfirmed(),
            )),
            FacetState::Known(policy) => {
                if policy.trusted_access_control.as_deref() == Some(reference.0.as_str()) {
                    return Ok(None);
                }
                Ok(Some(
                    Finding::new(
                        "access-control-unattached",
                        Facet::AccessControl,
                        SymptomCategory::AccessDenied,
                        Severity::High,
                        Likelihood::High,
                        "Bucket policy does not trust the access control",
                        "An access control is associated with the origin, but the bucket \
                         policy does not grant it read access. Requests signed by the \
                         distribution are still rejected by the bucket.",
                    )
                    .with_evidence(Evidence::new(
                        format!("origins[{i}].access_control"),
                        reference.0.clone(),
                    ))
                    .with_evidence(Evidence::new(
                        "security.bucket_policy.trusted_access_control",
                        policy
                            .trusted_access_control
                            .clone()
                            .unwrap_or_else(|| "absent".to_string()),
                    )),
                ))
            }
        }
    }
}

impl_rule! {
    AccessControlUnattachedRule,
    id: "access-control-unattached",
    name: "Bucket Policy Not Updated For Access Control",
    categories: &[SymptomCategory::AccessDenied],
    severity: Severity::High,
    likelihood: Likelihood::High,
    description: "Detects access controls the origin bucket policy does not trust"
}

/// Geo restriction can only be reported as a possibility: the requester's
/// region is not part of the symptom input, so the rule lists the active
/// restriction and never claims a confirmed block.
pub struct GeoRestrictionRule;

impl GeoRestrictionRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let Some(security) = context.security() else {
            return Ok(None);
        };
        if !security.geo_restriction.is_active() {
            return Ok(None);
        }

        let observed = match &security.geo_restriction {
            crate::snapshot::model::GeoRestriction::Allowlist(countries) => {
                format!("allowlist: {}", countries.join(", "))
            }
            crate::snapshot::model::GeoRestriction::Denylist(countries) => {
                format!("denylist: {}", countries.join(", "))
            }
            crate::snapshot::model::GeoRestriction::None => unreachable!(),
        };

        Ok(Some(
            Finding::new(
                "geo-restriction-active",
                Facet::Security,
                SymptomCategory::AccessDenied,
                Severity::Medium,
                Likelihood::Medium,
                "Geo restriction may exclude the requester's region",
                "A geo restriction is active on the distribution. Viewers in excluded \
                 regions receive 403 for every request regardless of the rest of the \
                 configuration.",
            )
            .with_evidence(Evidence::new("security.geo_restriction", observed)),
        ))
    }
}

impl_rule! {
    GeoRestrictionRule,
    id: "geo-restriction-active",
    name: "Geo Restriction Active",
    categories: &[SymptomCategory::AccessDenied],
    severity: Severity::Medium,
    likelihood: Likelihood::Medium,
    description: "Reports active geo restrictions as a possible 403 source"
}

/// An attached WAF evaluates every request before the cache; a blocking
/// rule shows up as 403 with no origin involvement at all.
pub struct WafAssociationRule;

impl WafAssociationRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let Some(security) = context.security() else {
            return Ok(None);
        };
        if !security.waf_enabled {
            return Ok(None);
        }

        let mut finding = Finding::new(
            "waf-association",
            Facet::Security,
            SymptomCategory::AccessDenied,
            Severity::Medium,
            Likelihood::Medium,
            "Attached WAF may be blocking the request",
            "A web application firewall is associated with the distribution. A rule \
             matching the request path or method blocks the request before it reaches \
             any origin.",
        )
        .with_evidence(Evidence::new("security.waf_enabled", "true"));

        if let Some(path) = context.request_path() {
            finding = finding.with_evidence(
                Evidence::new("request.path", path.to_string()).matching_symptom(),
            );
        }
        if let Some(domain) = context.request_domain() {
            finding = finding.with_evidence(
                Evidence::new("request.domain", domain.to_string()).matching_symptom(),
            );
        }

        Ok(Some(finding))
    }
}

impl_rule! {
    WafAssociationRule,
    id: "waf-association",
    name: "WAF Association",
    categories: &[SymptomCategory::AccessDenied],
    severity: Severity::Medium,
    likelihood: Likelihood::Medium,
    description: "Reports an attached WAF as a possible request blocker"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rule;
    use crate::snapshot::model::BucketPolicyInfo;
    use crate::symptom::SymptomParams;
    use crate::testkit::{snapshot_with, storage_origin, SnapshotOptions};

    #[test]
    fn missing_access_control_fires_on_bare_storage_origin() {
        let snapshot = snapshot_with(SnapshotOptions {
            origins: vec![storage_origin("origin-1", None)],
            ..Default::default()
        });
        let params = SymptomParams::new("E2EXAMPLE").with_error_code("403");
        let context = DiagnosisContext::new(&snapshot, &params, params.resolve_category().0);

        let finding = AccessControlMissingRule
            .evaluate(&context)
            .unwrap()
            .expect("should fire");
        assert_eq!(finding.severity, Severity::Critical);
        assert!(finding.confirmed);
    }

    #[test]
    fn unreadable_origin_detail_degrades_to_unconfirmed() {
        let mut origin = storage_origin("origin-1", None);
        origin.access_control = FacetState::unknown("permission denied");
        let snapshot = snapshot_with(SnapshotOptions {
            origins: vec![origin],
            ..Default::default()
        });
        let params = SymptomParams::new("E2EXAMPLE").with_error_code("403");
        let context = DiagnosisContext::new(&snapshot, &params, params.resolve_category().0);

        let finding = AccessControlMissingRule
            .evaluate(&context)
            .unwrap()
            .expect("should fire unconfirmed");
        assert!(!finding.confirmed);
        assert_eq!(finding.likelihood, Likelihood::Medium);
    }

    #[test]
    fn unattached_access_control_checks_bucket_policy_trust() {
        let snapshot = snapshot_with(SnapshotOptions {
            origins: vec![storage_origin("origin-1", Some("oac-123"))],
            bucket_policy: Some(FacetState::known(BucketPolicyInfo {
                public_read: false,
                trusted_access_control: None,
            })),
            ..Default::default()
        });
        let params = SymptomParams::new("E2EXAMPLE").with_error_code("403");
        let context = DiagnosisContext::new(&snapshot, &params, params.resolve_category().0);

        let finding = AccessControlUnattachedRule
            .evaluate(&context)
            .unwrap()
            .expect("should fire");
        assert!(finding.confirmed);
        assert_eq!(finding.likelihood, Likelihood::High);

        let trusted = snapshot_with(SnapshotOptions {
            origins: vec![storage_origin("origin-1", Some("oac-123"))],
            bucket_policy: Some(FacetState::known(BucketPolicyInfo {
                public_read: false,
                trusted_access_control: Some("oac-123".to_string()),
            })),
            ..Default::default()
        });
        let context = DiagnosisContext::new(&trusted, &params, params.resolve_category().0);
        assert!(AccessControlUnattachedRule
            .evaluate(&context)
            .unwrap()
            .is_none());
    }
}
