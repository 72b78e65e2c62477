//! Server-error rule family: timeouts, protocol mismatches, and origin
//! reachability. Reachability findings come from active-validation probes
//! recorded on the snapshot; a failed probe lowers confidence, it never
//! fails the run.

use crate::core::{DiagnosisContext, Evidence, Facet, Finding, Likelihood, Severity};
use crate::impl_rule;
use crate::snapshot::model::{OriginKind, OriginProtocolPolicy, ProbeOutcome};
use crate::symptom::SymptomCategory;
use anyhow::Result;
use std::time::Duration;

/// Read timeouts at or below this are treated as untuned. The service
/// default is 30s; origins that legitimately need more must be raised
/// explicitly, and a 504 under the default is the classic signature.
const READ_TIMEOUT_FLOOR: Duration = Duration::from_secs(30);

pub struct ReadTimeoutRule;

impl ReadTimeoutRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let slow: Vec<_> = context
            .snapshot()
            .origins
            .iter()
            .enumerate()
            .filter(|(_, o)| {
                matches!(o.kind, OriginKind::CustomHttp | OriginKind::LoadBalancer)
                    && o.read_timeout <= READ_TIMEOUT_FLOOR
            })
            .collect();

        let Some((index, origin)) = slow.first().copied() else {
            return Ok(None);
        };

        // Under a 5xx symptom the untuned timeout is the prime suspect;
        // in a general sweep it is only a possibility.
        let likelihood = if context.category() == Some(SymptomCategory::ServerError) {
            Likelihood::High
        } else {
            Likelihood::Medium
        };

        let mut finding = Finding::new(
            "origin-read-timeout-low",
            Facet::Origin(index),
            SymptomCategory::ServerError,
            Severity::High,
            likelihood,
            "Origin read timeout is at the untuned floor",
            "The origin's read timeout has never been raised above the service default. \
             Backends that take longer than the timeout to produce a response cause the \
             distribution to give up and return 504 even though the backend would have \
             answered.",
        )
        .with_evidence(Evidence::new(
            format!("origins[{index}].read_timeout"),
            format!("{}s", origin.read_timeout.as_secs()),
        ));

        if let Some(probe) = context.probe_for(&origin.id) {
            if probe.outcome == ProbeOutcome::Timeout {
                finding = finding.with_evidence(Evidence::new(
                    format!("probes[{}]", origin.id),
                    "reachability probe timed out",
                ));
            }
        }

        Ok(Some(finding))
    }
}

impl_rule! {
    ReadTimeoutRule,
    id: "origin-read-timeout-low",
    name: "Origin Read Timeout Low",
    categories: &[SymptomCategory::ServerError],
    severity: Severity::High,
    likelihood: Likelihood::High,
    description: "Detects custom origins still running the default read timeout"
}

/// Static-website storage endpoints terminate plain HTTP only. An
/// https-only origin policy against one fails the TLS handshake on every
/// cache miss and surfaces as 502.
pub struct ProtocolMismatchRule;

impl ProtocolMismatchRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        let mismatched: Vec<_> = context
            .snapshot()
            .origins
            .iter()
            .enumerate()
            .filter(|(_, o)| {
                o.protocol_policy == OriginProtocolPolicy::HttpsOnly && o.is_website_endpoint()
            })
            .collect();

        let Some((index, origin)) = mismatched.first().copied() else {
            return Ok(None);
        };

        let mut finding = Finding::new(
            "origin-protocol-mismatch",
            Facet::Origin(index),
            SymptomCategory::ServerError,
            Severity::High,
            Likelihood::High,
            "HTTPS required from an HTTP-only origin endpoint",
            "The origin protocol policy requires HTTPS, but the origin is a \
             static-website endpoint that only serves plain HTTP. Every connection \
             attempt fails before a request is sent.",
        )
        .with_evidence(Evidence::new(
            format!("origins[{index}].protocol_policy"),
            "https-only",
        ))
        .with_evidence(Evidence::new(
            format!("origins[{index}].domain"),
            origin.domain.clone(),
        ));

        if let Some(probe) = context.probe_for(&origin.id) {
            if let ProbeOutcome::Unreachable { detail } = &probe.outcome {
                finding = finding.with_evidence(Evidence::new(
                    format!("probes[{}]", origin.id),
                    format!("unreachable: {detail}"),
                ));
            }
        }

        Ok(Some(finding))
    }
}

impl_rule! {
    ProtocolMismatchRule,
    id: "origin-protocol-mismatch",
    name: "Origin Protocol Mismatch",
    categories: &[SymptomCategory::ServerError],
    severity: Severity::High,
    likelihood: Likelihood::High,
    description: "Detects https-only origin policies against HTTP-only endpoints"
}

/// Reads the active-validation probe records. Unreachable is a confirmed
/// finding; a probe timeout or probe failure is reported as an
/// unconfirmed possibility under a server-error symptom.
pub struct OriginUnreachableRule;

impl OriginUnreachableRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        for (index, origin) in context.snapshot().origins.iter().enumerate() {
            let Some(probe) = context.probe_for(&origin.id) else {
                continue;
            };

            match &probe.outcome {
                ProbeOutcome::Reachable => {}
                ProbeOutcome::Unreachable { detail } => {
                    return Ok(Some(
                        Finding::new(
                            "origin-unreachable",
                            Facet::Origin(index),
                            SymptomCategory::ServerError,
                            Severity::High,
                            Likelihood::High,
                            "Origin is unreachable",
                            "A live reachability check against the origin failed. Cache \
                             misses cannot be served until the origin answers again.",
                        )
                        .with_evidence(Evidence::new(
                            format!("probes[{}]", origin.id),
                            format!("unreachable: {detail}"),
                        )),
                    ));
                }
                ProbeOutcome::Timeout => {
                    return Ok(Some(
                        Finding::new(
                            "origin-unreachable",
                            Facet::Origin(index),
                            SymptomCategory::ServerError,
                            Severity::High,
                            Likelihood::Medium,
                            "Origin did not answer the reachability probe in time",
                            "The live reachability check timed out. The origin may be \
                             overloaded or dropping connections, which matches the \
                             server-error symptom.",
                        )
                        .with_evidence(Evidence::new(
                            format!("probes[{}]", origin.id),
                            "probe timed out",
                        ))
                        .unconfirmed(),
                    ));
                }
                ProbeOutcome::Unavailable { reason } => {
                    // No signal either way; only worth reporting when the
                    // symptom already points at the origin.
                    if context.category() == Some(SymptomCategory::ServerError) {
                        return Ok(Some(
                            Finding::new(
                                "origin-unreachable",
                                Facet::Origin(index),
                                SymptomCategory::ServerError,
                                Severity::Medium,
                                Likelihood::Medium,
                                "Origin reachability could not be verified",
                                "The reachability check itself failed, so an unreachable \
                                 origin cannot be ruled out as the cause of the server \
                                 errors.",
                            )
                            .with_evidence(Evidence::new(
                                format!("probes[{}]", origin.id),
                                format!("probe unavailable: {reason}"),
                            ))
                            .unconfirmed(),
                        ));
                    }
                }
            }
        }

        Ok(None)
    }
}

impl_rule! {
    OriginUnreachableRule,
    id: "origin-unreachable",
    name: "Origin Unreachable",
    categories: &[SymptomCategory::ServerError],
    severity: Severity::High,
    likelihood: Likelihood::High,
    description: "Reports failed origin reachability probes"
}

/// Configuration still propagating (or the distribution disabled outright)
/// explains stale or failing behavior regardless of the symptom.
pub struct NotDeployedRule;

impl NotDeployedRule {
    fn evaluate_impl(&self, context: &DiagnosisContext<'_>) -> Result<Option<Finding>> {
        use crate::snapshot::model::DeploymentStatus;

        match context.snapshot().status {
            DeploymentStatus::Deployed | DeploymentStatus::Unknown => Ok(None),
            DeploymentStatus::InProgress => Ok(Some(
                Finding::new(
                    "distribution-not-deployed",
                    Facet::Status,
                    SymptomCategory::General,
                    Severity::Medium,
                    Likelihood::Medium,
                    "Configuration changes are still propagating",
                    "The distribution is still deploying. Edge locations may be serving \
                     the previous configuration, so recent fixes are not visible yet.",
                )
                .with_evidence(Evidence::new("status", "in-progress")),
            )),
            DeploymentStatus::Disabled => Ok(Some(
                Finding::new(
                    "distribution-not-deployed",
                    Facet::Status,
                    SymptomCategory::General,
                    Severity::High,
                    Likelihood::High,
                    "Distribution is disabled",
                    "The distribution is disabled and serves no traffic at all.",
                )
                .with_evidence(Evidence::new("status", "disabled")),
            )),
        }
    }
}

impl_rule! {
    NotDeployedRule,
    id: "distribution-not-deployed",
    name: "Distribution Not Deployed",
    categories: &[SymptomCategory::General],
    severity: Severity::Medium,
    likelihood: Likelihood::Medium,
    description: "Detects distributions that are disabled or still propagating"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rule;
    use crate::snapshot::model::ProbeRecord;
    use crate::symptom::SymptomParams;
    use crate::testkit::{custom_origin, snapshot_with, SnapshotOptions};

    #[test]
    fn default_read_timeout_is_flagged() {
        let snapshot = snapshot_with(SnapshotOptions {
            origins: vec![custom_origin("origin-1", 30)],
            ..Default::default()
        });
        let params = SymptomParams::new("E2EXAMPLE").with_error_code("504");
        let context = DiagnosisContext::new(&snapshot, &params, params.resolve_category().0);

        let finding = ReadTimeoutRule
            .evaluate(&context)
            .unwrap()
            .expect("should fire");
        assert_eq!(finding.severity, Severity::High);

        let tuned = snapshot_with(SnapshotOptions {
            origins: vec![custom_origin("origin-1", 60)],
            ..Default::default()
        });
        let context = DiagnosisContext::new(&tuned, &params, params.resolve_category().0);
        assert!(ReadTimeoutRule.evaluate(&context).unwrap().is_none());
    }

    #[test]
    fn probe_timeout_degrades_reachability_to_unconfirmed() {
        let snapshot = snapshot_with(SnapshotOptions {
            origins: vec![custom_origin("origin-1", 60)],
            probes: vec![ProbeRecord {
                origin_id: "origin-1".to_string(),
                outcome: ProbeOutcome::Timeout,
            }],
            ..Default::default()
        });
        let params = SymptomParams::new("E2EXAMPLE").with_error_code("502");
        let context = DiagnosisContext::new(&snapshot, &params, params.resolve_category().0);

        let finding = OriginUnreachableRule
            .evaluate(&context)
            .unwrap()
            .expect("should fire");
        assert!(!finding.confirmed);
        assert_eq!(finding.likelihood, Likelihood::Medium);
    }
}
