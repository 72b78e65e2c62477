//! Raw records in, canonical snapshot out.
//!
//! Sub-record fetches (origin detail, security detail, logging detail)
//! have no ordering dependency and run concurrently, each behind its own
//! timeout and bounded retry. A facet that stays unreadable degrades to
//! `Unknown`; evaluation never starts on silently partial data, and only
//! identifier resolution is fatal. Dropping the returned future cancels
//! every in-flight call.

use crate::core::context::DiagnosticsConfig;
use crate::error::{DiagnosticError, SourceError};
use crate::snapshot::model::*;
use crate::snapshot::raw::*;
use crate::source::{ConfigSource, SourceResult};
use crate::symptom::SymptomParams;
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SnapshotNormalizer<'a> {
    source: &'a dyn ConfigSource,
    config: DiagnosticsConfig,
}

impl<'a> SnapshotNormalizer<'a> {
    pub fn new(source: &'a dyn ConfigSource, config: DiagnosticsConfig) -> Self {
        Self { source, config }
    }

    pub async fn build(
        &self,
        params: &SymptomParams,
    ) -> Result<DistributionSnapshot, DiagnosticError> {
        params
            .validate_identifier()
            .map_err(|reason| DiagnosticError::InvalidIdentifier {
                id: params.distribution_id.clone(),
                reason,
            })?;

        let id = params.distribution_id.as_str();
        let raw = match self
            .fetch_with_retry("distribution", || self.source.get_distribution(id))
            .await
        {
            Ok(raw) => raw,
            Err(SourceError::NotFound(_)) => {
                return Err(DiagnosticError::InvalidIdentifier {
                    id: id.to_string(),
                    reason: "identifier does not resolve".to_string(),
                });
            }
            Err(err) => return Err(DiagnosticError::Source(err)),
        };

        debug!(distribution = %raw.id, origins = raw.origins.len(), "fetched distribution record");

        let origin_futures = join_all(raw.origins.iter().map(|origin| async move {
            self.fetch_with_retry("origin detail", || {
                self.source.get_origin_detail(&origin.id)
            })
            .await
        }));

        let security_future = self.fetch_with_retry("security detail", || {
            self.source.get_security_detail(id)
        });

        let logging_future = self.fetch_with_retry("logging detail", || {
            self.source.get_logging_detail(id)
        });

        let (origin_details, security_detail, logging_detail) =
            tokio::join!(origin_futures, security_future, logging_future);

        let origins: Vec<OriginConfig> = raw
            .origins
            .iter()
            .zip(origin_details)
            .map(|(reference, detail)| normalize_origin(reference, detail))
            .collect();

        let security = match security_detail {
            Ok(detail) => FacetState::known(normalize_security(detail)),
            Err(err) => {
                warn!(%err, "security detail unreadable, degrading facet");
                FacetState::unknown(err.to_string())
            }
        };

        let logging = match logging_detail {
            Ok(detail) => FacetState::known(LoggingConfig {
                enabled: detail.enabled,
                bucket: detail.bucket,
            }),
            Err(err) => {
                warn!(%err, "logging detail unreadable, degrading facet");
                FacetState::unknown(err.to_string())
            }
        };

        let probes = if params.active_validation {
            self.run_probes(&origins).await
        } else {
            Vec::new()
        };

        Ok(DistributionSnapshot {
            id: raw.id,
            domain_name: raw.domain_name,
            status: parse_status(raw.status.as_deref()),
            last_modified: raw.last_modified,
            default_root_object: raw.default_root_object,
            origins,
            behaviors: normalize_behaviors(raw.default_behavior, raw.behaviors),
            security,
            logging,
            probes,
        })
    }

    /// One probe per origin, each behind its own short timeout. A probe
    /// failure is recorded as `Unavailable` and lowers confidence of the
    /// affected rule only.
    async fn run_probes(&self, origins: &[OriginConfig]) -> Vec<ProbeRecord> {
        join_all(origins.iter().map(|origin| async move {
            let outcome = match tokio::time::timeout(
                self.config.probe_timeout,
                self.source.probe_reachability(&origin.domain),
            )
            .await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => {
                    warn!(origin = %origin.id, %err, "reachability probe failed");
                    ProbeOutcome::Unavailable {
                        reason: err.to_string(),
                    }
                }
                Err(_) => ProbeOutcome::Timeout,
            };
            ProbeRecord {
                origin_id: origin.id.clone(),
                outcome,
            }
        }))
        .await
    }

    async fn fetch_with_retry<T, F, Fut>(&self, what: &str, mut call: F) -> SourceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SourceResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match tokio::time::timeout(self.config.fetch_timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) if err.is_retryable() && attempt < self.config.fetch_retries => {
                    warn!(%what, attempt, %err, "transient source failure, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Ok(Err(err)) => return Err(err),
                Err(_) if attempt < self.config.fetch_retries => {
                    warn!(%what, attempt, "source call timed out, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(_) => {
                    return Err(SourceError::Transient(format!(
                        "{what} timed out after {attempt} attempts"
                    )))
                }
            }
        }
    }
}

fn normalize_origin(
    reference: &RawOriginRef,
    detail: SourceResult<RawOriginDetail>,
) -> OriginConfig {
    match detail {
        Ok(detail) => OriginConfig {
            id: reference.id.clone(),
            kind: parse_kind(detail.kind.as_deref(), &reference.domain),
            domain: reference.domain.clone(),
            origin_path: detail.origin_path.unwrap_or_default(),
            access_control: FacetState::known(
                detail.access_control_ref.map(AccessControlRef),
            ),
            protocol_policy: parse_protocol_policy(detail.protocol_policy.as_deref()),
            connect_timeout: detail
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            read_timeout: detail
                .read_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_READ_TIMEOUT),
        },
        Err(err) => {
            warn!(origin = %reference.id, %err, "origin detail unreadable, degrading facet");
            OriginConfig {
                id: reference.id.clone(),
                kind: parse_kind(None, &reference.domain),
                domain: reference.domain.clone(),
                origin_path: String::new(),
                access_control: FacetState::unknown(err.to_string()),
                protocol_policy: OriginProtocolPolicy::MatchViewer,
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
                read_timeout: DEFAULT_READ_TIMEOUT,
            }
        }
    }
}

fn parse_kind(kind: Option<&str>, domain: &str) -> OriginKind {
    match kind {
        Some("object-storage") | Some("storage") | Some("s3") => OriginKind::ObjectStorage,
        Some("load-balancer") | Some("elb") | Some("alb") => OriginKind::LoadBalancer,
        Some(_) => OriginKind::CustomHttp,
        // Undeclared kind: storage endpoints are recognizable by domain.
        None if domain.contains(".storage.") || domain.contains("s3") => {
            OriginKind::ObjectStorage
        }
        None => OriginKind::CustomHttp,
    }
}

fn parse_protocol_policy(policy: Option<&str>) -> OriginProtocolPolicy {
    match policy {
        Some("http-only") => OriginProtocolPolicy::HttpOnly,
        Some("https-only") => OriginProtocolPolicy::HttpsOnly,
        _ => OriginProtocolPolicy::MatchViewer,
    }
}

fn parse_viewer_policy(policy: Option<&str>) -> ViewerProtocolPolicy {
    match policy {
        Some("redirect-to-https") => ViewerProtocolPolicy::RedirectToHttps,
        Some("https-only") => ViewerProtocolPolicy::HttpsOnly,
        // Service default.
        _ => ViewerProtocolPolicy::AllowAll,
    }
}

fn parse_status(status: Option<&str>) -> DeploymentStatus {
    match status.map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("deployed") => DeploymentStatus::Deployed,
        Some("inprogress") | Some("in-progress") => DeploymentStatus::InProgress,
        Some("disabled") => DeploymentStatus::Disabled,
        _ => DeploymentStatus::Unknown,
    }
}

fn normalize_behavior(raw: RawCacheBehavior, is_default: bool) -> CacheBehavior {
    let cookies = match raw.forward_cookies.as_deref() {
        Some("all") => Forwarding::All,
        Some("selective") => Forwarding::Selective(raw.forward_cookie_names.unwrap_or_default()),
        _ => Forwarding::None,
    };

    let headers = match raw.forward_headers {
        Some(headers) if headers.iter().any(|h| h == "*") => Forwarding::All,
        Some(headers) if !headers.is_empty() => Forwarding::Selective(headers),
        _ => Forwarding::None,
    };

    CacheBehavior {
        path_pattern: if is_default { None } else { raw.path_pattern },
        viewer_protocol_policy: parse_viewer_policy(raw.viewer_protocol_policy.as_deref()),
        allowed_methods: raw
            .allowed_methods
            .unwrap_or_else(|| vec!["GET".to_string(), "HEAD".to_string()]),
        forwarded: ForwardedValues {
            query_strings: raw.forward_query_strings.unwrap_or(false),
            headers,
            cookies,
        },
        compression_enabled: raw.compression_enabled.unwrap_or(false),
        function_associations: raw.function_associations.unwrap_or_default(),
    }
}

/// Default behavior first, then pattern behaviors in their configured
/// evaluation order. A missing default record still yields a default
/// behavior carrying the service defaults.
fn normalize_behaviors(
    default: Option<RawCacheBehavior>,
    pattern: Vec<RawCacheBehavior>,
) -> Vec<CacheBehavior> {
    let mut behaviors = vec![normalize_behavior(default.unwrap_or_default(), true)];
    behaviors.extend(
        pattern
            .into_iter()
            .filter(|b| b.path_pattern.is_some())
            .map(|b| normalize_behavior(b, false)),
    );
    behaviors
}

fn normalize_security(raw: RawSecurityDetail) -> SecurityConfig {
    let geo_restriction = match raw.geo_restriction_mode.as_deref() {
        Some("allowlist") | Some("whitelist") => GeoRestriction::Allowlist(raw.geo_locations),
        Some("denylist") | Some("blacklist") => GeoRestriction::Denylist(raw.geo_locations),
        _ => GeoRestriction::None,
    };

    // An absent policy document is a confirmed state: nothing grants
    // public read and nothing trusts an access control.
    let bucket_policy = FacetState::known(match raw.bucket_policy {
        Some(policy) => BucketPolicyInfo {
            public_read: policy.public_read,
            trusted_access_control: policy.trusted_access_control,
        },
        None => BucketPolicyInfo {
            public_read: false,
            trusted_access_control: None,
        },
    });

    SecurityConfig {
        geo_restriction,
        waf_enabled: raw.waf_enabled.unwrap_or(false),
        minimum_tls: raw.minimum_tls.unwrap_or_else(|| "TLSv1.2".to_string()),
        bucket_policy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryConfigSource;

    fn raw_distribution() -> RawDistribution {
        RawDistribution {
            id: "E2EXAMPLE".to_string(),
            domain_name: "d111.cdn.example.net".to_string(),
            status: Some("Deployed".to_string()),
            last_modified: None,
            default_root_object: None,
            origins: vec![RawOriginRef {
                id: "origin-1".to_string(),
                domain: "assets.storage.example.net".to_string(),
            }],
            default_behavior: None,
            behaviors: vec![RawCacheBehavior {
                path_pattern: Some("/images/*".to_string()),
                ..Default::default()
            }],
        }
    }

    #[tokio::test]
    async fn absent_fields_take_service_defaults() {
        let source = MemoryConfigSource::new()
            .with_distribution(raw_distribution())
            .with_origin_detail("origin-1", RawOriginDetail::default());

        let params = SymptomParams::new("E2EXAMPLE");
        let normalizer = SnapshotNormalizer::new(&source, DiagnosticsConfig::default());
        let snapshot = normalizer.build(&params).await.unwrap();

        let origin = &snapshot.origins[0];
        assert_eq!(origin.kind, OriginKind::ObjectStorage);
        assert_eq!(origin.read_timeout, DEFAULT_READ_TIMEOUT);
        assert_eq!(origin.connect_timeout, DEFAULT_CONNECT_TIMEOUT);

        // Default behavior synthesized, carries the allow-all service default.
        assert_eq!(snapshot.behaviors.len(), 2);
        assert!(snapshot.behaviors[0].is_default());
        assert_eq!(
            snapshot.behaviors[0].viewer_protocol_policy,
            ViewerProtocolPolicy::AllowAll
        );
    }

    #[tokio::test]
    async fn unresolvable_identifier_is_fatal() {
        let source = MemoryConfigSource::new();
        let params = SymptomParams::new("E2MISSING");
        let normalizer = SnapshotNormalizer::new(&source, DiagnosticsConfig::default());
        let err = normalizer.build(&params).await.unwrap_err();
        assert!(matches!(err, DiagnosticError::InvalidIdentifier { .. }));
    }

    #[tokio::test]
    async fn malformed_identifier_fails_before_any_fetch() {
        let source = MemoryConfigSource::new();
        let params = SymptomParams::new("not a valid id!");
        let normalizer = SnapshotNormalizer::new(&source, DiagnosticsConfig::default());
        let err = normalizer.build(&params).await.unwrap_err();
        assert!(matches!(err, DiagnosticError::InvalidIdentifier { .. }));
    }

    #[tokio::test]
    async fn denied_sub_record_degrades_instead_of_aborting() {
        let source = MemoryConfigSource::new()
            .with_distribution(raw_distribution())
            .with_origin_detail("origin-1", RawOriginDetail::default())
            .deny("security:E2EXAMPLE");

        let params = SymptomParams::new("E2EXAMPLE");
        let normalizer = SnapshotNormalizer::new(&source, DiagnosticsConfig::default());
        let snapshot = normalizer.build(&params).await.unwrap();

        assert!(snapshot.security.is_unknown());
        assert!(!snapshot.logging.is_unknown());
        assert!(snapshot
            .degraded_facets()
            .iter()
            .any(|(facet, _)| facet == "security"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_to_success() {
        let source = MemoryConfigSource::new()
            .with_distribution(raw_distribution())
            .with_origin_detail("origin-1", RawOriginDetail::default())
            .fail_transient("logging:E2EXAMPLE", 2);

        let mut config = DiagnosticsConfig::default();
        config.retry_backoff = Duration::from_millis(1);

        let params = SymptomParams::new("E2EXAMPLE");
        let normalizer = SnapshotNormalizer::new(&source, config);
        let snapshot = normalizer.build(&params).await.unwrap();
        assert!(!snapshot.logging.is_unknown());
    }

    #[tokio::test]
    async fn exhausted_retries_degrade_the_facet() {
        let source = MemoryConfigSource::new()
            .with_distribution(raw_distribution())
            .with_origin_detail("origin-1", RawOriginDetail::default())
            .fail_transient("logging:E2EXAMPLE", 10);

        let mut config = DiagnosticsConfig::default();
        config.retry_backoff = Duration::from_millis(1);

        let params = SymptomParams::new("E2EXAMPLE");
        let normalizer = SnapshotNormalizer::new(&source, config);
        let snapshot = normalizer.build(&params).await.unwrap();
        assert!(snapshot.logging.is_unknown());
    }

    #[tokio::test]
    async fn probes_only_run_under_active_validation() {
        let source = MemoryConfigSource::new()
            .with_distribution(raw_distribution())
            .with_origin_detail("origin-1", RawOriginDetail::default())
            .with_probe_outcome(
                "assets.storage.example.net",
                ProbeOutcome::Unreachable {
                    detail: "connection refused".to_string(),
                },
            );

        let passive = SymptomParams::new("E2EXAMPLE");
        let normalizer = SnapshotNormalizer::new(&source, DiagnosticsConfig::default());
        let snapshot = normalizer.build(&passive).await.unwrap();
        assert!(snapshot.probes.is_empty());

        let active = SymptomParams::new("E2EXAMPLE").with_active_validation(true);
        let snapshot = normalizer.build(&active).await.unwrap();
        assert_eq!(snapshot.probes.len(), 1);
        assert!(matches!(
            snapshot.probes[0].outcome,
            ProbeOutcome::Unreachable { .. }
        ));
    }
}
