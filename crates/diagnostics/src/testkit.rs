//! Snapshot fixtures for tests (unit, integration, and downstream).
//!
//! The defaults are deliberately benign: a deployed distribution with a
//! tidy default behavior, readable security and logging facets, and no
//! restrictions. Each test opts into exactly the misconfiguration it is
//! exercising.

use crate::snapshot::model::*;
use std::time::Duration;

pub struct SnapshotOptions {
    pub origins: Vec<OriginConfig>,
    pub behaviors: Vec<CacheBehavior>,
    pub default_root_object: Option<String>,
    pub status: DeploymentStatus,
    pub security: Option<FacetState<SecurityConfig>>,
    pub bucket_policy: Option<FacetState<BucketPolicyInfo>>,
    pub logging: Option<FacetState<LoggingConfig>>,
    pub probes: Vec<ProbeRecord>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            origins: Vec::new(),
            behaviors: Vec::new(),
            default_root_object: Some("index.html".to_string()),
            status: DeploymentStatus::Deployed,
            security: None,
            bucket_policy: None,
            logging: None,
            probes: Vec::new(),
        }
    }
}

/// Build a snapshot from the options, filling every unset facet with a
/// benign default so unrelated rules stay quiet.
pub fn snapshot_with(options: SnapshotOptions) -> DistributionSnapshot {
    let mut behaviors = options.behaviors;
    if !behaviors.iter().any(|b| b.is_default()) {
        behaviors.insert(0, default_behavior());
    }

    let security = options.security.unwrap_or_else(|| {
        FacetState::known(SecurityConfig {
            geo_restriction: GeoRestriction::None,
            waf_enabled: false,
            minimum_tls: "TLSv1.2".to_string(),
            bucket_policy: options.bucket_policy.unwrap_or_else(|| {
                FacetState::known(BucketPolicyInfo {
                    public_read: false,
                    trusted_access_control: None,
                })
            }),
        })
    });

    DistributionSnapshot {
        id: "E2EXAMPLE".to_string(),
        domain_name: "d111.cdn.example.net".to_string(),
        status: options.status,
        last_modified: None,
        default_root_object: options.default_root_object,
        origins: options.origins,
        behaviors,
        security,
        logging: options
            .logging
            .unwrap_or_else(|| FacetState::known(LoggingConfig {
                enabled: true,
                bucket: Some("logs.storage.example.net".to_string()),
            })),
        probes: options.probes,
    }
}

pub fn storage_origin(id: &str, access_control: Option<&str>) -> OriginConfig {
    OriginConfig {
        id: id.to_string(),
        kind: OriginKind::ObjectStorage,
        domain: format!("{id}.storage.example.net"),
        origin_path: String::new(),
        access_control: FacetState::known(
            access_control.map(|r| AccessControlRef(r.to_string())),
        ),
        protocol_policy: OriginProtocolPolicy::MatchViewer,
        connect_timeout: Duration::from_secs(10),
        read_timeout: Duration::from_secs(30),
    }
}

pub fn custom_origin(id: &str, read_timeout_secs: u64) -> OriginConfig {
    OriginConfig {
        id: id.to_string(),
        kind: OriginKind::CustomHttp,
        domain: "backend.example.net".to_string(),
        origin_path: String::new(),
        access_control: FacetState::known(None),
        protocol_policy: OriginProtocolPolicy::HttpsOnly,
        connect_timeout: Duration::from_secs(10),
        read_timeout: Duration::from_secs(read_timeout_secs),
    }
}

pub fn default_behavior() -> CacheBehavior {
    CacheBehavior {
        path_pattern: None,
        viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
        allowed_methods: vec!["GET".to_string(), "HEAD".to_string()],
        forwarded: ForwardedValues {
            query_strings: false,
            headers: Forwarding::None,
            cookies: Forwarding::None,
        },
        compression_enabled: true,
        function_associations: Vec::new(),
    }
}

pub fn pattern_behavior(pattern: &str) -> CacheBehavior {
    CacheBehavior {
        path_pattern: Some(pattern.to_string()),
        ..default_behavior()
    }
}
