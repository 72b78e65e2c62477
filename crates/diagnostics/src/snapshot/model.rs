//! Normalized, facet-typed configuration model.
//!
//! A [`DistributionSnapshot`] is built once per diagnostic run and never
//! mutated afterward. Facets that could not be read are carried as
//! [`FacetState::Unknown`] so rules can distinguish "confirmed absent"
//! from "could not confirm".

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A facet value that may have been unreadable at normalization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "value")]
pub enum FacetState<T> {
    Known(T),
    Unknown { reason: String },
}

impl<T> FacetState<T> {
    pub fn known(value: T) -> Self {
        Self::Known(value)
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        Self::Unknown {
            reason: reason.into(),
        }
    }

    pub fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown { .. } => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    pub fn unknown_reason(&self) -> Option<&str> {
        match self {
            Self::Known(_) => None,
            Self::Unknown { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginKind {
    ObjectStorage,
    CustomHttp,
    LoadBalancer,
}

impl std::fmt::Display for OriginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ObjectStorage => write!(f, "object-storage"),
            Self::CustomHttp => write!(f, "custom-http"),
            Self::LoadBalancer => write!(f, "load-balancer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginProtocolPolicy {
    HttpOnly,
    HttpsOnly,
    MatchViewer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlRef(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    pub id: String,

    pub kind: OriginKind,

    pub domain: String,

    pub origin_path: String,

    /// `Known(None)` means confirmed absent; `Unknown` means the origin
    /// detail record could not be read.
    pub access_control: FacetState<Option<AccessControlRef>>,

    pub protocol_policy: OriginProtocolPolicy,

    pub connect_timeout: Duration,

    pub read_timeout: Duration,
}

impl OriginConfig {
    /// Static-website storage endpoints only terminate plain HTTP; an
    /// https-only origin policy against one can never connect.
    pub fn is_website_endpoint(&self) -> bool {
        self.domain.contains("-website") || self.domain.contains(".website.")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerProtocolPolicy {
    AllowAll,
    RedirectToHttps,
    HttpsOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Forwarding {
    None,
    All,
    Selective(Vec<String>),
}

impl Forwarding {
    pub fn forwards_everything(&self) -> bool {
        matches!(self, Self::All)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardedValues {
    pub query_strings: bool,
    pub headers: Forwarding,
    pub cookies: Forwarding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheBehavior {
    /// `None` on the default behavior, which matches every request not
    /// claimed by a pattern behavior.
    pub path_pattern: Option<String>,

    pub viewer_protocol_policy: ViewerProtocolPolicy,

    pub allowed_methods: Vec<String>,

    pub forwarded: ForwardedValues,

    pub compression_enabled: bool,

    pub function_associations: Vec<String>,
}

impl CacheBehavior {
    pub fn is_default(&self) -> bool {
        self.path_pattern.is_none()
    }

    /// Path-pattern match with the service's `*` and `?` wildcards. The
    /// default behavior matches everything.
    pub fn matches_path(&self, path: &str) -> bool {
        match &self.path_pattern {
            None => true,
            Some(pattern) => wildcard_match(pattern, path),
        }
    }
}

/// Glob match over `*` (any run, including empty) and `?` (exactly one
/// character). Iterative two-pointer form so pathological patterns cannot
/// recurse deeply.
pub fn wildcard_match(pattern: &str, input: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = input.chars().collect();
    let (mut pi, mut si) = (0usize, 0usize);
    let (mut star, mut mark) = (None::<usize>, 0usize);

    while si < s.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == s[si]) {
            pi += 1;
            si += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = si;
            pi += 1;
        } else if let Some(sp) = star {
            pi = sp + 1;
            mark += 1;
            si = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoRestriction {
    None,
    Allowlist(Vec<String>),
    Denylist(Vec<String>),
}

impl GeoRestriction {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPolicyInfo {
    pub public_read: bool,
    pub trusted_access_control: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub geo_restriction: GeoRestriction,

    pub waf_enabled: bool,

    /// Minimum TLS protocol version, e.g. `TLSv1.2`.
    pub minimum_tls: String,

    pub bucket_policy: FacetState<BucketPolicyInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentStatus {
    Deployed,
    InProgress,
    Disabled,
    Unknown,
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deployed => write!(f, "deployed"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Disabled => write!(f, "disabled"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of an active-validation reachability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "outcome")]
pub enum ProbeOutcome {
    Reachable,
    Unreachable { detail: String },
    Timeout,
    /// The probe itself failed; lowers confidence of the affected rule
    /// only, never the run.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub origin_id: String,
    pub outcome: ProbeOutcome,
}

/// Canonical, immutable configuration snapshot for one diagnostic run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSnapshot {
    pub id: String,

    pub domain_name: String,

    pub status: DeploymentStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_root_object: Option<String>,

    pub origins: Vec<OriginConfig>,

    /// Default behavior first, then pattern behaviors in evaluation order.
    pub behaviors: Vec<CacheBehavior>,

    pub security: FacetState<SecurityConfig>,

    pub logging: FacetState<LoggingConfig>,

    /// Reachability probes, populated only under active validation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<ProbeRecord>,
}

impl DistributionSnapshot {
    pub fn origin(&self, index: usize) -> Option<&OriginConfig> {
        self.origins.get(index)
    }

    pub fn probe_for(&self, origin_id: &str) -> Option<&ProbeRecord> {
        self.probes.iter().find(|p| p.origin_id == origin_id)
    }

    /// Pattern behaviors only, in evaluation order.
    pub fn pattern_behaviors(&self) -> impl Iterator<Item = (usize, &CacheBehavior)> {
        self.behaviors
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_default())
    }

    /// Facets degraded to `Unknown`, with the reason each was unreadable.
    pub fn degraded_facets(&self) -> Vec<(String, String)> {
        let mut degraded = Vec::new();
        if let Some(reason) = self.security.unknown_reason() {
            degraded.push(("security".to_string(), reason.to_string()));
        }
        if let Some(FacetState::Unknown { reason }) = self
            .security
            .as_known()
            .map(|s| &s.bucket_policy)
        {
            degraded.push(("security.bucket_policy".to_string(), reason.clone()));
        }
        if let Some(reason) = self.logging.unknown_reason() {
            degraded.push(("logging".to_string(), reason.to_string()));
        }
        for (i, origin) in self.origins.iter().enumerate() {
            if let Some(reason) = origin.access_control.unknown_reason() {
                degraded.push((format!("origins[{i}]"), reason.to_string()));
            }
        }
        degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_match_basics() {
        assert!(wildcard_match("/images/*", "/images/logo.png"));
        assert!(wildcard_match("/images/*", "/images/"));
        assert!(!wildcard_match("/images/*", "/docs/readme.html"));
        assert!(wildcard_match("*.jpg", "photo.jpg"));
        assert!(!wildcard_match("*.jpg", "photo.jpeg"));
        assert!(wildcard_match("/a?c/*", "/abc/file"));
        assert!(!wildcard_match("/a?c/*", "/ac/file"));
        assert!(wildcard_match("*", "/anything/at/all"));
    }

    #[test]
    fn root_pattern_matches_only_root() {
        assert!(wildcard_match("/", "/"));
        assert!(!wildcard_match("/", "/index.html"));
    }

    #[test]
    fn default_behavior_matches_everything() {
        let behavior = CacheBehavior {
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
        };
        assert!(behavior.matches_path("/docs/readme.html"));
        assert!(behavior.is_default());
    }

    #[test]
    fn facet_state_accessors() {
        let known: FacetState<u32> = FacetState::known(7);
        assert_eq!(known.as_known(), Some(&7));
        assert!(!known.is_unknown());

        let unknown: FacetState<u32> = FacetState::unknown("permission denied");
        assert!(unknown.is_unknown());
        assert_eq!(unknown.unknown_reason(), Some("permission denied"));
    }
}
