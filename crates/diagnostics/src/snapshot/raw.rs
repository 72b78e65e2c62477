//! Raw configuration records as returned by the control plane.
//!
//! Everything here is optional-heavy on purpose: the source may return
//! partial records, and the normalizer owns the defaulting rules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDistribution {
    pub id: String,

    pub domain_name: String,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,

    #[serde(default)]
    pub default_root_object: Option<String>,

    #[serde(default)]
    pub origins: Vec<RawOriginRef>,

    #[serde(default)]
    pub default_behavior: Option<RawCacheBehavior>,

    #[serde(default)]
    pub behaviors: Vec<RawCacheBehavior>,
}

/// Origin stub embedded in the distribution record. The full origin
/// record is fetched separately via `get_origin_detail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOriginRef {
    pub id: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOriginDetail {
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub origin_path: Option<String>,

    #[serde(default)]
    pub access_control_ref: Option<String>,

    #[serde(default)]
    pub protocol_policy: Option<String>,

    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCacheBehavior {
    /// Absent on the default behavior.
    #[serde(default)]
    pub path_pattern: Option<String>,

    #[serde(default)]
    pub viewer_protocol_policy: Option<String>,

    #[serde(default)]
    pub allowed_methods: Option<Vec<String>>,

    #[serde(default)]
    pub forward_query_strings: Option<bool>,

    #[serde(default)]
    pub forward_headers: Option<Vec<String>>,

    /// `"none"`, `"all"`, or a comma-free list under `forward_cookie_names`.
    #[serde(default)]
    pub forward_cookies: Option<String>,

    #[serde(default)]
    pub forward_cookie_names: Option<Vec<String>>,

    #[serde(default)]
    pub compression_enabled: Option<bool>,

    #[serde(default)]
    pub function_associations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSecurityDetail {
    /// `"none"`, `"allowlist"`, or `"denylist"`.
    #[serde(default)]
    pub geo_restriction_mode: Option<String>,

    #[serde(default)]
    pub geo_locations: Vec<String>,

    #[serde(default)]
    pub waf_enabled: Option<bool>,

    #[serde(default)]
    pub minimum_tls: Option<String>,

    #[serde(default)]
    pub bucket_policy: Option<RawBucketPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBucketPolicy {
    #[serde(default)]
    pub public_read: bool,

    /// Access-control principal the bucket policy trusts, when any.
    #[serde(default)]
    pub trusted_access_control: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLoggingDetail {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub bucket: Option<String>,
}
