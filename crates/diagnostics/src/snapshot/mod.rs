//! Snapshot model and normalization.

pub mod model;
pub mod normalizer;
pub mod raw;

pub use model::{
    AccessControlRef, BucketPolicyInfo, CacheBehavior, DeploymentStatus, DistributionSnapshot,
    FacetState, ForwardedValues, Forwarding, GeoRestriction, LoggingConfig, OriginConfig,
    OriginKind, OriginProtocolPolicy, ProbeOutcome, ProbeRecord, SecurityConfig,
    ViewerProtocolPolicy,
};
pub use normalizer::SnapshotNormalizer;
