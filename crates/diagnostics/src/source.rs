//! The control-plane boundary.
//!
//! Everything the engine knows about a distribution arrives through
//! [`ConfigSource`]. All operations are fallible and latency-bearing; the
//! normalizer wraps each call in its own timeout and retry policy. The
//! core never calls a mutating operation; remediation output is advisory
//! text executed, if at all, by a separate explicitly-confirmed path.

use crate::error::SourceError;
use crate::snapshot::model::ProbeOutcome;
use crate::snapshot::raw::{
    RawDistribution, RawLoggingDetail, RawOriginDetail, RawSecurityDetail,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Read-capable view of the CDN control plane.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn get_distribution(&self, id: &str) -> SourceResult<RawDistribution>;

    async fn get_origin_detail(&self, origin_id: &str) -> SourceResult<RawOriginDetail>;

    async fn get_security_detail(&self, id: &str) -> SourceResult<RawSecurityDetail>;

    async fn get_logging_detail(&self, id: &str) -> SourceResult<RawLoggingDetail>;

    /// Live reachability check against an origin. Only invoked when the
    /// operator enabled active validation.
    async fn probe_reachability(&self, origin_domain: &str) -> SourceResult<ProbeOutcome>;
}

// ---------------------------------------------------------------------------
// MemoryConfigSource
// ---------------------------------------------------------------------------

/// In-memory source with scriptable failures.
///
/// Backs the test suite and the CLI's offline mode. Facet reads can be
/// denied (`deny`) or made to fail transiently a fixed number of times
/// (`fail_transient`), and probe outcomes are scripted per origin domain.
#[derive(Default)]
pub struct MemoryConfigSource {
    distributions: Mutex<HashMap<String, RawDistribution>>,
    origin_details: Mutex<HashMap<String, RawOriginDetail>>,
    security_details: Mutex<HashMap<String, RawSecurityDetail>>,
    logging_details: Mutex<HashMap<String, RawLoggingDetail>>,
    probe_outcomes: Mutex<HashMap<String, ProbeOutcome>>,
    denied: Mutex<Vec<String>>,
    transient_failures: Mutex<HashMap<String, u32>>,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distribution(self, dist: RawDistribution) -> Self {
        self.distributions
            .lock()
            .unwrap()
            .insert(dist.id.clone(), dist);
        self
    }

    pub fn with_origin_detail(self, origin_id: impl Into<String>, detail: RawOriginDetail) -> Self {
        self.origin_details
            .lock()
            .unwrap()
            .insert(origin_id.into(), detail);
        self
    }

    pub fn with_security_detail(
        self,
        id: impl Into<String>,
        detail: RawSecurityDetail,
    ) -> Self {
        self.security_details
            .lock()
            .unwrap()
            .insert(id.into(), detail);
        self
    }

    pub fn with_logging_detail(self, id: impl Into<String>, detail: RawLoggingDetail) -> Self {
        self.logging_details
            .lock()
            .unwrap()
            .insert(id.into(), detail);
        self
    }

    pub fn with_probe_outcome(
        self,
        origin_domain: impl Into<String>,
        outcome: ProbeOutcome,
    ) -> Self {
        self.probe_outcomes
            .lock()
            .unwrap()
            .insert(origin_domain.into(), outcome);
        self
    }

    /// Deny a read. Keys: `security:<id>`, `logging:<id>`,
    /// `origin:<origin_id>`, `distribution:<id>`.
    pub fn deny(self, key: impl Into<String>) -> Self {
        self.denied.lock().unwrap().push(key.into());
        self
    }

    /// Make a read fail with a transient error the first `times` attempts.
    pub fn fail_transient(self, key: impl Into<String>, times: u32) -> Self {
        self.transient_failures
            .lock()
            .unwrap()
            .insert(key.into(), times);
        self
    }

    fn check_failures(&self, key: &str) -> SourceResult<()> {
        if self.denied.lock().unwrap().iter().any(|k| k == key) {
            return Err(SourceError::PermissionDenied(key.to_string()));
        }
        let mut transient = self.transient_failures.lock().unwrap();
        if let Some(remaining) = transient.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SourceError::Transient(format!(
                    "simulated transient failure for {key}"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigSource for MemoryConfigSource {
    async fn get_distribution(&self, id: &str) -> SourceResult<RawDistribution> {
        self.check_failures(&format!("distribution:{id}"))?;
        self.distributions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("distribution {id}")))
    }

    async fn get_origin_detail(&self, origin_id: &str) -> SourceResult<RawOriginDetail> {
        self.check_failures(&format!("origin:{origin_id}"))?;
        self.origin_details
            .lock()
            .unwrap()
            .get(origin_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("origin {origin_id}")))
    }

    async fn get_security_detail(&self, id: &str) -> SourceResult<RawSecurityDetail> {
        self.check_failures(&format!("security:{id}"))?;
        Ok(self
            .security_details
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_logging_detail(&self, id: &str) -> SourceResult<RawLoggingDetail> {
        self.check_failures(&format!("logging:{id}"))?;
        Ok(self
            .logging_details
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn probe_reachability(&self, origin_domain: &str) -> SourceResult<ProbeOutcome> {
        self.check_failures(&format!("probe:{origin_domain}"))?;
        Ok(self
            .probe_outcomes
            .lock()
            .unwrap()
            .get(origin_domain)
            .cloned()
            .unwrap_or(ProbeOutcome::Reachable))
    }
}

// ---------------------------------------------------------------------------
// FileConfigSource
// ---------------------------------------------------------------------------

/// Serialized configuration dump, as exported from the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDump {
    pub distribution: RawDistribution,

    #[serde(default)]
    pub origin_details: HashMap<String, RawOriginDetail>,

    #[serde(default)]
    pub security: Option<RawSecurityDetail>,

    #[serde(default)]
    pub logging: Option<RawLoggingDetail>,
}

/// Source backed by a JSON configuration dump on disk, so exported
/// configurations can be diagnosed offline. Probes are unavailable by
/// definition.
pub struct FileConfigSource {
    dump: ConfigDump,
}

impl FileConfigSource {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let dump: ConfigDump = serde_json::from_str(&content)?;
        Ok(Self { dump })
    }

    pub fn from_dump(dump: ConfigDump) -> Self {
        Self { dump }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn get_distribution(&self, id: &str) -> SourceResult<RawDistribution> {
        if self.dump.distribution.id != id {
            return Err(SourceError::NotFound(format!("distribution {id}")));
        }
        Ok(self.dump.distribution.clone())
    }

    async fn get_origin_detail(&self, origin_id: &str) -> SourceResult<RawOriginDetail> {
        self.dump
            .origin_details
            .get(origin_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("origin {origin_id}")))
    }

    async fn get_security_detail(&self, _id: &str) -> SourceResult<RawSecurityDetail> {
        self.dump
            .security
            .clone()
            .ok_or_else(|| SourceError::PermissionDenied("security detail".to_string()))
    }

    async fn get_logging_detail(&self, _id: &str) -> SourceResult<RawLoggingDetail> {
        self.dump
            .logging
            .clone()
            .ok_or_else(|| SourceError::PermissionDenied("logging detail".to_string()))
    }

    async fn probe_reachability(&self, _origin_domain: &str) -> SourceResult<ProbeOutcome> {
        Ok(ProbeOutcome::Unavailable {
            reason: "offline configuration dump".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::raw::RawOriginRef;

    fn sample_distribution() -> RawDistribution {
        RawDistribution {
            id: "E2EXAMPLE".to_string(),
            domain_name: "d111.cdn.example.net".to_string(),
            status: Some("Deployed".to_string()),
            last_modified: None,
            default_root_object: Some("index.html".to_string()),
            origins: vec![RawOriginRef {
                id: "origin-1".to_string(),
                domain: "assets.storage.example.net".to_string(),
            }],
            default_behavior: None,
            behaviors: Vec::new(),
        }
    }

    #[tokio::test]
    async fn memory_source_round_trip() {
        let source = MemoryConfigSource::new().with_distribution(sample_distribution());
        let dist = source.get_distribution("E2EXAMPLE").await.unwrap();
        assert_eq!(dist.domain_name, "d111.cdn.example.net");

        let missing = source.get_distribution("E2MISSING").await;
        assert!(matches!(missing, Err(SourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn denied_facet_reports_permission_denied() {
        let source = MemoryConfigSource::new()
            .with_distribution(sample_distribution())
            .deny("security:E2EXAMPLE");
        let err = source.get_security_detail("E2EXAMPLE").await.unwrap_err();
        assert!(matches!(err, SourceError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn transient_failure_clears_after_configured_attempts() {
        let source = MemoryConfigSource::new()
            .with_distribution(sample_distribution())
            .fail_transient("distribution:E2EXAMPLE", 2);

        assert!(source.get_distribution("E2EXAMPLE").await.is_err());
        assert!(source.get_distribution("E2EXAMPLE").await.is_err());
        assert!(source.get_distribution("E2EXAMPLE").await.is_ok());
    }
}
