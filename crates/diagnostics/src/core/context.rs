use crate::snapshot::model::{
    DistributionSnapshot, ProbeRecord, SecurityConfig,
};
use crate::symptom::{SymptomCategory, SymptomParams};
use std::time::Duration;

/// Engine tunables. Defaults match the documented service behavior; the
/// timeout and retry knobs bound every control-plane round trip.
#[derive(Debug, Clone)]
pub struct DiagnosticsConfig {
    pub parallel_evaluation: bool,

    pub fetch_timeout: Duration,

    pub fetch_retries: u32,

    pub retry_backoff: Duration,

    pub probe_timeout: Duration,

    /// Findings surfaced in the executive summary.
    pub max_executive_findings: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            parallel_evaluation: true,
            fetch_timeout: Duration::from_secs(5),
            fetch_retries: 3,
            retry_backoff: Duration::from_millis(200),
            probe_timeout: Duration::from_secs(2),
            max_executive_findings: 3,
        }
    }
}

/// Read-only view handed to every rule: the snapshot, the symptom
/// parameters, and the resolved category. Rules share it across worker
/// threads, so it carries no interior mutability.
pub struct DiagnosisContext<'a> {
    snapshot: &'a DistributionSnapshot,
    symptoms: &'a SymptomParams,
    category: Option<SymptomCategory>,
}

impl<'a> DiagnosisContext<'a> {
    pub fn new(
        snapshot: &'a DistributionSnapshot,
        symptoms: &'a SymptomParams,
        category: Option<SymptomCategory>,
    ) -> Self {
        Self {
            snapshot,
            symptoms,
            category,
        }
    }

    pub fn snapshot(&self) -> &DistributionSnapshot {
        self.snapshot
    }

    pub fn symptoms(&self) -> &SymptomParams {
        self.symptoms
    }

    /// The symptom category resolved from the error code; `None` means
    /// full analysis.
    pub fn category(&self) -> Option<SymptomCategory> {
        self.category
    }

    pub fn request_path(&self) -> Option<&str> {
        self.symptoms.request_path.as_deref()
    }

    pub fn request_domain(&self) -> Option<&str> {
        self.symptoms.request_domain.as_deref()
    }

    /// Security facet when it was readable.
    pub fn security(&self) -> Option<&SecurityConfig> {
        self.snapshot.security.as_known()
    }

    pub fn probe_for(&self, origin_id: &str) -> Option<&ProbeRecord> {
        self.snapshot.probe_for(origin_id)
    }

    /// Whether the supplied request path targets the distribution root.
    pub fn is_root_request(&self) -> bool {
        matches!(self.request_path(), None | Some("/") | Some(""))
    }
}
