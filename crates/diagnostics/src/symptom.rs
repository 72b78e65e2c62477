//! Symptom parameters describing what the operator is experiencing.
//!
//! The optional HTTP error code is the first branch of the analysis: it
//! selects which slice of the rule catalog runs. Unknown codes never fail
//! the run; they fall back to full analysis and leave a warning on the
//! report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Symptom category a rule applies to.
///
/// `General` rules run regardless of the supplied error code. `Security`
/// rules have no corresponding HTTP error and only run in full analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymptomCategory {
    AccessDenied,
    NotFound,
    ServerError,
    Security,
    General,
}

impl fmt::Display for SymptomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessDenied => write!(f, "access-denied"),
            Self::NotFound => write!(f, "not-found"),
            Self::ServerError => write!(f, "server-error"),
            Self::Security => write!(f, "security"),
            Self::General => write!(f, "general"),
        }
    }
}

impl SymptomCategory {
    /// Explicit error-code selection table. Codes outside the known set
    /// return `None`; the caller falls back to full analysis with a
    /// warning instead of guessing.
    pub fn from_error_code(code: &str) -> Option<Self> {
        match code.trim() {
            "401" | "403" => Some(Self::AccessDenied),
            "404" => Some(Self::NotFound),
            "500" | "502" | "503" | "504" => Some(Self::ServerError),
            _ => None,
        }
    }
}

/// Immutable run context threaded through every stage of a diagnostic run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomParams {
    pub distribution_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_domain: Option<String>,

    pub active_validation: bool,

    pub run_proactive_checks: bool,
}

impl SymptomParams {
    pub fn new(distribution_id: impl Into<String>) -> Self {
        Self {
            distribution_id: distribution_id.into(),
            error_code: None,
            request_path: None,
            request_domain: None,
            active_validation: false,
            run_proactive_checks: true,
        }
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_request_path(mut self, path: impl Into<String>) -> Self {
        self.request_path = Some(path.into());
        self
    }

    pub fn with_request_domain(mut self, domain: impl Into<String>) -> Self {
        self.request_domain = Some(domain.into());
        self
    }

    pub fn with_active_validation(mut self, enabled: bool) -> Self {
        self.active_validation = enabled;
        self
    }

    pub fn with_proactive_checks(mut self, enabled: bool) -> Self {
        self.run_proactive_checks = enabled;
        self
    }

    /// Resolved symptom category, plus a warning when the supplied error
    /// code is not in the known set.
    pub fn resolve_category(&self) -> (Option<SymptomCategory>, Option<String>) {
        match self.error_code.as_deref() {
            None => (None, None),
            Some(code) => match SymptomCategory::from_error_code(code) {
                Some(category) => (Some(category), None),
                None => (
                    None,
                    Some(format!(
                        "unrecognized error code '{code}'; falling back to general analysis"
                    )),
                ),
            },
        }
    }

    /// Identifier shape check. The control plane is the authority on
    /// whether the id resolves; this only rejects ids that cannot
    /// possibly be valid so we fail before any network round trip.
    pub fn validate_identifier(&self) -> std::result::Result<(), String> {
        let id = self.distribution_id.trim();
        if id.is_empty() {
            return Err("identifier is empty".to_string());
        }
        if id.len() > 64 {
            return Err("identifier exceeds 64 characters".to_string());
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("identifier contains characters outside [A-Za-z0-9-]".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_error_codes_map_to_categories() {
        assert_eq!(
            SymptomCategory::from_error_code("403"),
            Some(SymptomCategory::AccessDenied)
        );
        assert_eq!(
            SymptomCategory::from_error_code("404"),
            Some(SymptomCategory::NotFound)
        );
        assert_eq!(
            SymptomCategory::from_error_code("504"),
            Some(SymptomCategory::ServerError)
        );
        assert_eq!(SymptomCategory::from_error_code("418"), None);
    }

    #[test]
    fn unknown_code_resolves_to_general_with_warning() {
        let params = SymptomParams::new("E2EXAMPLE").with_error_code("499");
        let (category, warning) = params.resolve_category();
        assert!(category.is_none());
        assert!(warning.unwrap().contains("499"));
    }

    #[test]
    fn identifier_shape_validation() {
        assert!(SymptomParams::new("E2EXAMPLE123").validate_identifier().is_ok());
        assert!(SymptomParams::new("").validate_identifier().is_err());
        assert!(SymptomParams::new("bad id!").validate_identifier().is_err());
        assert!(SymptomParams::new("x".repeat(70)).validate_identifier().is_err());
    }
}
