//! Report assembly and rendering.
//!
//! The report is the sole externally consumed artifact of a run. Assembly
//! is a pure transformation of the snapshot, the ranked findings, and the
//! remediation plans; rendering never touches I/O.

use crate::core::finding::Finding;
use crate::core::severity::Severity;
use crate::remediation::RemediationAction;
use crate::snapshot::model::{DistributionSnapshot, FacetState};
use crate::symptom::SymptomParams;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub finding: Finding,

    /// Tier-ordered remediation actions, quick fix first.
    pub actions: Vec<RemediationAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginSummary {
    pub id: String,
    pub kind: String,
    pub domain: String,
    pub access_control: String,
}

/// Free-form configuration summary shown at the top of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub id: String,
    pub domain_name: String,
    pub status: String,
    pub origins: Vec<OriginSummary>,
    pub behavior_count: usize,
    pub default_root_object: Option<String>,
    pub logging: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradedFacet {
    pub facet: String,
    pub reason: String,
}

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct SeverityCount {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Markdown,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub generated_at: DateTime<Utc>,

    pub engine_version: String,

    pub symptoms: SymptomParams,

    pub summary: DistributionSummary,

    /// Ranked findings with their remediation plans.
    pub entries: Vec<ReportEntry>,

    pub diagnostic_commands: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Recommendation>,

    /// Facets that could not be read; confidence is reduced, not assumed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_facets: Vec<DegradedFacet>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// How many findings the executive summary surfaces.
    pub executive_limit: usize,
}

pub struct ReportBuilder {
    executive_limit: usize,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self { executive_limit: 3 }
    }

    pub fn with_executive_limit(mut self, limit: usize) -> Self {
        self.executive_limit = limit.max(1);
        self
    }

    pub fn build(
        &self,
        snapshot: &DistributionSnapshot,
        symptoms: &SymptomParams,
        entries: Vec<ReportEntry>,
        warnings: Vec<String>,
    ) -> DiagnosticReport {
        DiagnosticReport {
            generated_at: Utc::now(),
            engine_version: crate::VERSION.to_string(),
            symptoms: symptoms.clone(),
            summary: summarize(snapshot),
            diagnostic_commands: diagnostic_commands(snapshot, symptoms),
            recommendations: if symptoms.run_proactive_checks {
                recommendations(snapshot)
            } else {
                Vec::new()
            },
            degraded_facets: snapshot
                .degraded_facets()
                .into_iter()
                .map(|(facet, reason)| DegradedFacet { facet, reason })
                .collect(),
            warnings,
            entries,
            executive_limit: self.executive_limit,
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize(snapshot: &DistributionSnapshot) -> DistributionSummary {
    DistributionSummary {
        id: snapshot.id.clone(),
        domain_name: snapshot.domain_name.clone(),
        status: snapshot.status.to_string(),
        origins: snapshot
            .origins
            .iter()
            .map(|o| OriginSummary {
                id: o.id.clone(),
                kind: o.kind.to_string(),
                domain: o.domain.clone(),
                access_control: match &o.access_control {
                    FacetState::Known(Some(r)) => r.0.clone(),
                    FacetState::Known(None) => "none".to_string(),
                    FacetState::Unknown { .. } => "unknown".to_string(),
                },
            })
            .collect(),
        behavior_count: snapshot.behaviors.len(),
        default_root_object: snapshot.default_root_object.clone(),
        logging: match &snapshot.logging {
            FacetState::Known(l) if l.enabled => "enabled".to_string(),
            FacetState::Known(_) => "disabled".to_string(),
            FacetState::Unknown { .. } => "unknown".to_string(),
        },
    }
}

fn diagnostic_commands(snapshot: &DistributionSnapshot, symptoms: &SymptomParams) -> Vec<String> {
    let mut commands = vec![
        format!("cloudctl cdn get-distribution --id {}", snapshot.id),
        format!("cloudctl cdn get-distribution-config --id {}", snapshot.id),
    ];
    let path = symptoms.request_path.as_deref().unwrap_or("/");
    let domain = symptoms
        .request_domain
        .as_deref()
        .unwrap_or(&snapshot.domain_name);
    commands.push(format!(
        "curl -sv https://{domain}{path} -o /dev/null  # inspect response headers from the edge"
    ));
    for origin in &snapshot.origins {
        commands.push(format!(
            "cloudctl cdn get-origin --distribution-id {} --origin-id {}",
            snapshot.id, origin.id
        ));
    }
    commands
}

fn recommendations(snapshot: &DistributionSnapshot) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    match &snapshot.logging {
        FacetState::Known(logging) if logging.enabled => {}
        FacetState::Known(_) => recs.push(Recommendation {
            title: "Enable access logging".to_string(),
            detail: "Access logs are off. Without them, the next incident has no request \
                     trail to diagnose from."
                .to_string(),
        }),
        FacetState::Unknown { .. } => recs.push(Recommendation {
            title: "Verify access logging".to_string(),
            detail: "The logging configuration could not be read; confirm access logs are \
                     enabled and delivered."
                .to_string(),
        }),
    }

    if snapshot
        .behaviors
        .iter()
        .any(|b| !b.compression_enabled)
    {
        recs.push(Recommendation {
            title: "Enable compression".to_string(),
            detail: "At least one behavior serves uncompressed responses; compression is \
                     a free bandwidth and latency win for text-like content."
                .to_string(),
        });
    }

    recs.push(Recommendation {
        title: "Add monitoring on error rates".to_string(),
        detail: "Alert on 4xx/5xx rate and origin latency so the next misconfiguration \
                 pages you before viewers notice."
            .to_string(),
    });

    recs
}

impl DiagnosticReport {
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.entries.iter().map(|e| &e.finding)
    }

    pub fn count_by_severity(&self) -> SeverityCount {
        let mut count = SeverityCount::default();
        for finding in self.findings() {
            match finding.severity {
                Severity::Critical => count.critical += 1,
                Severity::High => count.high += 1,
                Severity::Medium => count.medium += 1,
                Severity::Low => count.low += 1,
            }
        }
        count
    }

    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Markdown => Ok(self.render_markdown()),
            ReportFormat::Json => self.to_json(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let line = "=".repeat(72);

        out.push_str(&line);
        out.push_str(&format!(
            "\nDISTRIBUTION DIAGNOSTIC REPORT\n{}  ({})\n",
            self.summary.id, self.summary.domain_name
        ));
        out.push_str(&format!(
            "Generated {} | engine {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.engine_version
        ));
        out.push_str(&line);
        out.push('\n');

        out.push_str("\nCONFIGURATION SUMMARY\n");
        out.push_str(&format!("  Status:              {}\n", self.summary.status));
        out.push_str(&format!(
            "  Default root object: {}\n",
            self.summary.default_root_object.as_deref().unwrap_or("(none)")
        ));
        out.push_str(&format!(
            "  Cache behaviors:     {}\n",
            self.summary.behavior_count
        ));
        out.push_str(&format!("  Access logging:      {}\n", self.summary.logging));
        for origin in &self.summary.origins {
            out.push_str(&format!(
                "  Origin {}: {} ({}), access control: {}\n",
                origin.id, origin.domain, origin.kind, origin.access_control
            ));
        }

        if !self.warnings.is_empty() {
            out.push_str("\nWARNINGS\n");
            for warning in &self.warnings {
                out.push_str(&format!("  ! {warning}\n"));
            }
        }

        if !self.degraded_facets.is_empty() {
            out.push_str("\nCOULD NOT CONFIRM\n");
            for degraded in &self.degraded_facets {
                out.push_str(&format!("  ? {}: {}\n", degraded.facet, degraded.reason));
            }
        }

        if self.is_clean() {
            out.push_str("\nNo issues found for the supplied symptoms.\n");
        } else {
            out.push_str("\nEXECUTIVE SUMMARY\n");
            for (i, entry) in self.entries.iter().take(self.executive_limit).enumerate() {
                let finding = &entry.finding;
                out.push_str(&format!(
                    "  {}. {} {}{}\n",
                    i + 1,
                    finding.severity.marker(),
                    finding.title,
                    if finding.confirmed { "" } else { " (could not confirm)" }
                ));
                if let Some(quick) = entry.actions.first() {
                    out.push_str(&format!(
                        "     -> {} ({}): {}\n",
                        quick.tier, quick.estimated_time, quick.explanation
                    ));
                }
            }

            out.push_str("\nPRIORITIZED ISSUES\n");
            for (i, entry) in self.entries.iter().enumerate() {
                let finding = &entry.finding;
                out.push_str(&format!(
                    "\n{}. {} {} (likelihood: {}, facet: {}, category: {}){}\n",
                    i + 1,
                    finding.severity.marker(),
                    finding.title,
                    finding.likelihood,
                    finding.facet,
                    finding.category,
                    if finding.confirmed { "" } else { " [could not confirm]" }
                ));
                out.push_str(&format!("   {}\n", finding.description));
                for note in &finding.notes {
                    out.push_str(&format!("   note: {note}\n"));
                }
                if !finding.evidence.is_empty() {
                    out.push_str("   evidence:\n");
                    for evidence in &finding.evidence {
                        out.push_str(&format!(
                            "     - {} = {}\n",
                            evidence.path, evidence.observed
                        ));
                    }
                }
                for action in &entry.actions {
                    out.push_str(&format!(
                        "   [{}] {} - {}\n",
                        action.tier, action.estimated_time, action.explanation
                    ));
                    for step in &action.declarative_steps {
                        out.push_str(&format!("     * {step}\n"));
                    }
                    for command in &action.imperative_commands {
                        out.push_str(&format!("     $ {command}\n"));
                    }
                    for step in &action.verification_steps {
                        out.push_str(&format!("     verify: {step}\n"));
                    }
                    for warning in &action.side_effect_warnings {
                        out.push_str(&format!("     warning: {warning}\n"));
                    }
                }
            }
        }

        if !self.diagnostic_commands.is_empty() {
            out.push_str("\nADDITIONAL DIAGNOSTIC COMMANDS\n");
            for command in &self.diagnostic_commands {
                out.push_str(&format!("  $ {command}\n"));
            }
        }

        if !self.recommendations.is_empty() {
            out.push_str("\nPROACTIVE RECOMMENDATIONS\n");
            for rec in &self.recommendations {
                out.push_str(&format!("  - {}: {}\n", rec.title, rec.detail));
            }
        }

        out
    }

    pub fn render_markdown(&self) -> String {
        let mut md = String::from("# Distribution Diagnostic Report\n\n");

        md.push_str(&format!(
            "**Distribution**: `{}` ({})\n",
            self.summary.id, self.summary.domain_name
        ));
        md.push_str(&format!(
            "**Generated**: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        md.push_str(&format!("**Engine Version**: {}\n\n", self.engine_version));

        let count = self.count_by_severity();
        md.push_str("## Summary\n\n");
        md.push_str(&format!("- Critical: {}\n", count.critical));
        md.push_str(&format!("- High: {}\n", count.high));
        md.push_str(&format!("- Medium: {}\n", count.medium));
        md.push_str(&format!("- Low: {}\n\n", count.low));

        if !self.warnings.is_empty() {
            md.push_str("## Warnings\n\n");
            for warning in &self.warnings {
                md.push_str(&format!("- {warning}\n"));
            }
            md.push('\n');
        }

        if !self.degraded_facets.is_empty() {
            md.push_str("## Could Not Confirm\n\n");
            for degraded in &self.degraded_facets {
                md.push_str(&format!("- `{}`: {}\n", degraded.facet, degraded.reason));
            }
            md.push('\n');
        }

        if !self.entries.is_empty() {
            md.push_str("## Prioritized Issues\n\n");
            md.push_str("| # | Severity | Likelihood | Finding | Facet |\n");
            md.push_str("|---|----------|------------|---------|-------|\n");
            for (i, entry) in self.entries.iter().enumerate() {
                let finding = &entry.finding;
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    i + 1,
                    finding.severity,
                    finding.likelihood,
                    finding.title,
                    finding.facet
                ));
            }
            md.push('\n');

            for (i, entry) in self.entries.iter().enumerate() {
                let finding = &entry.finding;
                md.push_str(&format!("### {}. {}\n\n", i + 1, finding.title));
                md.push_str(&format!("> {}\n\n", finding.description));
                for note in &finding.notes {
                    md.push_str(&format!("> *{note}*\n\n"));
                }
                if !finding.evidence.is_empty() {
                    md.push_str("**Evidence:**\n");
                    for evidence in &finding.evidence {
                        md.push_str(&format!("- `{}` = {}\n", evidence.path, evidence.observed));
                    }
                    md.push('\n');
                }
                for action in &entry.actions {
                    md.push_str(&format!(
                        "**{}** ({}): {}\n\n",
                        action.tier, action.estimated_time, action.explanation
                    ));
                    for step in &action.declarative_steps {
                        md.push_str(&format!("1. {step}\n"));
                    }
                    if !action.imperative_commands.is_empty() {
                        md.push_str("\n```\n");
                        for command in &action.imperative_commands {
                            md.push_str(&format!("{command}\n"));
                        }
                        md.push_str("```\n");
                    }
                    for step in &action.verification_steps {
                        md.push_str(&format!("- Verify: {step}\n"));
                    }
                    for warning in &action.side_effect_warnings {
                        md.push_str(&format!("- **Warning**: {warning}\n"));
                    }
                    md.push('\n');
                }
            }
        }

        if !self.diagnostic_commands.is_empty() {
            md.push_str("## Additional Diagnostic Commands\n\n```\n");
            for command in &self.diagnostic_commands {
                md.push_str(&format!("{command}\n"));
            }
            md.push_str("```\n\n");
        }

        if !self.recommendations.is_empty() {
            md.push_str("## Proactive Recommendations\n\n");
            for rec in &self.recommendations {
                md.push_str(&format!("- **{}**: {}\n", rec.title, rec.detail));
            }
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{snapshot_with, SnapshotOptions};

    #[test]
    fn clean_report_renders_without_issue_sections() {
        let snapshot = snapshot_with(SnapshotOptions::default());
        let params = SymptomParams::new("E2EXAMPLE");
        let report = ReportBuilder::new().build(&snapshot, &params, Vec::new(), Vec::new());

        let text = report.render_text();
        assert!(text.contains("No issues found"));
        assert!(text.contains("PROACTIVE RECOMMENDATIONS"));
        assert!(report.is_clean());
    }

    #[test]
    fn proactive_checks_can_be_disabled() {
        let snapshot = snapshot_with(SnapshotOptions::default());
        let params = SymptomParams::new("E2EXAMPLE").with_proactive_checks(false);
        let report = ReportBuilder::new().build(&snapshot, &params, Vec::new(), Vec::new());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn logging_off_yields_a_logging_recommendation() {
        let snapshot = snapshot_with(SnapshotOptions {
            logging: Some(FacetState::known(crate::snapshot::model::LoggingConfig {
                enabled: false,
                bucket: None,
            })),
            ..Default::default()
        });
        let params = SymptomParams::new("E2EXAMPLE");
        let report = ReportBuilder::new().build(&snapshot, &params, Vec::new(), Vec::new());
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.title.contains("logging")));
    }
}
