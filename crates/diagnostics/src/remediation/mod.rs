//! Remediation planning.
//!
//! The planner never executes anything. Every action is advisory text
//! with two execution paths (console steps and control-plane CLI
//! commands), an explicit verification step, and side-effect warnings
//! wherever the action would alter access policy, invalidation scope, or
//! protocol enforcement. Execution, if it happens, is a separate
//! explicitly-confirmed path outside this crate.

pub mod planner;

pub use planner::RemediationPlanner;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Effort tier. Actions within a finding are always presented quick-fix
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    QuickFix,
    Standard,
    Advanced,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuickFix => write!(f, "quick fix"),
            Self::Standard => write!(f, "standard"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAction {
    pub tier: Tier,

    pub estimated_time: String,

    pub explanation: String,

    /// Console-style instructions.
    pub declarative_steps: Vec<String>,

    /// Control-plane CLI command text. Advisory only.
    pub imperative_commands: Vec<String>,

    pub verification_steps: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub side_effect_warnings: Vec<String>,
}

impl RemediationAction {
    pub fn new(tier: Tier, estimated_time: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            tier,
            estimated_time: estimated_time.into(),
            explanation: explanation.into(),
            declarative_steps: Vec::new(),
            imperative_commands: Vec::new(),
            verification_steps: Vec::new(),
            side_effect_warnings: Vec::new(),
        }
    }

    pub fn declarative(mut self, step: impl Into<String>) -> Self {
        self.declarative_steps.push(step.into());
        self
    }

    pub fn imperative(mut self, command: impl Into<String>) -> Self {
        self.imperative_commands.push(command.into());
        self
    }

    pub fn verify(mut self, step: impl Into<String>) -> Self {
        self.verification_steps.push(step.into());
        self
    }

    pub fn warn(mut self, warning: impl Into<String>) -> Self {
        self.side_effect_warnings.push(warning.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_puts_quick_fix_first() {
        assert!(Tier::QuickFix < Tier::Standard);
        assert!(Tier::Standard < Tier::Advanced);
    }

    #[test]
    fn builder_accumulates_steps() {
        let action = RemediationAction::new(Tier::QuickFix, "~5 minutes", "do the thing")
            .declarative("open the console")
            .imperative("cloudctl cdn get-distribution --id E2X")
            .verify("request the path again")
            .warn("changes take minutes to propagate");
        assert_eq!(action.declarative_steps.len(), 1);
        assert_eq!(action.imperative_commands.len(), 1);
        assert_eq!(action.verification_steps.len(), 1);
        assert_eq!(action.side_effect_warnings.len(), 1);
    }
}
