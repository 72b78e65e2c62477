use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "Critical"),
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

impl Severity {
    pub fn color(&self) -> &'static str {
        match self {
            Self::Critical => "red",
            Self::High => "bright red",
            Self::Medium => "yellow",
            Self::Low => "green",
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Self::Critical => "[CRITICAL]",
            Self::High => "[HIGH]",
            Self::Medium => "[MEDIUM]",
            Self::Low => "[LOW]",
        }
    }

    pub fn escalate(&self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Critical,
            Self::Critical => Self::Critical,
        }
    }

    pub fn mitigate(&self) -> Self {
        match self {
            Self::Critical => Self::High,
            Self::High => Self::Medium,
            Self::Medium => Self::Low,
            Self::Low => Self::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Likelihood {
    Low,
    Medium,
    High,
}

impl fmt::Display for Likelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

impl Likelihood {
    pub fn percentage(&self) -> u8 {
        match self {
            Self::High => 90,
            Self::Medium => 60,
            Self::Low => 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_total_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn escalate_saturates_at_critical() {
        assert_eq!(Severity::Critical.escalate(), Severity::Critical);
        assert_eq!(Severity::Medium.escalate(), Severity::High);
        assert_eq!(Severity::Critical.mitigate(), Severity::High);
        assert_eq!(Severity::Low.mitigate(), Severity::Low);
    }

    #[test]
    fn likelihood_total_order() {
        assert!(Likelihood::High > Likelihood::Medium);
        assert!(Likelihood::Medium > Likelihood::Low);
    }
}
