//! Domain context types
//!
//! A file's domain drives special handling: rule overrides, identifiers that
//! must survive remediation, and risk factors surfaced to reviewers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inferred sensitivity domain of a file
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum DomainType {
    CalculationCritical,
    AutomationPipeline,
    Test,
    Script,
    Component,
    Service,
    #[default]
    Utility,
    Config,
}

impl DomainType {
    pub const ALL: [DomainType; 8] = [
        Self::CalculationCritical,
        Self::AutomationPipeline,
        Self::Test,
        Self::Script,
        Self::Component,
        Self::Service,
        Self::Utility,
        Self::Config,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CalculationCritical => "calculation-critical",
            Self::AutomationPipeline => "automation-pipeline",
            Self::Test => "test",
            Self::Script => "script",
            Self::Component => "component",
            Self::Service => "service",
            Self::Utility => "utility",
            Self::Config => "config",
        }
    }

    /// Domains whose code changes need expert review
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Self::CalculationCritical | Self::AutomationPipeline)
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DomainType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|d| d.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown domain type: {}", s))
    }
}

/// Kind of rule override recommended for a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum RuleAction {
    Disable,
    Modify {
        parameters: serde_json::Map<String, serde_json::Value>,
    },
    Enhance,
    Monitor,
}

impl RuleAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Modify { .. } => "modify",
            Self::Enhance => "enhance",
            Self::Monitor => "monitor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialRule {
    pub rule_id: String,
    #[serde(flatten)]
    pub action: RuleAction,
    pub reason: String,
}

/// Identifier names that must never be renamed or removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreservationRequirement {
    /// Regex over identifier names
    pub pattern: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub description: String,
    pub severity: super::classification::SeverityLevel,
    pub mitigation: String,
}

/// Detected context of a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainContext {
    pub domain: DomainType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub special_rules: Vec<SpecialRule>,
    #[serde(default)]
    pub preservation: Vec<PreservationRequirement>,
    #[serde(default)]
    pub risk_factors: Vec<RiskFactor>,
}

impl DomainContext {
    /// Context used when no pattern matches
    pub fn fallback() -> Self {
        Self {
            domain: DomainType::Utility,
            subtype: None,
            confidence: 0.3,
            special_rules: Vec::new(),
            preservation: Vec::new(),
            risk_factors: Vec::new(),
        }
    }

    pub fn is_sensitive(&self) -> bool {
        self.domain.is_sensitive()
    }

    /// Rule override recommended for `rule_id`, if any
    pub fn rule_override(&self, rule_id: &str) -> Option<&SpecialRule> {
        self.special_rules.iter().find(|r| r.rule_id == rule_id)
    }
}
