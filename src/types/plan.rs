//! Remediation strategies and phased plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::classification::{Classification, RiskLevel};
use super::diagnostic::Diagnostic;
use super::domain::DomainType;

// =============================================================================
// Strategy
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyType {
    AutoFix,
    ManualReview,
    RuleAdjustment,
    Ignore,
}

impl StrategyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoFix => "auto-fix",
            Self::ManualReview => "manual-review",
            Self::RuleAdjustment => "rule-adjustment",
            Self::Ignore => "ignore",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one issue will be resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionStrategy {
    pub strategy_type: StrategyType,
    /// Minutes of effort for this issue
    pub estimated_minutes: f64,
    pub risk: RiskLevel,
    pub rationale: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

/// An issue together with everything the planner and executor need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedIssue {
    pub diagnostic: Diagnostic,
    pub classification: Classification,
    pub strategy: ResolutionStrategy,
    pub domain: DomainType,
    /// Identifier patterns from the file's domain that fixes must not touch
    #[serde(default)]
    pub preserve_patterns: Vec<String>,
}

impl PlannedIssue {
    pub fn is_auto_fix(&self) -> bool {
        self.strategy.strategy_type == StrategyType::AutoFix
    }
}

// =============================================================================
// Phases
// =============================================================================

/// Canonical phases, listed in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseKind {
    AutoFix,
    ImportStyle,
    TypeSafety,
    FrameworkSpecific,
    DomainSpecific,
}

impl PhaseKind {
    pub const ORDER: [PhaseKind; 5] = [
        Self::AutoFix,
        Self::ImportStyle,
        Self::TypeSafety,
        Self::FrameworkSpecific,
        Self::DomainSpecific,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoFix => "auto-fix",
            Self::ImportStyle => "import-style",
            Self::TypeSafety => "type-safety",
            Self::FrameworkSpecific => "framework-specific",
            Self::DomainSpecific => "domain-specific",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub kind: PhaseKind,
    pub issues: Vec<PlannedIssue>,
    pub estimated_minutes: f64,
    pub risk_level: RiskLevel,
    /// Phases that must complete first
    pub dependencies: Vec<PhaseKind>,
}

impl Phase {
    pub fn id(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn auto_fix_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_auto_fix()).count()
    }
}

/// Ordered, dependency-aware remediation plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationPlan {
    /// Phases in a valid execution order
    pub phases: Vec<Phase>,
    pub total_issues: usize,
    pub auto_fixable: usize,
    pub manual_review: usize,
    pub rule_adjustments: usize,
    pub ignored: usize,
    pub estimated_minutes: f64,
    pub success_probability: f64,
    pub created_at: DateTime<Utc>,
}

impl RemediationPlan {
    pub fn phase(&self, kind: PhaseKind) -> Option<&Phase> {
        self.phases.iter().find(|p| p.kind == kind)
    }

    pub fn execution_order(&self) -> Vec<PhaseKind> {
        self.phases.iter().map(|p| p.kind).collect()
    }

    /// Auto-fix issues in execution order
    pub fn auto_fix_issues(&self) -> impl Iterator<Item = (PhaseKind, &PlannedIssue)> {
        self.phases
            .iter()
            .flat_map(|p| p.issues.iter().map(move |i| (p.kind, i)))
            .filter(|(_, i)| i.is_auto_fix())
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_matches_ord() {
        let mut sorted = PhaseKind::ORDER;
        sorted.sort();
        assert_eq!(sorted, PhaseKind::ORDER);
    }

    #[test]
    fn test_phase_kind_display() {
        assert_eq!(PhaseKind::AutoFix.to_string(), "auto-fix");
        assert_eq!(PhaseKind::FrameworkSpecific.to_string(), "framework-specific");
        assert_eq!(StrategyType::ManualReview.to_string(), "manual-review");
    }
}
