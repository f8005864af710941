//! Structured classification of a diagnostic.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::domain::DomainType;

/// Primary issue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    /// Parse errors that block every other analysis
    Syntax,
    /// Import ordering, duplicates, unresolved modules
    Import,
    /// Formatting and stylistic preferences
    Style,
    /// `any` escapes, unsafe member access, compiler type errors
    TypeSafety,
    /// Unused variables, parameters and imports
    UnusedCode,
    /// Framework rules such as hook dependency arrays
    FrameworkHooks,
    /// Promise misuse
    AsyncPromise,
    /// Leftover `console` and `debugger` statements
    DebugStatement,
    /// Dangerous constructs (`eval`, object injection)
    Security,
    /// Anything the rule table does not know
    General,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Import => "import",
            Self::Style => "style",
            Self::TypeSafety => "type-safety",
            Self::UnusedCode => "unused-code",
            Self::FrameworkHooks => "framework-hooks",
            Self::AsyncPromise => "async-promise",
            Self::DebugStatement => "debug-statement",
            Self::Security => "security",
            Self::General => "general",
        }
    }

    /// Categories whose rules are well understood and safe to tune in config
    pub fn is_rule_adjustable(&self) -> bool {
        matches!(
            self,
            Self::Style | Self::Import | Self::UnusedCode | Self::DebugStatement
        )
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary plus secondary categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySet {
    pub primary: IssueCategory,
    #[serde(default)]
    pub secondary: Vec<String>,
}

/// Severity level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    /// Map a 0-100 score to a level
    pub fn from_score(score: u8) -> Self {
        match score {
            85..=u8::MAX => Self::Critical,
            65..=84 => Self::High,
            35..=64 => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn raised(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }

    pub fn lowered(self) -> Self {
        match self {
            Self::Low | Self::Medium => Self::Low,
            Self::High => Self::Medium,
            Self::Critical => Self::High,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SeverityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!(
                "Unknown severity: {}. Valid values: low, medium, high, critical",
                s
            )),
        }
    }
}

/// Severity score plus derived level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Severity {
    pub score: u8,
    pub level: SeverityLevel,
}

impl Severity {
    pub fn from_score(score: u8) -> Self {
        let score = score.min(100);
        Self {
            score,
            level: SeverityLevel::from_score(score),
        }
    }
}

/// Effort tier for a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixComplexity {
    Trivial,
    Simple,
    Moderate,
    Complex,
    ManualOnly,
}

impl FixComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trivial => "trivial",
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
            Self::ManualOnly => "manual-only",
        }
    }
}

impl fmt::Display for FixComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether and how confidently an issue can be fixed automatically
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoFixCapability {
    pub can_fix: bool,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub complexity: FixComplexity,
}

/// How an issue touches domain logic
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainImpact {
    pub affects_domain_logic: bool,
    pub special_handling_required: bool,
    pub requires_expertise: bool,
    #[serde(default)]
    pub domains: Vec<DomainType>,
}

/// Risk of changing the code to resolve the issue
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn raised(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskProfile {
    pub level: RiskLevel,
    pub breaking_change_possible: bool,
    #[serde(default)]
    pub factors: Vec<String>,
}

/// Full classification of one diagnostic occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub rule_id: String,
    pub category: CategorySet,
    pub severity: Severity,
    pub auto_fix: AutoFixCapability,
    pub domain_impact: DomainImpact,
    pub risk: RiskProfile,
    /// True when the rule id was not in the table
    #[serde(default)]
    pub fallback: bool,
}

impl Classification {
    /// Whether the executor may touch this issue without a human
    pub fn is_auto_fix_eligible(&self, min_confidence: f64) -> bool {
        self.auto_fix.can_fix
            && self.auto_fix.confidence >= min_confidence
            && self.risk.level != RiskLevel::High
            && !self.domain_impact.special_handling_required
    }
}

/// Aggregate severity over many classifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSeverity {
    pub level: SeverityLevel,
    pub mean_score: f64,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_score_boundaries() {
        assert_eq!(SeverityLevel::from_score(0), SeverityLevel::Low);
        assert_eq!(SeverityLevel::from_score(34), SeverityLevel::Low);
        assert_eq!(SeverityLevel::from_score(35), SeverityLevel::Medium);
        assert_eq!(SeverityLevel::from_score(65), SeverityLevel::High);
        assert_eq!(SeverityLevel::from_score(85), SeverityLevel::Critical);
        assert_eq!(SeverityLevel::from_score(100), SeverityLevel::Critical);
    }

    #[test]
    fn test_severity_clamps() {
        assert_eq!(Severity::from_score(250).score, 100);
    }

    #[test]
    fn test_raised_saturates() {
        assert_eq!(RiskLevel::High.raised(), RiskLevel::High);
        assert_eq!(SeverityLevel::Critical.raised(), SeverityLevel::Critical);
        assert_eq!(SeverityLevel::Low.raised(), SeverityLevel::Medium);
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&IssueCategory::TypeSafety).unwrap();
        assert_eq!(json, "\"type-safety\"");
    }
}
