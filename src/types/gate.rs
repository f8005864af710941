//! Quality gate policies and evaluation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::classification::SeverityLevel;

/// Threshold values; `None` disables a check
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_errors: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_warnings: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_type_safety: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_ms: Option<u64>,
}

/// Any non-zero count in a flagged bucket blocks the gate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockerFlags {
    #[serde(default)]
    pub blocking_syntax: bool,
    #[serde(default)]
    pub type_errors: bool,
    #[serde(default)]
    pub import_errors: bool,
    #[serde(default)]
    pub security: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    #[default]
    Passing,
    Warning,
    Failing,
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passing => write!(f, "passing"),
            Self::Warning => write!(f, "warning"),
            Self::Failing => write!(f, "failing"),
        }
    }
}

/// Named pass/fail policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGate {
    pub name: String,
    #[serde(default)]
    pub thresholds: GateThresholds,
    #[serde(default)]
    pub blockers: BlockerFlags,
    /// Metric names exempt from evaluation
    #[serde(default)]
    pub exemptions: Vec<String>,
    #[serde(default)]
    pub last_status: GateStatus,
}

impl QualityGate {
    pub fn is_exempt(&self, metric: &str) -> bool {
        self.exemptions.iter().any(|e| e == metric)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationType {
    Error,
    Warning,
    Performance,
    Blocker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub violation_type: ViolationType,
    pub severity: SeverityLevel,
    pub metric: String,
    pub actual: f64,
    pub limit: f64,
    pub message: String,
}

impl Violation {
    /// Blocks the gate on its own
    pub fn is_blocking(&self) -> bool {
        self.violation_type == ViolationType::Blocker || self.severity == SeverityLevel::Critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate: String,
    pub passed: bool,
    pub deployment_approved: bool,
    pub status: GateStatus,
    pub violations: Vec<Violation>,
    pub risk_level: SeverityLevel,
    /// 0 - 100
    pub confidence: f64,
    pub evaluated_at: DateTime<Utc>,
}
