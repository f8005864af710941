//! Executor run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::PhaseKind;
use super::validation::{ValidationKind, ValidationResult};

/// A single issue that could not be fixed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixError {
    pub file: String,
    pub line: u32,
    pub rule_id: String,
    pub message: String,
}

/// A fix that was applied and then undone by a rollback. The issue is
/// still open and a later run may retry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolledBackIssue {
    pub file: String,
    pub line: u32,
    pub rule_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchStatus {
    Committed,
    RolledBack,
    /// Nothing changed on disk
    NoChanges,
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub index: usize,
    pub phase: PhaseKind,
    pub files: Vec<String>,
    pub attempted: usize,
    pub fixed: usize,
    pub skipped: usize,
    pub status: BatchStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rolled_back_issues: Vec<RolledBackIssue>,
}

/// Where and why a run stopped early
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbortContext {
    pub phase: PhaseKind,
    pub batch: usize,
    pub validation: Option<ValidationKind>,
    pub reason: String,
    pub rollback_attempted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_time_ms: u64,
    pub rollbacks_performed: u32,
    pub batches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub dry_run: bool,
    pub success: bool,
    pub fixed_issues: usize,
    pub failed_issues: usize,
    /// Issues that would be fixed (dry run only)
    #[serde(default)]
    pub would_fix: usize,
    pub processed_files: Vec<String>,
    pub errors: Vec<FixError>,
    pub validation_results: Vec<ValidationResult>,
    pub batches: Vec<BatchOutcome>,
    pub metrics: RunMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<AbortContext>,
    pub final_validation_passed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn rolled_back(&self) -> bool {
        self.metrics.rollbacks_performed > 0
    }

    /// Fixes undone by rollbacks, in batch order
    pub fn rolled_back_issues(&self) -> impl Iterator<Item = &RolledBackIssue> {
        self.batches.iter().flat_map(|b| b.rolled_back_issues.iter())
    }
}
