//! Quality Report
//!
//! JSON for dashboards and CI, Markdown for people. Reports are written
//! under `.lintmend/reports/` with a timestamped name plus a `latest` copy.

mod recommend;
mod render;

pub use recommend::{Recommendation, recommendations};
pub use render::to_markdown;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RegressionThresholds;
use crate::executor::snapshot::write_atomic;
use crate::metrics::MetricsHistory;
use crate::types::{
    Alert, GateResult, MetricsSnapshot, RegressionReport, RemediationPlan, Result, RunResult,
    Trend,
};

/// Metrics whose trend is reported
const TRENDED_METRICS: [&str; 5] = [
    "quality_score",
    "errors",
    "warnings",
    "blocking_syntax",
    "type_safety",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_issues: usize,
    pub auto_fixable: usize,
    pub manual_review: usize,
    pub rule_adjustments: usize,
    pub ignored: usize,
    pub phases: Vec<String>,
    pub estimated_minutes: f64,
    pub success_probability: f64,
}

impl From<&RemediationPlan> for PlanSummary {
    fn from(plan: &RemediationPlan) -> Self {
        Self {
            total_issues: plan.total_issues,
            auto_fixable: plan.auto_fixable,
            manual_review: plan.manual_review,
            rule_adjustments: plan.rule_adjustments,
            ignored: plan.ignored,
            phases: plan.phases.iter().map(|p| p.id().to_string()).collect(),
            estimated_minutes: plan.estimated_minutes,
            success_probability: plan.success_probability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub dry_run: bool,
    pub success: bool,
    pub fixed_issues: usize,
    pub failed_issues: usize,
    pub would_fix: usize,
    pub rollbacks: u32,
    pub final_validation_passed: bool,
}

impl From<&RunResult> for RunSummary {
    fn from(run: &RunResult) -> Self {
        Self {
            run_id: run.run_id.clone(),
            dry_run: run.dry_run,
            success: run.success,
            fixed_issues: run.fixed_issues,
            failed_issues: run.failed_issues,
            would_fix: run.would_fix,
            rollbacks: run.metrics.rollbacks_performed,
            final_validation_passed: run.final_validation_passed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub generated_at: DateTime<Utc>,
    pub project: String,
    pub metrics: MetricsSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_score: Option<f64>,
    #[serde(default)]
    pub trends: BTreeMap<String, Trend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression: Option<RegressionReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<RunSummary>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    pub recommendations: Vec<Recommendation>,
}

/// Assembles a report from whatever the pipeline produced
pub struct ReportBuilder {
    project: String,
    metrics: MetricsSnapshot,
    previous_score: Option<f64>,
    trends: BTreeMap<String, Trend>,
    regression: Option<RegressionReport>,
    gate: Option<GateResult>,
    plan: Option<RemediationPlan>,
    run: Option<RunSummary>,
    alerts: Vec<Alert>,
}

impl ReportBuilder {
    pub fn new(project: impl Into<String>, metrics: MetricsSnapshot) -> Self {
        Self {
            project: project.into(),
            metrics,
            previous_score: None,
            trends: BTreeMap::new(),
            regression: None,
            gate: None,
            plan: None,
            run: None,
            alerts: Vec::new(),
        }
    }

    /// Pull the previous score, regression and trends from history
    pub fn history(
        mut self,
        history: &MetricsHistory,
        window: usize,
        thresholds: &RegressionThresholds,
    ) -> Self {
        self.previous_score = history.previous().map(|m| m.quality_score);
        self.regression = history.regression(thresholds);
        self.trends = TRENDED_METRICS
            .iter()
            .filter_map(|m| Some((m.to_string(), history.trend(m, window)?)))
            .collect();
        self
    }

    pub fn gate(mut self, gate: GateResult) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn plan(mut self, plan: &RemediationPlan) -> Self {
        self.plan = Some(plan.clone());
        self
    }

    pub fn run(mut self, run: &RunResult) -> Self {
        self.run = Some(run.into());
        self
    }

    pub fn alerts(mut self, alerts: Vec<Alert>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn build(self) -> QualityReport {
        let recommendations = recommendations(
            &self.metrics,
            self.gate.as_ref(),
            self.regression.as_ref(),
            self.plan.as_ref(),
        );
        QualityReport {
            generated_at: Utc::now(),
            project: self.project,
            metrics: self.metrics,
            previous_score: self.previous_score,
            trends: self.trends,
            regression: self.regression,
            gate: self.gate,
            plan: self.plan.as_ref().map(PlanSummary::from),
            run: self.run,
            alerts: self.alerts,
            recommendations,
        }
    }
}

/// Paths of the files written for one report
#[derive(Debug, Clone)]
pub struct ReportFiles {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

/// Write the report as JSON and Markdown, plus `latest.*` copies
pub fn write_report(report: &QualityReport, dir: &Path) -> Result<ReportFiles> {
    std::fs::create_dir_all(dir)?;
    let stamp = report.generated_at.format("%Y%m%dT%H%M%SZ");
    let json = serde_json::to_string_pretty(report)?;
    let markdown = to_markdown(report);

    let files = ReportFiles {
        json: dir.join(format!("report-{}.json", stamp)),
        markdown: dir.join(format!("report-{}.md", stamp)),
    };
    write_atomic(&files.json, json.as_bytes())?;
    write_atomic(&files.markdown, markdown.as_bytes())?;
    write_atomic(&dir.join("latest.json"), json.as_bytes())?;
    write_atomic(&dir.join("latest.md"), markdown.as_bytes())?;

    info!(path = %files.markdown.display(), "Wrote quality report");
    Ok(files)
}

/// Most recent report written to `dir`
pub fn load_latest(dir: &Path) -> Result<Option<QualityReport>> {
    let path = dir.join("latest.json");
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}
