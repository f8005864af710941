//! Gate evaluation
//!
//! Thresholds produce error, warning and performance violations whose
//! severity grows with how far the limit is exceeded. Blocker flags turn any
//! non-zero count in their bucket into a blocker violation.

use chrono::Utc;
use tracing::debug;

use crate::types::{
    GateResult, GateStatus, MetricsSnapshot, QualityGate, SeverityLevel, Violation, ViolationType,
};

/// Errors above which risk is at least high
const HIGH_RISK_ERRORS: usize = 50;
const MEDIUM_RISK_ERRORS: usize = 10;
const HIGH_RISK_VIOLATIONS: usize = 5;
const MEDIUM_RISK_VIOLATIONS: usize = 10;

const CRITICAL_PENALTY: f64 = 30.0;
const HIGH_PENALTY: f64 = 15.0;
const MEDIUM_PENALTY: f64 = 5.0;
const AUTO_FIX_BONUS: f64 = 20.0;

/// Score points below the minimum at which the violation becomes high
const SCORE_HIGH_MARGIN: f64 = 20.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct GateEvaluator;

impl GateEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, gate: &QualityGate, metrics: &MetricsSnapshot) -> GateResult {
        let violations = violations(gate, metrics);
        let passed = !violations.iter().any(Violation::is_blocking);
        let within_errors = gate
            .thresholds
            .max_errors
            .is_none_or(|max| metrics.errors <= max || gate.is_exempt("errors"));

        let status = if !passed {
            GateStatus::Failing
        } else if violations.is_empty() {
            GateStatus::Passing
        } else {
            GateStatus::Warning
        };

        debug!(
            gate = %gate.name,
            violations = violations.len(),
            passed,
            "Evaluated quality gate"
        );

        GateResult {
            gate: gate.name.clone(),
            passed,
            deployment_approved: passed && within_errors,
            status,
            risk_level: risk_level(&violations, metrics.errors),
            confidence: confidence(&violations, metrics.auto_fixable_ratio()),
            violations,
            evaluated_at: Utc::now(),
        }
    }
}

fn violations(gate: &QualityGate, m: &MetricsSnapshot) -> Vec<Violation> {
    let t = &gate.thresholds;
    let mut out = Vec::new();

    let mut over = |violation_type, metric: &str, actual: f64, limit: Option<f64>, severity: fn(f64, f64) -> SeverityLevel| {
        let Some(limit) = limit else { return };
        if gate.is_exempt(metric) || actual <= limit {
            return;
        }
        out.push(Violation {
            violation_type,
            severity: severity(actual, limit),
            metric: metric.to_string(),
            actual,
            limit,
            message: format!("{} is {} (limit {})", metric, actual, limit),
        });
    };

    over(
        ViolationType::Error,
        "errors",
        m.errors as f64,
        t.max_errors.map(|v| v as f64),
        count_severity,
    );
    over(
        ViolationType::Error,
        "type_safety",
        m.categories.type_safety as f64,
        t.max_type_safety.map(|v| v as f64),
        count_severity,
    );
    over(
        ViolationType::Warning,
        "warnings",
        m.warnings as f64,
        t.max_warnings.map(|v| v as f64),
        |actual, limit| count_severity(actual, limit).lowered(),
    );
    over(
        ViolationType::Performance,
        "duration_ms",
        m.performance.duration_ms as f64,
        t.max_duration_ms.map(|v| v as f64),
        |actual, limit| count_severity(actual, limit).lowered(),
    );

    if let Some(min) = t.min_quality_score
        && !gate.is_exempt("quality_score")
        && m.quality_score < min
    {
        let severity = if m.quality_score < min - SCORE_HIGH_MARGIN {
            SeverityLevel::High
        } else {
            SeverityLevel::Medium
        };
        out.push(Violation {
            violation_type: ViolationType::Error,
            severity,
            metric: "quality_score".to_string(),
            actual: m.quality_score,
            limit: min,
            message: format!("quality score {:.1} is below {:.1}", m.quality_score, min),
        });
    }

    let b = &gate.blockers;
    let c = &m.categories;
    let blockers = [
        (b.blocking_syntax, "blocking_syntax", c.blocking_syntax, "parse errors block analysis"),
        (b.type_errors, "type_errors", c.type_errors, "type errors present"),
        (b.import_errors, "import_errors", c.import_errors, "unresolved imports present"),
        (b.security, "security", c.security, "security findings present"),
    ];
    for (enabled, metric, count, what) in blockers {
        if enabled && count > 0 && !gate.is_exempt(metric) {
            out.push(Violation {
                violation_type: ViolationType::Blocker,
                severity: SeverityLevel::Critical,
                metric: metric.to_string(),
                actual: count as f64,
                limit: 0.0,
                message: format!("{}: {}", what, count),
            });
        }
    }

    out
}

/// More than double the limit is high, anything else over it medium
fn count_severity(actual: f64, limit: f64) -> SeverityLevel {
    if actual > (limit * 2.0).max(1.0) {
        SeverityLevel::High
    } else {
        SeverityLevel::Medium
    }
}

fn count_level(violations: &[Violation], level: SeverityLevel) -> usize {
    violations.iter().filter(|v| v.severity == level).count()
}

fn risk_level(violations: &[Violation], errors: usize) -> SeverityLevel {
    if violations.iter().any(Violation::is_blocking) {
        SeverityLevel::Critical
    } else if errors > HIGH_RISK_ERRORS
        || count_level(violations, SeverityLevel::High) >= HIGH_RISK_VIOLATIONS
    {
        SeverityLevel::High
    } else if errors > MEDIUM_RISK_ERRORS
        || count_level(violations, SeverityLevel::Medium) >= MEDIUM_RISK_VIOLATIONS
    {
        SeverityLevel::Medium
    } else {
        SeverityLevel::Low
    }
}

fn confidence(violations: &[Violation], auto_fixable_ratio: f64) -> f64 {
    let penalty = count_level(violations, SeverityLevel::Critical) as f64 * CRITICAL_PENALTY
        + count_level(violations, SeverityLevel::High) as f64 * HIGH_PENALTY
        + count_level(violations, SeverityLevel::Medium) as f64 * MEDIUM_PENALTY;
    (100.0 - penalty + AUTO_FIX_BONUS * auto_fixable_ratio.clamp(0.0, 1.0)).clamp(0.0, 100.0)
}
