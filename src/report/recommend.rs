//! Recommendations derived from metrics, gate outcome, regressions and plan

use serde::{Deserialize, Serialize};

use crate::types::{
    GateResult, MetricsSnapshot, RegressionReport, RegressionSeverity, RemediationPlan,
    SeverityLevel, ViolationType,
};

/// Quality score at or above which the codebase counts as healthy
const HEALTHY_SCORE: f64 = 90.0;

/// Type-safety issues above which the recommendation is high priority
const TYPE_SAFETY_HIGH: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: SeverityLevel,
    pub message: String,
}

impl Recommendation {
    fn new(priority: SeverityLevel, message: impl Into<String>) -> Self {
        Self {
            priority,
            message: message.into(),
        }
    }
}

/// Highest priority first; ties keep insertion order
pub fn recommendations(
    metrics: &MetricsSnapshot,
    gate: Option<&GateResult>,
    regression: Option<&RegressionReport>,
    plan: Option<&RemediationPlan>,
) -> Vec<Recommendation> {
    use SeverityLevel::*;

    let c = &metrics.categories;
    let mut out = Vec::new();

    if c.blocking_syntax > 0 {
        out.push(Recommendation::new(
            Critical,
            format!(
                "Fix {} parse error(s) first: they block analysis of the affected files",
                c.blocking_syntax
            ),
        ));
    }

    if let Some(gate) = gate {
        for v in gate
            .violations
            .iter()
            .filter(|v| v.violation_type == ViolationType::Blocker && v.metric != "blocking_syntax")
        {
            out.push(Recommendation::new(
                Critical,
                format!("Clear the '{}' blocker for the {} gate: {}", v.metric, gate.gate, v.message),
            ));
        }
        if gate.passed && !gate.deployment_approved {
            out.push(Recommendation::new(
                High,
                format!("Reduce errors to the {} gate limit to approve deployment", gate.gate),
            ));
        }
    }

    if c.security > 0 {
        out.push(Recommendation::new(
            High,
            format!("Review {} security finding(s) manually", c.security),
        ));
    }

    if let Some(report) = regression
        && report.severity >= RegressionSeverity::Major
    {
        let metrics: Vec<&str> = report.regressions.iter().map(|r| r.metric.as_str()).collect();
        out.push(Recommendation::new(
            High,
            format!(
                "Investigate the {} regression in {} since the previous snapshot",
                report.severity,
                metrics.join(", ")
            ),
        ));
    }

    if c.type_safety > 0 {
        let priority = if c.type_safety > TYPE_SAFETY_HIGH { High } else { Medium };
        out.push(Recommendation::new(
            priority,
            format!(
                "Replace dynamic type escapes and fix type errors ({} issue(s))",
                c.type_safety
            ),
        ));
    }

    if c.hook_dependency > 0 {
        out.push(Recommendation::new(
            Medium,
            format!("Review {} hook dependency array(s)", c.hook_dependency),
        ));
    }

    if let Some(plan) = plan {
        if plan.auto_fixable > 0 {
            out.push(Recommendation::new(
                Medium,
                format!(
                    "Run 'lintmend fix' to resolve {} issue(s) automatically",
                    plan.auto_fixable
                ),
            ));
        }
        if plan.manual_review > 0 {
            out.push(Recommendation::new(
                Low,
                format!(
                    "{} issue(s) need manual review (about {:.0} minutes)",
                    plan.manual_review, plan.estimated_minutes
                ),
            ));
        }
    }

    if c.debug_statements > 0 {
        out.push(Recommendation::new(
            Low,
            format!("Remove {} leftover debug statement(s)", c.debug_statements),
        ));
    }

    if out.is_empty() && metrics.quality_score >= HEALTHY_SCORE {
        out.push(Recommendation::new(
            Low,
            "Quality is healthy; keep the quality gate in CI to hold the line",
        ));
    }

    // Stable sort keeps insertion order within a priority
    out.sort_by(|a, b| b.priority.cmp(&a.priority));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy() {
        let recs = recommendations(&MetricsSnapshot::empty(), None, None, None);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, SeverityLevel::Low);
    }

    #[test]
    fn test_syntax_comes_first() {
        let mut m = MetricsSnapshot::empty();
        m.categories.debug_statements = 3;
        m.categories.type_safety = 80;
        m.categories.blocking_syntax = 2;
        let recs = recommendations(&m, None, None, None);
        let priorities: Vec<_> = recs.iter().map(|r| r.priority).collect();
        assert_eq!(
            priorities,
            vec![SeverityLevel::Critical, SeverityLevel::High, SeverityLevel::Low]
        );
        assert!(recs[0].message.contains("2 parse error"));
    }
}
