//! Markdown rendering

use std::fmt::Write;

use super::QualityReport;

pub fn to_markdown(report: &QualityReport) -> String {
    let m = &report.metrics;
    let c = &m.categories;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "# Quality Report: {}", report.project);
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated {}", report.generated_at.to_rfc3339());
    let _ = writeln!(out);

    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|---|---|");
    let score = match report.previous_score {
        Some(prev) => format!("{:.1} (previous {:.1})", m.quality_score, prev),
        None => format!("{:.1}", m.quality_score),
    };
    let rows: [(&str, String); 12] = [
        ("Quality score", score),
        ("Total issues", m.total_issues.to_string()),
        ("Errors", m.errors.to_string()),
        ("Warnings", m.warnings.to_string()),
        ("Auto-fixable", m.auto_fixable.to_string()),
        ("Blocking syntax", c.blocking_syntax.to_string()),
        ("Type safety", c.type_safety.to_string()),
        ("Unused bindings", c.unused_bindings.to_string()),
        ("Hook dependencies", c.hook_dependency.to_string()),
        ("Debug statements", c.debug_statements.to_string()),
        ("Security", c.security.to_string()),
        ("Analysis time", format!("{} ms", m.performance.duration_ms)),
    ];
    for (name, value) in rows {
        let _ = writeln!(out, "| {} | {} |", name, value);
    }
    let _ = writeln!(out);

    if !report.trends.is_empty() {
        let _ = writeln!(out, "## Trends");
        let _ = writeln!(out);
        for (metric, trend) in &report.trends {
            let _ = writeln!(out, "- {}: {}", metric, trend);
        }
        let _ = writeln!(out);
    }

    if let Some(regression) = &report.regression {
        let _ = writeln!(out, "## Regression ({})", regression.severity);
        let _ = writeln!(out);
        for r in &regression.regressions {
            let _ = writeln!(
                out,
                "- {}: {} -> {} ({:+})",
                r.metric,
                r.previous,
                r.current,
                r.delta()
            );
        }
        let _ = writeln!(out);
    }

    if let Some(gate) = &report.gate {
        let verdict = if gate.passed { "PASSED" } else { "FAILED" };
        let _ = writeln!(out, "## Quality Gate: {} ({})", gate.gate, verdict);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Deployment approved: {}. Risk: {}. Confidence: {:.0}%.",
            if gate.deployment_approved { "yes" } else { "no" },
            gate.risk_level,
            gate.confidence
        );
        let _ = writeln!(out);
        if gate.violations.is_empty() {
            let _ = writeln!(out, "No violations.");
        } else {
            let _ = writeln!(out, "| Type | Severity | Metric | Actual | Limit |");
            let _ = writeln!(out, "|---|---|---|---|---|");
            for v in &gate.violations {
                let _ = writeln!(
                    out,
                    "| {:?} | {} | {} | {} | {} |",
                    v.violation_type, v.severity, v.metric, v.actual, v.limit
                );
            }
        }
        let _ = writeln!(out);
    }

    if let Some(plan) = &report.plan {
        let _ = writeln!(out, "## Remediation Plan");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} issues: {} auto-fix, {} manual review, {} rule adjustments, {} ignored.",
            plan.total_issues,
            plan.auto_fixable,
            plan.manual_review,
            plan.rule_adjustments,
            plan.ignored
        );
        let _ = writeln!(
            out,
            "Phases: {}. Estimated {:.0} minutes, success probability {:.0}%.",
            plan.phases.join(" -> "),
            plan.estimated_minutes,
            plan.success_probability * 100.0
        );
        let _ = writeln!(out);
    }

    if let Some(run) = &report.run {
        let _ = writeln!(out, "## Fix Run");
        let _ = writeln!(out);
        if run.dry_run {
            let _ = writeln!(out, "Dry run: {} issue(s) would be fixed.", run.would_fix);
        } else {
            let _ = writeln!(
                out,
                "{}: {} fixed, {} failed, {} rollback(s), final validation {}.",
                if run.success { "Succeeded" } else { "Failed" },
                run.fixed_issues,
                run.failed_issues,
                run.rollbacks,
                if run.final_validation_passed { "passed" } else { "failed" }
            );
        }
        let _ = writeln!(out);
    }

    if !report.alerts.is_empty() {
        let _ = writeln!(out, "## Alerts");
        let _ = writeln!(out);
        for alert in &report.alerts {
            let _ = writeln!(out, "- {}", alert);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Recommendations");
    let _ = writeln!(out);
    if report.recommendations.is_empty() {
        let _ = writeln!(out, "None.");
    }
    for (i, r) in report.recommendations.iter().enumerate() {
        let _ = writeln!(out, "{}. **{}**: {}", i + 1, r.priority, r.message);
    }

    out
}

#[cfg(test)]
mod tests {
    use crate::report::ReportBuilder;
    use crate::types::MetricsSnapshot;

    use super::*;

    #[test]
    fn test_markdown_sections() {
        let mut m = MetricsSnapshot::empty();
        m.errors = 3;
        m.total_issues = 3;
        m.categories.blocking_syntax = 1;
        let report = ReportBuilder::new("demo", m).build();
        let md = to_markdown(&report);
        assert!(md.starts_with("# Quality Report: demo"));
        assert!(md.contains("| Errors | 3 |"));
        assert!(md.contains("## Recommendations"));
        assert!(md.contains("1. **critical**: Fix 1 parse error(s)"));
        assert!(!md.contains("## Quality Gate"));
    }
}
