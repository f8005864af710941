//! Regression detection between consecutive snapshots

use crate::config::RegressionThresholds;
use crate::types::{MetricRegression, MetricsSnapshot, RegressionReport, RegressionSeverity};

/// Count metrics where an increase is a regression
const COUNT_METRICS: [&str; 11] = [
    "total_issues",
    "errors",
    "warnings",
    "blocking_syntax",
    "type_safety",
    "type_errors",
    "unused_bindings",
    "hook_dependency",
    "debug_statements",
    "import_errors",
    "security",
];

/// Compare `current` to `previous`; `None` when nothing regressed
pub fn detect_regression(
    previous: &MetricsSnapshot,
    current: &MetricsSnapshot,
    thresholds: &RegressionThresholds,
) -> Option<RegressionReport> {
    let mut regressions = Vec::new();

    for metric in COUNT_METRICS {
        let (Some(prev), Some(curr)) = (previous.value(metric), current.value(metric)) else {
            continue;
        };
        if curr > prev * thresholds.count_ratio {
            regressions.push(MetricRegression {
                metric: metric.to_string(),
                previous: prev,
                current: curr,
            });
        }
    }

    if current.quality_score < previous.quality_score - thresholds.score_drop {
        regressions.push(MetricRegression {
            metric: "quality_score".to_string(),
            previous: previous.quality_score,
            current: current.quality_score,
        });
    }

    if regressions.is_empty() {
        return None;
    }

    // Once something regressed, any syntax increase makes it critical
    let syntax_increase = current.categories.blocking_syntax > previous.categories.blocking_syntax;
    let type_safety_increase = current
        .categories
        .type_safety
        .saturating_sub(previous.categories.type_safety);

    let severity = if syntax_increase {
        RegressionSeverity::Critical
    } else if type_safety_increase > thresholds.major_type_safety_increase {
        RegressionSeverity::Major
    } else if regressions.len() > thresholds.moderate_metric_count {
        RegressionSeverity::Moderate
    } else {
        RegressionSeverity::Minor
    };

    Some(RegressionReport {
        regressions,
        severity,
        previous_timestamp: previous.timestamp,
        current_timestamp: current.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MetricsSnapshot {
        let mut m = MetricsSnapshot::empty();
        m.total_issues = 100;
        m.errors = 40;
        m.warnings = 60;
        m.categories.type_safety = 20;
        m.quality_score = 70.0;
        m
    }

    #[test]
    fn test_no_change_is_no_regression() {
        let t = RegressionThresholds::default();
        assert!(detect_regression(&base(), &base(), &t).is_none());
    }

    #[test]
    fn test_ten_percent_band() {
        let t = RegressionThresholds::default();
        let mut current = base();
        current.warnings = 66; // exactly 1.1x is not a regression
        assert!(detect_regression(&base(), &current, &t).is_none());

        current.warnings = 67;
        let report = detect_regression(&base(), &current, &t).unwrap();
        assert_eq!(report.regressions.len(), 1);
        assert_eq!(report.regressions[0].metric, "warnings");
        assert_eq!(report.severity, RegressionSeverity::Minor);
    }

    #[test]
    fn test_syntax_within_band_is_no_regression() {
        let t = RegressionThresholds::default();
        let mut previous = base();
        previous.categories.blocking_syntax = 10;
        let mut current = previous.clone();
        current.categories.blocking_syntax = 11;
        assert!(detect_regression(&previous, &current, &t).is_none());
    }

    #[test]
    fn test_syntax_regression_is_critical() {
        let t = RegressionThresholds::default();
        let mut previous = base();
        previous.categories.blocking_syntax = 10;
        let mut current = previous.clone();
        current.categories.blocking_syntax = 12;
        let report = detect_regression(&previous, &current, &t).unwrap();
        assert_eq!(report.regressions[0].metric, "blocking_syntax");
        assert_eq!(report.severity, RegressionSeverity::Critical);

        // The first syntax error on a clean tree is past any band
        let mut current = base();
        current.categories.blocking_syntax = 1;
        let report = detect_regression(&base(), &current, &t).unwrap();
        assert_eq!(report.severity, RegressionSeverity::Critical);
    }

    #[test]
    fn test_syntax_increase_raises_other_regression_to_critical() {
        let t = RegressionThresholds::default();
        let mut previous = base();
        previous.categories.blocking_syntax = 10;
        let mut current = previous.clone();
        current.categories.blocking_syntax = 11;
        current.warnings = 90;
        let report = detect_regression(&previous, &current, &t).unwrap();
        assert_eq!(report.regressions.len(), 1);
        assert_eq!(report.severity, RegressionSeverity::Critical);
    }

    #[test]
    fn test_type_safety_jump_is_major() {
        let t = RegressionThresholds::default();
        let mut current = base();
        current.categories.type_safety = 71;
        let report = detect_regression(&base(), &current, &t).unwrap();
        assert_eq!(report.severity, RegressionSeverity::Major);
    }

    #[test]
    fn test_many_metrics_is_moderate() {
        let t = RegressionThresholds::default();
        let mut current = base();
        current.total_issues = 150;
        current.errors = 60;
        current.warnings = 90;
        current.quality_score = 60.0;
        let report = detect_regression(&base(), &current, &t).unwrap();
        assert_eq!(report.regressions.len(), 4);
        assert_eq!(report.severity, RegressionSeverity::Moderate);
    }

    #[test]
    fn test_score_drop() {
        let t = RegressionThresholds::default();
        let mut current = base();
        current.quality_score = 65.0;
        assert!(detect_regression(&base(), &current, &t).is_none());
        current.quality_score = 64.9;
        assert!(detect_regression(&base(), &current, &t).is_some());
    }
}
