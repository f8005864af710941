//! Quality metrics snapshots and regression results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named diagnostic buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    /// Parse errors; these block every other analysis
    pub blocking_syntax: usize,
    pub type_safety: usize,
    /// Compiler type errors (`TSxxxx`)
    pub type_errors: usize,
    pub unused_bindings: usize,
    pub hook_dependency: usize,
    pub debug_statements: usize,
    pub import_errors: usize,
    pub security: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCounts {
    pub calculation_critical: usize,
    pub automation_pipeline: usize,
    pub test: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub duration_ms: u64,
    pub memory_mb: f64,
    /// 0.0 - 1.0
    pub cache_hit_rate: f64,
}

/// Point-in-time quality measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    #[serde(default)]
    pub auto_fixable: usize,
    pub categories: CategoryCounts,
    pub domains: DomainCounts,
    pub performance: PerformanceMetrics,
    pub quality_score: f64,
}

impl MetricsSnapshot {
    /// Metric names usable in gate thresholds, alert rules and trends
    pub const METRIC_NAMES: [&'static str; 15] = [
        "total_issues",
        "errors",
        "warnings",
        "quality_score",
        "blocking_syntax",
        "type_safety",
        "type_errors",
        "unused_bindings",
        "hook_dependency",
        "debug_statements",
        "import_errors",
        "security",
        "duration_ms",
        "memory_mb",
        "cache_hit_rate",
    ];

    pub fn empty() -> Self {
        Self {
            timestamp: Utc::now(),
            total_issues: 0,
            errors: 0,
            warnings: 0,
            auto_fixable: 0,
            categories: CategoryCounts::default(),
            domains: DomainCounts::default(),
            performance: PerformanceMetrics::default(),
            quality_score: 100.0,
        }
    }

    /// Look up a metric by name
    pub fn value(&self, metric: &str) -> Option<f64> {
        let c = &self.categories;
        let v = match metric {
            "total_issues" => self.total_issues as f64,
            "errors" => self.errors as f64,
            "warnings" => self.warnings as f64,
            "auto_fixable" => self.auto_fixable as f64,
            "quality_score" => self.quality_score,
            "blocking_syntax" => c.blocking_syntax as f64,
            "type_safety" => c.type_safety as f64,
            "type_errors" => c.type_errors as f64,
            "unused_bindings" => c.unused_bindings as f64,
            "hook_dependency" => c.hook_dependency as f64,
            "debug_statements" => c.debug_statements as f64,
            "import_errors" => c.import_errors as f64,
            "security" => c.security as f64,
            "calculation_critical" => self.domains.calculation_critical as f64,
            "automation_pipeline" => self.domains.automation_pipeline as f64,
            "test" => self.domains.test as f64,
            "duration_ms" => self.performance.duration_ms as f64,
            "memory_mb" => self.performance.memory_mb,
            "cache_hit_rate" => self.performance.cache_hit_rate,
            _ => return None,
        };
        Some(v)
    }

    pub fn is_known_metric(metric: &str) -> bool {
        Self::METRIC_NAMES.contains(&metric)
            || matches!(
                metric,
                "auto_fixable" | "calculation_critical" | "automation_pipeline" | "test"
            )
    }

    /// Errors outside the blocking-syntax and type-safety buckets
    pub fn other_errors(&self) -> usize {
        self.errors
            .saturating_sub(self.categories.blocking_syntax)
            .saturating_sub(self.categories.type_safety)
    }

    pub fn auto_fixable_ratio(&self) -> f64 {
        if self.total_issues == 0 {
            0.0
        } else {
            self.auto_fixable as f64 / self.total_issues as f64
        }
    }
}

// =============================================================================
// Regression
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegressionSeverity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl fmt::Display for RegressionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minor => write!(f, "minor"),
            Self::Moderate => write!(f, "moderate"),
            Self::Major => write!(f, "major"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRegression {
    pub metric: String,
    pub previous: f64,
    pub current: f64,
}

impl MetricRegression {
    pub fn delta(&self) -> f64 {
        self.current - self.previous
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub regressions: Vec<MetricRegression>,
    pub severity: RegressionSeverity,
    pub previous_timestamp: DateTime<Utc>,
    pub current_timestamp: DateTime<Utc>,
}

/// Direction of a metric over a window of snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Improving => write!(f, "improving"),
            Self::Declining => write!(f, "declining"),
            Self::Stable => write!(f, "stable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_lookup() {
        let mut m = MetricsSnapshot::empty();
        m.errors = 4;
        m.categories.blocking_syntax = 1;
        m.performance.memory_mb = 512.0;
        assert_eq!(m.value("errors"), Some(4.0));
        assert_eq!(m.value("blocking_syntax"), Some(1.0));
        assert_eq!(m.value("memory_mb"), Some(512.0));
        assert_eq!(m.value("bogus"), None);
        for name in MetricsSnapshot::METRIC_NAMES {
            assert!(m.value(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_other_errors_saturates() {
        let mut m = MetricsSnapshot::empty();
        m.errors = 3;
        m.categories.blocking_syntax = 2;
        m.categories.type_safety = 5;
        assert_eq!(m.other_errors(), 0);
    }
}
