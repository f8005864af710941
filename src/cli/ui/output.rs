use console::{StyledObject, style};

use crate::types::{GateResult, MetricsSnapshot, SeverityLevel};

/// Score at or above which the score prints green
const GOOD_SCORE: f64 = 80.0;
/// Score below which the score prints red
const POOR_SCORE: f64 = 60.0;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Aligned `label: value` line
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<20} {}", format!("{}:", label), value);
    }

    pub fn metrics(&self, m: &MetricsSnapshot) {
        self.section("Quality Metrics");
        self.field("Quality score", score(m.quality_score));
        self.field("Total issues", m.total_issues);
        self.field("Errors", m.errors);
        self.field("Warnings", m.warnings);
        self.field("Auto-fixable", m.auto_fixable);
        let c = &m.categories;
        if c.blocking_syntax > 0 {
            self.field("Blocking syntax", style(c.blocking_syntax).red().bold());
        }
        self.field("Type safety", c.type_safety);
        self.field("Unused bindings", c.unused_bindings);
        self.field("Hook dependencies", c.hook_dependency);
        self.field("Debug statements", c.debug_statements);
        if c.security > 0 {
            self.field("Security", style(c.security).yellow());
        }
        self.field(
            "Analysis time",
            format!("{} ms", m.performance.duration_ms),
        );
    }

    pub fn gate(&self, result: &GateResult) {
        self.section(&format!("Quality Gate: {}", result.gate));
        let verdict = if result.passed {
            style("PASSED").green().bold()
        } else {
            style("FAILED").red().bold()
        };
        self.field("Result", verdict);
        self.field(
            "Deployment",
            if result.deployment_approved {
                style("approved").green()
            } else {
                style("blocked").red()
            },
        );
        self.field("Risk", severity(result.risk_level));
        self.field("Confidence", format!("{:.0}%", result.confidence));
        for v in &result.violations {
            println!(
                "  {} {} {} (actual {}, limit {})",
                severity(v.severity),
                style(&v.metric).bold(),
                v.message,
                v.actual,
                v.limit
            );
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

pub fn score(value: f64) -> StyledObject<String> {
    let text = format!("{:.1}", value);
    if value >= GOOD_SCORE {
        style(text).green()
    } else if value >= POOR_SCORE {
        style(text).yellow()
    } else {
        style(text).red()
    }
}

pub fn severity(level: SeverityLevel) -> StyledObject<String> {
    let text = format!("[{}]", level);
    match level {
        SeverityLevel::Critical => style(text).red().bold(),
        SeverityLevel::High => style(text).red(),
        SeverityLevel::Medium => style(text).yellow(),
        SeverityLevel::Low => style(text).dim(),
    }
}
