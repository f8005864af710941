//! Status Command
//!
//! Display lintmend project status from recorded data. Never runs the
//! analyzer.

use console::style;

use crate::cli::ui::Output;
use crate::cli::ui::output::score;
use crate::cli::util::{CommandContext, is_initialized};
use crate::metrics::MetricsHistory;
use crate::types::Result;

/// Recent runs and alerts shown
const RECENT: usize = 5;

pub fn run(format: &str) -> Result<()> {
    let json_output = format == "json";

    if !is_initialized() {
        if json_output {
            println!("{{\"status\": \"not_initialized\"}}");
        } else {
            println!("lintmend Status");
            println!("══════════════════════════════════════");
            println!("Not initialized. Run 'lintmend init' first.");
        }
        // Informational command; not initialized is not an error
        return Ok(());
    }

    let ctx = CommandContext::load()?;
    let history = MetricsHistory::with_database(ctx.db.clone(), ctx.config.metrics.history_capacity)?;
    let gates = ctx
        .config
        .gates
        .iter()
        .filter_map(|g| ctx.db.latest_gate_result(&g.name).transpose())
        .collect::<Result<Vec<_>>>()?;
    let runs = ctx.db.recent_runs(RECENT)?;
    let alerts = ctx.db.recent_alerts(RECENT)?;
    let suppressed = ctx.db.suppressed_metrics()?;

    if json_output {
        let status = serde_json::json!({
            "status": "initialized",
            "project": ctx.config.project.name,
            "snapshots": history.len(),
            "latest": history.latest(),
            "gates": gates,
            "runs": runs,
            "alerts": alerts,
            "suppressed": suppressed,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("lintmend Status");
    println!("══════════════════════════════════════");
    if let Some(name) = &ctx.config.project.name {
        println!("Project: {}", name);
    }

    let output = Output::new();
    match history.latest() {
        Some(latest) => {
            output.field("Snapshots", history.len());
            output.field("Quality score", score(latest.quality_score));
            output.field("Issues", latest.total_issues);
            if let Some(trend) = history.trend("quality_score", ctx.config.metrics.trend_window) {
                output.field("Trend", trend);
            }
        }
        None => output.info("No metrics recorded yet. Run 'lintmend analyze'."),
    }

    if !gates.is_empty() {
        output.section("Gates");
        for g in &gates {
            let verdict = if g.passed {
                style("passed").green()
            } else {
                style("failed").red()
            };
            println!(
                "  {:<14} {} {}",
                g.gate,
                verdict,
                style(g.evaluated_at.format("%Y-%m-%d %H:%M")).dim()
            );
        }
    }

    if !runs.is_empty() {
        output.section("Recent Fix Runs");
        for r in &runs {
            println!(
                "  {} {} fixed, {} failed, {} rollback(s) {}",
                if r.success { style("✓").green() } else { style("✗").red() },
                r.fixed_issues,
                r.failed_issues,
                r.metrics.rollbacks_performed,
                style(r.started_at.format("%Y-%m-%d %H:%M")).dim()
            );
        }
    }

    if !alerts.is_empty() {
        output.section("Recent Alerts");
        for a in &alerts {
            let state = if a.resolved { " (resolved)" } else { "" };
            println!("  {}{}", a, style(state).dim());
        }
    }

    if !suppressed.is_empty() {
        println!();
        output.field("Suppressed", suppressed.join(", "));
    }

    Ok(())
}
