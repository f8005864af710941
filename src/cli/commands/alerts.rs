//! Alerts Command
//!
//! Suppress or re-enable alerting for a metric, and list recent alerts.

use std::sync::Arc;

use crate::alerting::{AlertController, REGRESSION_METRIC};
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::events::NullSink;
use crate::types::{MendError, MetricsSnapshot, Result};

/// Alerts listed by `alerts list`
const LIST_LIMIT: usize = 20;

fn controller(ctx: &CommandContext) -> AlertController {
    // No channels: this command never dispatches
    AlertController::new(&ctx.config.alerting, Vec::new(), ctx.db.clone(), Arc::new(NullSink))
}

fn check_metric(metric: &str) -> Result<()> {
    if metric == REGRESSION_METRIC || MetricsSnapshot::is_known_metric(metric) {
        Ok(())
    } else {
        Err(MendError::Config(format!("Unknown alert metric: {}", metric)))
    }
}

pub fn suppress(metric: &str, reason: Option<&str>) -> Result<()> {
    check_metric(metric)?;
    let ctx = CommandContext::load()?;
    controller(&ctx).suppress(metric, reason)?;
    Output::new().success(&format!("Alerts for '{}' suppressed", metric));
    Ok(())
}

pub fn unsuppress(metric: &str) -> Result<()> {
    check_metric(metric)?;
    let ctx = CommandContext::load()?;
    let output = Output::new();
    if controller(&ctx).unsuppress(metric)? {
        output.success(&format!("Alerts for '{}' re-enabled", metric));
    } else {
        output.info(&format!("'{}' was not suppressed", metric));
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let ctx = CommandContext::load()?;
    let output = Output::new();

    let alerts = ctx.db.recent_alerts(LIST_LIMIT)?;
    if alerts.is_empty() {
        output.info("No alerts recorded");
    }
    for a in &alerts {
        let state = if a.resolved { "resolved" } else { "open" };
        println!("  {} [{}] {}", a.timestamp.format("%Y-%m-%d %H:%M"), state, a);
    }

    let suppressed = ctx.db.suppressed_metrics()?;
    if !suppressed.is_empty() {
        println!();
        output.field("Suppressed", suppressed.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_metric() {
        assert!(check_metric("quality_score").is_ok());
        assert!(check_metric(REGRESSION_METRIC).is_ok());
        assert!(check_metric("lines_of_code").is_err());
    }
}
