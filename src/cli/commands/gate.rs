//! Quality Gate Command
//!
//! Evaluate a named gate against fresh metrics.
//! Returns whether the gate passed; the process exit code follows it.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::config::DEFAULT_GATE;
use crate::types::Result;

pub async fn run(gate: Option<&str>, format: &str, quiet: bool) -> Result<bool> {
    let json_output = format == "json";
    let name = gate.unwrap_or(DEFAULT_GATE);
    let ctx = CommandContext::load()?;
    let mut session = ctx.pipeline(quiet || json_output)?;
    let outcome = session.pipeline.quality_gate(name).await;
    session.finish().await;
    let (result, _) = outcome?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result.passed);
    }

    let output = Output::new();
    output.gate(&result);
    println!();
    if result.passed && result.deployment_approved {
        output.success(&format!("Gate '{}' passed, deployment approved", name));
    } else if result.passed {
        output.warning(&format!("Gate '{}' passed, deployment not approved", name));
    } else {
        output.error(&format!(
            "Gate '{}' failed with {} violation(s)",
            name,
            result.violations.len()
        ));
    }
    Ok(result.passed)
}
