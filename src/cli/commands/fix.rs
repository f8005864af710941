//! Fix Command
//!
//! Apply the plan's automatic fixes in validated batches.
//! Returns whether the run succeeded.

use crate::cli::ui::Output;
use crate::cli::ui::output::score;
use crate::cli::util::CommandContext;
use crate::pipeline::FixSummary;
use crate::types::{MendError, Result};

pub async fn run(dry_run: bool, yes: bool, quiet: bool) -> Result<bool> {
    let mut ctx = CommandContext::load()?;
    if dry_run {
        ctx.config.execution.dry_run = true;
    }

    let mut session = ctx.pipeline(quiet)?;
    let result = session.pipeline.fix(yes).await;
    session.finish().await;

    let output = Output::new();
    let summary = match result {
        Ok(summary) => summary,
        Err(MendError::ApprovalRequired) => {
            output.error("Manual approval is required for live runs. Re-run with --yes.");
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    if summary.run.dry_run {
        print_dry_run(&output, &summary);
        return Ok(summary.run.success);
    }
    print_live_run(&output, &summary);
    Ok(summary.run.success)
}

fn print_dry_run(output: &Output, summary: &FixSummary) {
    let run = &summary.run;
    output.section("Dry Run");
    output.field("Would fix", run.would_fix);
    output.field("Would fail", run.failed_issues);
    output.field("Files", run.processed_files.len());
    for file in &run.processed_files {
        println!("    {}", file);
    }
    for e in &run.errors {
        output.warning(&format!("{}:{} {} {}", e.file, e.line, e.rule_id, e.message));
    }
    println!();
    output.info("No files were changed. Run 'lintmend fix' to apply.");
}

fn print_live_run(output: &Output, summary: &FixSummary) {
    let run = &summary.run;
    output.section("Fix Run");
    output.field("Fixed", run.fixed_issues);
    output.field("Failed", run.failed_issues);
    output.field("Batches", run.batches.len());
    output.field("Rollbacks", run.metrics.rollbacks_performed);
    output.field(
        "Final validation",
        if run.final_validation_passed { "passed" } else { "failed" },
    );

    if let Some(after) = &summary.after {
        output.field(
            "Quality score",
            format!(
                "{} -> {}",
                score(summary.before.snapshot.quality_score),
                score(after.quality_score)
            ),
        );
        output.field(
            "Issues",
            format!("{} -> {}", summary.before.snapshot.total_issues, after.total_issues),
        );
    }

    if let Some(aborted) = &run.aborted {
        output.error(&format!(
            "Stopped at batch {} of phase {}: {}{}",
            aborted.batch + 1,
            aborted.phase,
            aborted.reason,
            if aborted.rollback_attempted {
                "; workspace restored"
            } else {
                ""
            }
        ));
    }

    let undone: Vec<_> = run.rolled_back_issues().collect();
    if !undone.is_empty() {
        output.warning(&format!(
            "{} fix(es) were rolled back and remain open; run 'lintmend fix' again to retry",
            undone.len()
        ));
        for issue in undone {
            println!("    {}:{} {} ({})", issue.file, issue.line, issue.rule_id, issue.reason);
        }
    }

    if let Some(gate) = &summary.gate {
        output.gate(gate);
    }

    if run.success {
        output.success("Fix run completed");
    } else {
        output.error("Fix run did not complete cleanly");
    }
}
