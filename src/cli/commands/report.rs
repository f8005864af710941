//! Report Command
//!
//! Generate the quality report (JSON + Markdown) under .lintmend/reports/,
//! or print the latest one.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::report::{load_latest, to_markdown};
use crate::types::Result;

pub async fn run(format: &str, latest: bool, quiet: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let output = Output::new();

    if latest {
        let dir = ctx.project_dir.join(crate::constants::paths::REPORT_DIR);
        match load_latest(&dir)? {
            Some(report) => print_report(format, &report)?,
            None => output.info("No report yet. Run 'lintmend report' to create one."),
        }
        return Ok(());
    }

    let mut session = ctx.pipeline(quiet || format == "json")?;
    let outcome = session.pipeline.report().await;
    session.finish().await;
    let (report, files) = outcome?;

    match format {
        "json" | "markdown" => print_report(format, &report)?,
        _ => {
            output.success("Quality report written");
            output.field("Markdown", files.markdown.display());
            output.field("JSON", files.json.display());
            output.field("Recommendations", report.recommendations.len());
        }
    }
    Ok(())
}

fn print_report(format: &str, report: &crate::report::QualityReport) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", to_markdown(report));
    }
    Ok(())
}
