//! Analyze Command
//!
//! Run the analyzer, record a metrics snapshot and show the remediation plan.

use console::style;

use crate::cli::ui::Output;
use crate::cli::ui::output::{score, severity};
use crate::cli::util::CommandContext;
use crate::domain::DomainDistribution;
use crate::pipeline::Analysis;
use crate::report::PlanSummary;
use crate::types::Result;

pub async fn run(format: &str, quiet: bool) -> Result<()> {
    let json_output = format == "json";
    let ctx = CommandContext::load()?;
    let mut session = ctx.pipeline(quiet || json_output)?;
    let result = session.pipeline.analyze_and_record().await;
    let domains = session.pipeline.workspace_domains();
    session.finish().await;
    let (analysis, observation) = result?;
    let domains = domains?;

    if json_output {
        let out = serde_json::json!({
            "metrics": analysis.snapshot,
            "overall": analysis.overall,
            "plan": PlanSummary::from(&analysis.plan),
            "workspace_domains": domains,
            "regression": observation.regression,
            "alerts": observation.alerts,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let output = Output::new();
    output.metrics(&analysis.snapshot);
    print_domains(&output, &domains);
    print_plan(&output, &analysis);

    if let Some(regression) = &observation.regression {
        output.warning(&format!(
            "{} regression since the previous snapshot",
            regression.severity
        ));
    }
    Ok(())
}

fn print_plan(output: &Output, analysis: &Analysis) {
    let plan = &analysis.plan;
    output.section("Remediation Plan");
    output.field("Overall severity", severity(analysis.overall.level));
    output.field(
        "Issues",
        format!(
            "{} auto-fix, {} manual review, {} rule adjustment, {} ignored",
            plan.auto_fixable, plan.manual_review, plan.rule_adjustments, plan.ignored
        ),
    );
    output.field("Estimated effort", format!("{:.0} min", plan.estimated_minutes));
    output.field(
        "Success probability",
        score(plan.success_probability * 100.0).to_string() + "%",
    );

    for phase in &plan.phases {
        let deps = if phase.dependencies.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = phase.dependencies.iter().map(|d| d.as_str()).collect();
            format!(" after {}", names.join(", "))
        };
        println!(
            "  {} {:<20} {:>4} issue(s), {} auto-fix, {} risk{}",
            style("•").cyan(),
            phase.id(),
            phase.issues.len(),
            phase.auto_fix_count(),
            phase.risk_level,
            style(deps).dim()
        );
    }

    if plan.auto_fixable > 0 {
        println!();
        output.info("Run 'lintmend fix --dry-run' to preview the automatic fixes");
    }
}

fn print_domains(output: &Output, domains: &DomainDistribution) {
    output.section("Workspace Domains");
    output.field("Source files", domains.total_files);
    for (domain, count) in &domains.by_domain {
        println!("  {:<22} {:>5}", domain, count);
    }
}
