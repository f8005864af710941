//! Workspace validation
//!
//! Runs the configured build, type-check, analyze and test commands. A
//! timeout is reported as a failed step, never as an error. Analyze passes
//! when it reports no more errors than the baseline taken before the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::runner::{CommandOutput, CommandRunner};
use crate::config::CommandsConfig;
use crate::constants::executor::MAX_DETAIL_BYTES;
use crate::context::CancelToken;
use crate::ingest;
use crate::types::{
    Diagnostic, DiagnosticCounts, MendError, Result, ValidationKind, ValidationReport,
    ValidationResult,
};

/// Steps run before any mutation
const BASELINE_STEPS: [ValidationKind; 2] = [ValidationKind::Build, ValidationKind::TypeCheck];

/// Steps run after each batch and at the end of a run
const FULL_STEPS: [ValidationKind; 4] = [
    ValidationKind::Build,
    ValidationKind::TypeCheck,
    ValidationKind::Analyze,
    ValidationKind::Test,
];

/// Result of the pre-run validation
#[derive(Debug, Clone)]
pub struct Baseline {
    pub report: ValidationReport,
    /// Analyzer error count before any change, when an analyze command is set
    pub analyze_errors: Option<usize>,
}

/// Parsed analyzer run
#[derive(Debug, Clone)]
pub struct AnalyzeRun {
    pub output: CommandOutput,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalyzeRun {
    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts::from_diagnostics(&self.diagnostics)
    }
}

pub struct Validator {
    runner: Arc<dyn CommandRunner>,
    root: PathBuf,
    commands: CommandsConfig,
    cancel: CancelToken,
}

impl Validator {
    pub fn new(runner: Arc<dyn CommandRunner>, root: impl Into<PathBuf>, commands: CommandsConfig) -> Self {
        Self {
            runner,
            root: root.into(),
            commands,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run a command, racing it against cancellation
    async fn execute(&self, kind: ValidationKind, command: &str) -> Result<Option<CommandOutput>> {
        let limit = self.commands.timeout(kind);
        tokio::select! {
            result = self.runner.run(command, &self.root, limit) => match result {
                Ok(output) => Ok(Some(output)),
                Err(MendError::Timeout { .. }) => {
                    warn!(step = %kind, "Validation timed out after {:?}", limit);
                    Ok(None)
                }
                Err(e) => Err(e),
            },
            _ = self.cancel.cancelled() => Err(MendError::Cancelled {
                phase: format!("{} validation", kind),
                batch: 0,
                rolled_back: false,
            }),
        }
    }

    /// Run the analyzer and parse its output.
    ///
    /// Returns `Ok(None)` when no analyze command is configured.
    pub async fn analyze(&self) -> Result<Option<AnalyzeRun>> {
        let Some(command) = self.commands.command(ValidationKind::Analyze) else {
            return Ok(None);
        };
        let limit = self.commands.timeout(ValidationKind::Analyze);
        let output = self.runner.run(command, &self.root, limit).await?;
        let diagnostics = ingest::parse(self.commands.analyze_format, &output.stdout, &self.root)
            .map_err(|e| match e {
                MendError::Ingestion { .. } => e,
                other => MendError::ingestion(command, other.to_string()),
            })?;
        Ok(Some(AnalyzeRun {
            output,
            diagnostics,
        }))
    }

    /// Run one step. `None` when the step has no configured command.
    pub async fn run_step(
        &self,
        kind: ValidationKind,
        baseline_errors: Option<usize>,
    ) -> Result<Option<ValidationResult>> {
        let Some(command) = self.commands.command(kind) else {
            return Ok(None);
        };
        let started = Instant::now();

        let result = match self.execute(kind, command).await {
            Ok(None) => ValidationResult::timeout(kind, self.commands.timeout(kind)),
            Ok(Some(output)) if kind == ValidationKind::Analyze => {
                self.judge_analyze(&output, baseline_errors)
            }
            Ok(Some(output)) if output.success() => ValidationResult::pass(kind, output.duration),
            Ok(Some(output)) => ValidationResult::fail(
                kind,
                truncate_detail(output.diagnostic_text()),
                output.duration,
            ),
            Err(e @ MendError::Cancelled { .. }) => return Err(e),
            Err(e) => ValidationResult::fail(kind, e.to_string(), started.elapsed()),
        };

        debug!(step = %kind, passed = result.passed, "Validation step finished");
        Ok(Some(result))
    }

    fn judge_analyze(&self, output: &CommandOutput, baseline_errors: Option<usize>) -> ValidationResult {
        let kind = ValidationKind::Analyze;
        let diagnostics = match ingest::parse(self.commands.analyze_format, &output.stdout, &self.root) {
            Ok(d) => d,
            Err(e) => return ValidationResult::fail(kind, truncate_detail(&e.to_string()), output.duration),
        };
        let errors = DiagnosticCounts::from_diagnostics(&diagnostics).errors;

        match baseline_errors {
            Some(baseline) if errors > baseline => ValidationResult::fail(
                kind,
                format!("analyzer errors increased from {} to {}", baseline, errors),
                output.duration,
            ),
            Some(_) => ValidationResult::pass(kind, output.duration),
            None if errors == 0 => ValidationResult::pass(kind, output.duration),
            None => ValidationResult::fail(kind, format!("{} analyzer errors", errors), output.duration),
        }
    }

    async fn run_steps(
        &self,
        steps: &[ValidationKind],
        baseline_errors: Option<usize>,
    ) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();
        for &kind in steps {
            if let Some(result) = self.run_step(kind, baseline_errors).await? {
                report.results.push(result);
            }
        }
        Ok(report)
    }

    /// Pre-run check of build and type-check, plus the analyzer error count
    pub async fn baseline(&self) -> Result<Baseline> {
        let report = self.run_steps(&BASELINE_STEPS, None).await?;
        let analyze_errors = match self.analyze().await {
            Ok(run) => run.map(|r| r.counts().errors),
            Err(e @ MendError::Ingestion { .. }) => return Err(e),
            Err(e) => {
                warn!("Baseline analyze failed: {}", e);
                None
            }
        };
        Ok(Baseline {
            report,
            analyze_errors,
        })
    }

    /// Full validation pass
    pub async fn validate(&self, baseline_errors: Option<usize>) -> Result<ValidationReport> {
        self.run_steps(&FULL_STEPS, baseline_errors).await
    }
}

fn truncate_detail(text: &str) -> String {
    let text = text.trim();
    if text.len() <= MAX_DETAIL_BYTES {
        return text.to_string();
    }
    let mut end = MAX_DETAIL_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::runner::ScriptedRunner;
    use crate::ingest::DiagnosticFormat;
    use std::time::Duration;

    fn commands() -> CommandsConfig {
        CommandsConfig {
            build: Some("build".to_string()),
            type_check: Some("tsc".to_string()),
            analyze: Some("lint".to_string()),
            test: None,
            analyze_format: DiagnosticFormat::NativeJson,
            ..Default::default()
        }
    }

    fn lint_output(errors: usize) -> String {
        let records: Vec<_> = (0..errors)
            .map(|i| {
                serde_json::json!({
                    "file": "src/a.ts", "line": i + 1, "column": 1,
                    "ruleId": "no-undef", "message": "x", "severity": "error"
                })
            })
            .collect();
        serde_json::Value::Array(records).to_string()
    }

    #[tokio::test]
    async fn test_full_pass_skips_unconfigured_test_step() {
        let runner = Arc::new(ScriptedRunner::new(|cmd, _| match cmd {
            "lint" => Ok(CommandOutput::ok(lint_output(0))),
            _ => Ok(CommandOutput::ok("")),
        }));
        let validator = Validator::new(runner.clone(), "/ws", commands());
        let report = validator.validate(Some(0)).await.unwrap();
        assert!(report.passed());
        assert_eq!(report.results.len(), 3);
        assert_eq!(runner.calls(), vec!["build", "tsc", "lint"]);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let runner = Arc::new(ScriptedRunner::new(|cmd, _| match cmd {
            "tsc" => Err(MendError::timeout("tsc", Duration::from_secs(1))),
            "lint" => Ok(CommandOutput::ok(lint_output(0))),
            _ => Ok(CommandOutput::ok("")),
        }));
        let validator = Validator::new(runner, "/ws", commands());
        let report = validator.validate(Some(0)).await.unwrap();
        assert!(!report.passed());
        let tsc = report.get(ValidationKind::TypeCheck).unwrap();
        assert!(tsc.timed_out);
        assert_eq!(report.failed_kinds(), vec![ValidationKind::TypeCheck]);
    }

    #[tokio::test]
    async fn test_analyze_compares_against_baseline() {
        let runner = Arc::new(ScriptedRunner::new(|cmd, _| match cmd {
            "lint" => Ok(CommandOutput::failed(1, "").with_stdout(lint_output(3))),
            _ => Ok(CommandOutput::ok("")),
        }));
        let validator = Validator::new(runner, "/ws", commands());

        let same = validator.run_step(ValidationKind::Analyze, Some(3)).await.unwrap().unwrap();
        assert!(same.passed);

        let worse = validator.run_step(ValidationKind::Analyze, Some(2)).await.unwrap().unwrap();
        assert!(!worse.passed);
        assert!(worse.detail.contains("from 2 to 3"));
    }

    #[tokio::test]
    async fn test_baseline_records_analyze_errors() {
        let runner = Arc::new(ScriptedRunner::new(|cmd, _| match cmd {
            "lint" => Ok(CommandOutput::ok(lint_output(2))),
            "build" => Ok(CommandOutput::failed(2, "Module not found")),
            _ => Ok(CommandOutput::ok("")),
        }));
        let validator = Validator::new(runner, "/ws", commands());
        let baseline = validator.baseline().await.unwrap();
        assert_eq!(baseline.analyze_errors, Some(2));
        assert!(!baseline.report.passed());
        assert_eq!(baseline.report.first_failure().unwrap(), "build: Module not found");
    }

    #[tokio::test]
    async fn test_cancellation_propagates() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let runner = Arc::new(ScriptedRunner::always_ok());
        let validator = Validator::new(runner, "/ws", commands()).with_cancel(cancel);
        // select! is unbiased, so retry until the cancelled branch is taken
        let mut saw_cancel = false;
        for _ in 0..64 {
            if let Err(MendError::Cancelled { .. }) = validator.run_step(ValidationKind::Build, None).await {
                saw_cancel = true;
                break;
            }
        }
        assert!(saw_cancel);
    }

    #[test]
    fn test_truncate_detail_respects_char_boundary() {
        let long = "é".repeat(MAX_DETAIL_BYTES);
        let truncated = truncate_detail(&long);
        assert!(truncated.len() <= MAX_DETAIL_BYTES + '…'.len_utf8());
        assert!(truncated.ends_with('…'));
    }
}
