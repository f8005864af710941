//! Batch remediation state machine
//!
//! `PreValidate -> Snapshot -> (Execute -> Validate -> Continue | Rollback)* -> PostValidate`
//!
//! Batches run strictly in plan order. The workspace is only mutated while a
//! snapshot protects it: the pre-run snapshot stays open for the whole run
//! and each batch opens a checkpoint above it. A failed batch restores its
//! checkpoint, landing on the last validated content. Aborting the run
//! (safety limit, cancellation, emergency stop, failed final validation)
//! restores the pre-run snapshot.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument, warn};

use super::fixes::{FixRegistry, IssueOutcome, apply_file};
use super::lock::RunLock;
use super::runner::CommandRunner;
use super::snapshot::{FsSnapshotStore, SnapshotStore};
use super::validation::{Baseline, Validator};
use crate::context::RunContext;
use crate::events::EngineEvent;
use crate::strategy::PolicyContext;
use crate::types::{
    AbortContext, BatchOutcome, BatchStatus, FixError, MendError, PhaseKind, PlannedIssue,
    RemediationPlan, RolledBackIssue, Result, RunMetrics, RunResult, SeverityLevel, SnapshotId,
    ValidationReport,
};

/// A file-grouped slice of the eligible issue pool
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    pub index: usize,
    pub phase: PhaseKind,
    pub issues: Vec<&'a PlannedIssue>,
}

impl Batch<'_> {
    pub fn files(&self) -> Vec<String> {
        self.issues
            .iter()
            .map(|i| i.diagnostic.file.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn by_file(&self) -> BTreeMap<&str, Vec<&PlannedIssue>> {
        let mut grouped: BTreeMap<&str, Vec<&PlannedIssue>> = BTreeMap::new();
        for issue in &self.issues {
            grouped.entry(issue.diagnostic.file.as_str()).or_default().push(issue);
        }
        grouped
    }
}

/// What applying one batch did
#[derive(Debug, Default)]
struct Applied {
    fixed: usize,
    skipped: usize,
    failed: usize,
    changed: bool,
    errors: Vec<FixError>,
    /// Issues whose fix was written, reason left empty until a rollback
    written: Vec<RolledBackIssue>,
}

/// Mutable bookkeeping for one live run
struct RunState {
    result: RunResult,
    failures: u32,
    /// Pre-run snapshot, open until the run ends
    base: Option<SnapshotId>,
    /// Checkpoint of the batch in flight
    checkpoint: Option<SnapshotId>,
    /// Position in `result.batches` of each committed batch and its fixes
    committed: Vec<(usize, Vec<RolledBackIssue>)>,
    processed: BTreeSet<String>,
}

fn with_reason(issues: Vec<RolledBackIssue>, reason: &str) -> Vec<RolledBackIssue> {
    issues
        .into_iter()
        .map(|issue| RolledBackIssue {
            reason: reason.to_string(),
            ..issue
        })
        .collect()
}

pub struct BatchExecutor {
    ctx: RunContext,
    runner: Arc<dyn CommandRunner>,
    registry: FixRegistry,
    policy: PolicyContext,
    approved: bool,
}

impl BatchExecutor {
    pub fn new(ctx: RunContext, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let policy = PolicyContext::from_config(ctx.config())?;
        Ok(Self {
            ctx,
            runner,
            registry: FixRegistry::builtin()?,
            policy,
            approved: false,
        })
    }

    /// Grant the approval that `safety.require_manual_approval` asks for
    pub fn with_approval(mut self, approved: bool) -> Self {
        self.approved = approved;
        self
    }

    pub fn registry(&self) -> &FixRegistry {
        &self.registry
    }

    /// Why an auto-fix issue will not be attempted, if it will not
    fn ineligible_reason(&self, issue: &PlannedIssue) -> Option<&'static str> {
        let c = &issue.classification;
        if !c.is_auto_fix_eligible(self.policy.min_confidence) {
            Some("not eligible for auto-fix")
        } else if self.policy.is_preserved(&issue.diagnostic.file) {
            Some("path is preserved")
        } else if !self.registry.supports(&issue.diagnostic.rule_id) {
            Some("no fix available")
        } else if self.ctx.adjustments().skip_non_critical && c.severity.level < SeverityLevel::High {
            Some("non-critical rules are skipped")
        } else {
            None
        }
    }

    /// Split the eligible pool into batches, phase by phase
    pub fn plan_batches<'a>(&self, plan: &'a RemediationPlan) -> Vec<Batch<'a>> {
        let size = self.ctx.effective_batch_size();
        let mut batches = Vec::new();

        for phase in &plan.phases {
            let mut pool: Vec<&PlannedIssue> = phase
                .issues
                .iter()
                .filter(|i| i.is_auto_fix() && self.ineligible_reason(i).is_none())
                .collect();
            pool.sort_by(|a, b| {
                (&a.diagnostic.file, a.diagnostic.line, a.diagnostic.column)
                    .cmp(&(&b.diagnostic.file, b.diagnostic.line, b.diagnostic.column))
            });
            for chunk in pool.chunks(size) {
                batches.push(Batch {
                    index: batches.len(),
                    phase: phase.kind,
                    issues: chunk.to_vec(),
                });
            }
        }
        batches
    }

    fn emit(&self, event: EngineEvent) {
        self.ctx.events().emit(event);
    }

    fn empty_result(&self, dry_run: bool) -> RunResult {
        let now = Utc::now();
        RunResult {
            run_id: uuid::Uuid::new_v4().to_string(),
            dry_run,
            success: false,
            fixed_issues: 0,
            failed_issues: 0,
            would_fix: 0,
            processed_files: Vec::new(),
            errors: Vec::new(),
            validation_results: Vec::new(),
            batches: Vec::new(),
            metrics: RunMetrics::default(),
            aborted: None,
            final_validation_passed: false,
            started_at: now,
            finished_at: now,
        }
    }

    /// Apply one batch to disk (or only in memory when `write` is false)
    fn apply_batch(&self, batch: &Batch<'_>, write: bool) -> Applied {
        let root = self.ctx.root();
        let mut applied = Applied::default();

        for (file, issues) in batch.by_file() {
            let report = match apply_file(root, file, &issues, &self.registry, write) {
                Ok(report) => report,
                Err(e) => {
                    warn!(file, "Cannot apply fixes: {}", e);
                    for issue in &issues {
                        let d = &issue.diagnostic;
                        let err = FixError {
                            file: d.file.clone(),
                            line: d.line,
                            rule_id: d.rule_id.clone(),
                            message: e.to_string(),
                        };
                        self.emit(EngineEvent::FixFailed { error: err.clone() });
                        applied.errors.push(err);
                        applied.failed += 1;
                    }
                    continue;
                }
            };

            applied.changed |= report.changed;
            for (d, outcome) in report.outcomes {
                match outcome {
                    IssueOutcome::Fixed => {
                        applied.fixed += 1;
                        applied.written.push(RolledBackIssue {
                            file: d.file.clone(),
                            line: d.line,
                            rule_id: d.rule_id.clone(),
                            reason: String::new(),
                        });
                        self.emit(EngineEvent::IssueFixed {
                            file: d.file,
                            line: d.line,
                            rule_id: d.rule_id,
                        });
                    }
                    IssueOutcome::Skipped(reason) => {
                        applied.skipped += 1;
                        self.emit(EngineEvent::IssueSkipped {
                            file: d.file,
                            line: d.line,
                            rule_id: d.rule_id,
                            reason,
                        });
                    }
                    IssueOutcome::Failed(err) => {
                        applied.failed += 1;
                        self.emit(EngineEvent::FixFailed { error: err.clone() });
                        applied.errors.push(err);
                    }
                }
            }
        }
        applied
    }

    /// Run the plan's auto-fix issues
    #[instrument(skip_all, fields(root = %self.ctx.root().display()))]
    pub async fn execute(&self, plan: &RemediationPlan) -> Result<RunResult> {
        let config = self.ctx.config();
        if let Some(reason) = self.ctx.adjustments().emergency_stop {
            return Err(MendError::EmergencyStop(reason));
        }
        if config.execution.max_concurrent_batches > 1 {
            warn!(
                requested = config.execution.max_concurrent_batches,
                "Batches run sequentially; max_concurrent_batches is ignored"
            );
        }

        let batches = self.plan_batches(plan);
        info!(batches = batches.len(), dry_run = config.execution.dry_run, "Starting fix run");

        if config.execution.dry_run {
            return Ok(self.dry_run(&batches));
        }
        if config.safety.require_manual_approval && !self.approved {
            return Err(MendError::ApprovalRequired);
        }

        let _lock = RunLock::acquire(&self.ctx.lock_path())?;
        self.live_run(&batches).await
    }

    fn dry_run(&self, batches: &[Batch<'_>]) -> RunResult {
        let timer = Instant::now();
        let mut result = self.empty_result(true);
        let mut files = BTreeSet::new();

        for batch in batches {
            self.emit(EngineEvent::BatchStarted {
                index: batch.index,
                total: batches.len(),
                phase: batch.phase,
                files: batch.files().len(),
                issues: batch.issues.len(),
            });
            let applied = self.apply_batch(batch, false);
            result.would_fix += applied.fixed;
            result.failed_issues += applied.failed;
            result.errors.extend(applied.errors);
            files.extend(batch.files());
            result.batches.push(BatchOutcome {
                index: batch.index,
                phase: batch.phase,
                files: batch.files(),
                attempted: batch.issues.len(),
                fixed: applied.fixed,
                skipped: applied.skipped,
                status: BatchStatus::DryRun,
                rolled_back_issues: Vec::new(),
            });
        }

        result.processed_files = files.into_iter().collect();
        result.success = result.errors.is_empty();
        result.metrics.batches = batches.len();
        result.metrics.total_time_ms = timer.elapsed().as_millis() as u64;
        result.finished_at = Utc::now();
        self.emit(EngineEvent::RunFinished {
            success: result.success,
            fixed: 0,
            failed: result.failed_issues,
            rollbacks: 0,
        });
        result
    }

    async fn live_run(&self, batches: &[Batch<'_>]) -> Result<RunResult> {
        let config = self.ctx.config();
        let timer = Instant::now();
        let validator = Validator::new(self.runner.clone(), self.ctx.root(), config.commands.clone())
            .with_cancel(self.ctx.cancel_token().clone());

        // PreValidate
        let baseline: Baseline = validator.baseline().await?;
        self.emit(EngineEvent::BaselineChecked {
            passed: baseline.report.passed(),
            failed: baseline.report.failed_kinds(),
        });
        if !baseline.report.passed() {
            return Err(MendError::UnstableBaseline {
                failed: baseline.report.failed_kinds(),
                detail: baseline.report.first_failure().unwrap_or_default(),
            });
        }

        let mut state = RunState {
            result: self.empty_result(false),
            failures: 0,
            base: None,
            checkpoint: None,
            committed: Vec::new(),
            processed: BTreeSet::new(),
        };
        state.result.validation_results.extend(baseline.report.results.clone());
        state.result.metrics.batches = batches.len();

        let mut store = FsSnapshotStore::new(self.ctx.root(), self.ctx.snapshot_dir());
        let tracked: Vec<String> = batches
            .iter()
            .flat_map(|b| b.files())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let use_snapshot = config.safety.rollback_enabled && config.execution.create_backups;

        for batch in batches {
            if self.ctx.cancel_token().is_cancelled() {
                return Err(self.cancel(&mut store, &mut state, batch.phase.to_string(), batch.index));
            }
            if let Some(reason) = self.ctx.adjustments().emergency_stop {
                warn!("Emergency stop requested: {}", reason);
                self.abort_run(&mut store, &mut state, "emergency stop")?;
                return Err(MendError::EmergencyStop(reason));
            }

            if use_snapshot {
                // Pre-run snapshot lazily, right before the first mutation
                if state.base.is_none() {
                    let id = store.begin(&tracked)?;
                    self.emit(EngineEvent::SnapshotCreated {
                        snapshot: id.to_string(),
                    });
                    state.base = Some(id);
                }
                state.checkpoint = Some(store.begin(&batch.files())?);
            }

            self.emit(EngineEvent::BatchStarted {
                index: batch.index,
                total: batches.len(),
                phase: batch.phase,
                files: batch.files().len(),
                issues: batch.issues.len(),
            });
            let applied = self.apply_batch(batch, true);
            let outcome = |status, fixed| BatchOutcome {
                index: batch.index,
                phase: batch.phase,
                files: batch.files(),
                attempted: batch.issues.len(),
                fixed,
                skipped: applied.skipped,
                status,
                rolled_back_issues: Vec::new(),
            };

            if !applied.changed {
                state.result.failed_issues += applied.failed;
                state.result.batches.push(outcome(BatchStatus::NoChanges, 0));
                state.result.errors.extend(applied.errors);
                self.close_checkpoint(&mut store, &mut state);
                continue;
            }

            let halted = !config.execution.continue_on_error && applied.failed > 0;
            let report = if halted {
                None
            } else if config.execution.validate_after_each_batch {
                match validator.validate(baseline.analyze_errors).await {
                    Ok(report) => Some(report),
                    Err(MendError::Cancelled { .. }) => {
                        return Err(self.cancel(
                            &mut store,
                            &mut state,
                            batch.phase.to_string(),
                            batch.index,
                        ));
                    }
                    Err(e) => return Err(e),
                }
            } else {
                Some(ValidationReport::default())
            };

            if let Some(report) = &report {
                self.emit(EngineEvent::BatchValidated {
                    index: batch.index,
                    passed: report.passed(),
                    detail: report.first_failure(),
                });
                state.result.validation_results.extend(report.results.iter().cloned());
            }

            if report.as_ref().is_some_and(|r| r.passed()) {
                state.result.fixed_issues += applied.fixed;
                state.result.failed_issues += applied.failed;
                state.result.errors.extend(applied.errors);
                state.processed.extend(batch.files());
                state
                    .committed
                    .push((state.result.batches.len(), applied.written));
                state.result.batches.push(outcome(BatchStatus::Committed, applied.fixed));
                self.emit(EngineEvent::BatchCommitted {
                    index: batch.index,
                    fixed: applied.fixed,
                });
                self.close_checkpoint(&mut store, &mut state);
                continue;
            }

            // Rollback
            let reason = match &report {
                Some(r) => r.first_failure().unwrap_or_else(|| "validation failed".to_string()),
                None => format!("{} fixes failed with continue_on_error disabled", applied.failed),
            };
            let failed_kind = report.as_ref().and_then(|r| r.failed_kinds().first().copied());
            warn!(batch = batch.index, "Batch failed: {}", reason);

            let restored = self.rollback(&mut store, &mut state)?;
            state.result.failed_issues += applied.fixed + applied.failed;
            state.result.errors.extend(applied.errors);
            let mut rolled_back = outcome(BatchStatus::RolledBack, 0);
            if restored.is_some() {
                rolled_back.rolled_back_issues = with_reason(applied.written, &reason);
                state.result.metrics.rollbacks_performed += 1;
            }
            state.result.batches.push(rolled_back);
            state.failures += 1;
            self.emit(EngineEvent::RolledBack {
                index: batch.index,
                snapshot: restored.map(|s| s.to_string()).unwrap_or_default(),
                failures: state.failures,
            });

            if state.failures >= config.safety.max_failures_before_stop {
                let rollback_attempted = state.base.is_some();
                let err = MendError::SafetyLimitExceeded {
                    phase: batch.phase,
                    batch: batch.index,
                    failures: state.failures,
                    validation: reason.clone(),
                    rollback_attempted,
                };
                error!("{}", err);
                self.abort_run(&mut store, &mut state, "safety limit reached")?;
                state.result.aborted = Some(AbortContext {
                    phase: batch.phase,
                    batch: batch.index,
                    validation: failed_kind,
                    reason,
                    rollback_attempted,
                });
                return Ok(self.finish(state, timer, false));
            }
        }

        // PostValidate
        let final_report = match validator.validate(baseline.analyze_errors).await {
            Ok(report) => report,
            Err(MendError::Cancelled { .. }) => {
                return Err(self.cancel(
                    &mut store,
                    &mut state,
                    "post-validation".to_string(),
                    batches.len(),
                ));
            }
            Err(e) => return Err(e),
        };
        state.result.validation_results.extend(final_report.results.iter().cloned());

        let mut final_passed = final_report.passed();
        if !final_passed && state.base.is_some() {
            warn!("Final validation failed; restoring the pre-run snapshot");
            self.abort_run(&mut store, &mut state, "final validation failed")?;
            final_passed = self
                .reverify(&validator, baseline.analyze_errors, &mut state.result)
                .await?;
        }

        self.discard_base(&mut store, &mut state);
        state.result.final_validation_passed = final_passed;
        let success = final_report.build_passed() && state.result.fixed_issues > 0;
        Ok(self.finish(state, timer, success))
    }

    async fn reverify(
        &self,
        validator: &Validator,
        baseline_errors: Option<usize>,
        result: &mut RunResult,
    ) -> Result<bool> {
        let report = validator.validate(baseline_errors).await?;
        result.validation_results.extend(report.results.iter().cloned());
        Ok(report.passed())
    }

    /// Restore and close the batch checkpoint. `None` when rollback is disabled.
    fn rollback(
        &self,
        store: &mut FsSnapshotStore,
        state: &mut RunState,
    ) -> Result<Option<SnapshotId>> {
        let Some(id) = state.checkpoint.take() else {
            warn!("Rollback is disabled; failed changes remain in the workspace");
            return Ok(None);
        };
        if let Err(e) = store.restore(&id) {
            // The snapshots stay on disk for manual recovery
            error!(snapshot = %id, "{}", e);
            return Err(e);
        }
        if let Err(e) = store.discard(&id) {
            warn!(snapshot = %id, "Failed to discard checkpoint: {}", e);
        }
        Ok(Some(id))
    }

    /// Put the workspace back to its pre-run state and undo the bookkeeping
    /// of every committed batch. `Ok(false)` when there is no pre-run
    /// snapshot to restore.
    fn abort_run(&self, store: &mut FsSnapshotStore, state: &mut RunState, reason: &str) -> Result<bool> {
        self.close_checkpoint(store, state);
        let Some(base) = state.base.take() else {
            if !state.committed.is_empty() {
                warn!("Rollback is disabled; committed batches remain in the workspace");
            }
            return Ok(false);
        };
        if let Err(e) = store.restore(&base) {
            error!(snapshot = %base, "{}", e);
            return Err(e);
        }
        if let Err(e) = store.discard(&base) {
            warn!(snapshot = %base, "Failed to discard snapshot: {}", e);
        }

        if !state.committed.is_empty() {
            state.result.metrics.rollbacks_performed += 1;
        }
        let result = &mut state.result;
        result.failed_issues += result.fixed_issues;
        result.fixed_issues = 0;
        for (pos, written) in std::mem::take(&mut state.committed) {
            if let Some(outcome) = result.batches.get_mut(pos) {
                outcome.status = BatchStatus::RolledBack;
                outcome.fixed = 0;
                outcome.rolled_back_issues = with_reason(written, reason);
            }
        }
        state.processed.clear();
        info!(snapshot = %base, reason, "Workspace restored to its pre-run state");
        Ok(true)
    }

    /// Drop the batch checkpoint, keeping the workspace as it is
    fn close_checkpoint(&self, store: &mut FsSnapshotStore, state: &mut RunState) {
        if let Some(id) = state.checkpoint.take()
            && let Err(e) = store.discard(&id)
        {
            warn!(snapshot = %id, "Failed to discard checkpoint: {}", e);
        }
    }

    fn discard_base(&self, store: &mut FsSnapshotStore, state: &mut RunState) {
        self.close_checkpoint(store, state);
        if let Some(id) = state.base.take()
            && let Err(e) = store.discard(&id)
        {
            warn!(snapshot = %id, "Failed to discard snapshot: {}", e);
        }
    }

    /// Restore the pre-run state after cancellation and describe where it
    /// happened
    fn cancel(
        &self,
        store: &mut FsSnapshotStore,
        state: &mut RunState,
        phase: String,
        batch: usize,
    ) -> MendError {
        match self.abort_run(store, state, "run cancelled") {
            Ok(rolled_back) => {
                warn!(batch, rolled_back, "Run cancelled");
                MendError::Cancelled {
                    phase,
                    batch,
                    rolled_back,
                }
            }
            Err(e) => e,
        }
    }

    fn finish(&self, state: RunState, timer: Instant, success: bool) -> RunResult {
        let mut result = state.result;
        result.processed_files = state.processed.into_iter().collect();
        result.success = success;
        result.metrics.total_time_ms = timer.elapsed().as_millis() as u64;
        result.finished_at = Utc::now();
        self.emit(EngineEvent::RunFinished {
            success,
            fixed: result.fixed_issues,
            failed: result.failed_issues,
            rollbacks: result.metrics.rollbacks_performed,
        });
        info!(
            fixed = result.fixed_issues,
            failed = result.failed_issues,
            rollbacks = result.metrics.rollbacks_performed,
            success,
            "Fix run finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::config::Config;
    use crate::events::RecordingSink;
    use crate::executor::runner::{CommandOutput, ScriptedRunner};
    use crate::strategy::{ClassifiedIssue, StrategyGenerator};
    use crate::types::{Diagnostic, DomainContext};
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn config(batch_size: usize, max_failures: u32) -> Config {
        let mut config = Config::default();
        config.commands.build = Some("build".to_string());
        config.commands.type_check = None;
        config.commands.analyze = None;
        config.commands.test = None;
        config.execution.batch_size = batch_size;
        config.safety.max_failures_before_stop = max_failures;
        config
    }

    /// `count` files with one `let` each, plus the matching prefer-const diagnostics
    fn workspace(count: usize) -> (TempDir, Vec<Diagnostic>) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        let diagnostics = (0..count)
            .map(|i| {
                let file = format!("src/mod{:02}.ts", i);
                fs::write(temp.path().join(&file), format!("let v{} = {};\nexport {{ v{} }};\n", i, i, i)).unwrap();
                Diagnostic::new(file, 1, 5, "prefer-const", format!("'v{}' is never reassigned. Use 'const' instead.", i))
                    .fixable()
            })
            .collect();
        (temp, diagnostics)
    }

    fn plan(diagnostics: &[Diagnostic]) -> RemediationPlan {
        let classifier = Classifier::default();
        let context = DomainContext::fallback();
        let classifications: Vec<_> = diagnostics
            .iter()
            .map(|d| classifier.classify_diagnostic(d, Some(&context)))
            .collect();
        let issues: Vec<ClassifiedIssue> = diagnostics
            .iter()
            .zip(&classifications)
            .map(|(diagnostic, classification)| ClassifiedIssue {
                diagnostic,
                classification,
                context: &context,
            })
            .collect();
        StrategyGenerator::default().generate_batch_strategies(&issues).unwrap()
    }

    fn read_all(root: &Path) -> Vec<(String, String)> {
        let mut files: Vec<_> = fs::read_dir(root.join("src"))
            .unwrap()
            .map(|e| {
                let p = e.unwrap().path();
                (p.display().to_string(), fs::read_to_string(&p).unwrap())
            })
            .collect();
        files.sort();
        files
    }

    /// Build passes `passes` times, then fails
    fn build_passing(passes: usize) -> Arc<ScriptedRunner> {
        let calls = AtomicUsize::new(0);
        Arc::new(ScriptedRunner::new(move |_, _| {
            if calls.fetch_add(1, Ordering::SeqCst) < passes {
                Ok(CommandOutput::ok(""))
            } else {
                Ok(CommandOutput::failed(1, "TS2322: Type 'string' is not assignable"))
            }
        }))
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back_and_aborts() {
        let (temp, diagnostics) = workspace(10);
        let before = read_all(temp.path());
        let plan = plan(&diagnostics);

        let sink = Arc::new(RecordingSink::new());
        let ctx = RunContext::new(temp.path(), config(5, 1)).with_events(sink.clone());
        // Baseline passes, validation after batch 1 fails
        let executor = BatchExecutor::new(ctx, build_passing(1)).unwrap();
        assert_eq!(executor.plan_batches(&plan).len(), 2);

        let result = executor.execute(&plan).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.fixed_issues, 0);
        assert_eq!(result.metrics.rollbacks_performed, 1);
        assert_eq!(result.batches.len(), 1);
        assert_eq!(result.batches[0].status, BatchStatus::RolledBack);
        let aborted = result.aborted.unwrap();
        assert_eq!(aborted.batch, 0);
        assert!(aborted.rollback_attempted);
        assert_eq!(read_all(temp.path()), before);

        assert_eq!(sink.count_where(|e| matches!(e, EngineEvent::SnapshotCreated { .. })), 1);
        assert_eq!(sink.count_where(|e| matches!(e, EngineEvent::RolledBack { .. })), 1);
    }

    #[tokio::test]
    async fn test_successful_run_commits_every_batch() {
        let (temp, diagnostics) = workspace(4);
        let plan = plan(&diagnostics);
        let ctx = RunContext::new(temp.path(), config(2, 3));
        let executor = BatchExecutor::new(ctx, Arc::new(ScriptedRunner::always_ok())).unwrap();

        let result = executor.execute(&plan).await.unwrap();
        assert!(result.success);
        assert!(result.final_validation_passed);
        assert_eq!(result.fixed_issues, 4);
        assert_eq!(result.processed_files.len(), 4);
        assert!(!result.rolled_back());
        assert_eq!(
            fs::read_to_string(temp.path().join("src/mod00.ts")).unwrap(),
            "const v0 = 0;\nexport { v0 };\n"
        );
        // Snapshots are cleaned up after a successful run
        let store = FsSnapshotStore::new(temp.path(), temp.path().join(".lintmend/snapshots"));
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rerun_on_fixed_content_changes_nothing() {
        let (temp, diagnostics) = workspace(3);
        let plan = plan(&diagnostics);
        let ctx = RunContext::new(temp.path(), config(10, 3));
        let executor = BatchExecutor::new(ctx, Arc::new(ScriptedRunner::always_ok())).unwrap();

        let first = executor.execute(&plan).await.unwrap();
        assert_eq!(first.fixed_issues, 3);
        let after_first = read_all(temp.path());

        let second = executor.execute(&plan).await.unwrap();
        assert_eq!(second.fixed_issues, 0);
        assert_eq!(second.batches[0].status, BatchStatus::NoChanges);
        assert_eq!(read_all(temp.path()), after_first);
    }

    #[tokio::test]
    async fn test_unstable_baseline_aborts_before_mutation() {
        let (temp, diagnostics) = workspace(2);
        let before = read_all(temp.path());
        let plan = plan(&diagnostics);
        let ctx = RunContext::new(temp.path(), config(10, 3));
        let executor = BatchExecutor::new(ctx, build_passing(0)).unwrap();

        let err = executor.execute(&plan).await.unwrap_err();
        assert!(matches!(err, MendError::UnstableBaseline { .. }));
        assert_eq!(read_all(temp.path()), before);
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_writing() {
        let (temp, diagnostics) = workspace(2);
        let before = read_all(temp.path());
        let plan = plan(&diagnostics);
        let mut config = config(10, 3);
        config.execution.dry_run = true;
        let runner = Arc::new(ScriptedRunner::always_ok());
        let executor = BatchExecutor::new(RunContext::new(temp.path(), config), runner.clone()).unwrap();

        let result = executor.execute(&plan).await.unwrap();
        assert!(result.dry_run);
        assert_eq!(result.would_fix, 2);
        assert_eq!(result.fixed_issues, 0);
        assert_eq!(read_all(temp.path()), before);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_manual_approval_required() {
        let (temp, diagnostics) = workspace(1);
        let plan = plan(&diagnostics);
        let mut config = config(10, 3);
        config.safety.require_manual_approval = true;

        let executor = BatchExecutor::new(
            RunContext::new(temp.path(), config.clone()),
            Arc::new(ScriptedRunner::always_ok()),
        )
        .unwrap();
        assert!(matches!(executor.execute(&plan).await, Err(MendError::ApprovalRequired)));

        let approved = BatchExecutor::new(RunContext::new(temp.path(), config), Arc::new(ScriptedRunner::always_ok()))
            .unwrap()
            .with_approval(true);
        assert!(approved.execute(&plan).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_continue_after_failure_within_budget() {
        let (temp, diagnostics) = workspace(4);
        let plan = plan(&diagnostics);
        // baseline ok, batch 0 fails, batch 1 and final pass
        let calls = AtomicUsize::new(0);
        let runner = Arc::new(ScriptedRunner::new(move |_, _| {
            if calls.fetch_add(1, Ordering::SeqCst) == 1 {
                Ok(CommandOutput::failed(1, "broken"))
            } else {
                Ok(CommandOutput::ok(""))
            }
        }));
        let executor = BatchExecutor::new(RunContext::new(temp.path(), config(2, 3)), runner).unwrap();

        let result = executor.execute(&plan).await.unwrap();
        assert!(result.success);
        assert_eq!(result.fixed_issues, 2);
        assert_eq!(result.failed_issues, 2);
        assert_eq!(result.metrics.rollbacks_performed, 1);
        assert!(result.aborted.is_none());
        // The undone fixes stay listed so a later run can retry them
        let retry: Vec<_> = result.rolled_back_issues().map(|i| (i.file.as_str(), i.rule_id.as_str())).collect();
        assert_eq!(retry, vec![("src/mod00.ts", "prefer-const"), ("src/mod01.ts", "prefer-const")]);
        assert!(result.batches[1].rolled_back_issues.is_empty());
        // Batch 0 covered mod00 and mod01, which were restored
        assert_eq!(
            fs::read_to_string(temp.path().join("src/mod00.ts")).unwrap(),
            "let v0 = 0;\nexport { v0 };\n"
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("src/mod03.ts")).unwrap(),
            "const v3 = 3;\nexport { v3 };\n"
        );
    }

    #[tokio::test]
    async fn test_emergency_stop_blocks_run() {
        let (temp, diagnostics) = workspace(1);
        let plan = plan(&diagnostics);
        let ctx = RunContext::new(temp.path(), config(10, 3));
        ctx.adjust(|a| a.emergency_stop = Some("syntax errors spiked".to_string()));
        let executor = BatchExecutor::new(ctx, Arc::new(ScriptedRunner::always_ok())).unwrap();
        assert!(matches!(executor.execute(&plan).await, Err(MendError::EmergencyStop(_))));
    }

    #[tokio::test]
    async fn test_reduced_batch_size_applies() {
        let (temp, diagnostics) = workspace(4);
        let plan = plan(&diagnostics);
        let ctx = RunContext::new(temp.path(), config(10, 3));
        ctx.adjust(|a| a.batch_size_override = Some(1));
        let executor = BatchExecutor::new(ctx, Arc::new(ScriptedRunner::always_ok())).unwrap();
        assert_eq!(executor.plan_batches(&plan).len(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_run_restores_workspace() {
        let (temp, diagnostics) = workspace(4);
        let before = read_all(temp.path());
        let plan = plan(&diagnostics);
        let cancel = crate::context::CancelToken::new();
        let trigger = cancel.clone();
        // Cancel while batch 0 is being validated
        let calls = AtomicUsize::new(0);
        let runner = Arc::new(ScriptedRunner::new(move |_, _| {
            if calls.fetch_add(1, Ordering::SeqCst) == 1 {
                trigger.cancel();
            }
            Ok(CommandOutput::ok(""))
        }));
        let ctx = RunContext::new(temp.path(), config(2, 3)).with_cancel(cancel);
        let executor = BatchExecutor::new(ctx, runner).unwrap();

        let err = executor.execute(&plan).await.unwrap_err();
        assert!(matches!(err, MendError::Cancelled { rolled_back: true, .. }));
        assert_eq!(read_all(temp.path()), before);
    }

    #[tokio::test]
    async fn test_cancel_after_commit_restores_pre_run_state() {
        let (temp, diagnostics) = workspace(6);
        let before = read_all(temp.path());
        let plan = plan(&diagnostics);
        let cancel = crate::context::CancelToken::new();
        let trigger = cancel.clone();
        // Baseline and batch 0 pass; cancel while batch 1 is validated.
        // Batch 2 never starts either way.
        let calls = AtomicUsize::new(0);
        let runner = Arc::new(ScriptedRunner::new(move |_, _| {
            if calls.fetch_add(1, Ordering::SeqCst) == 2 {
                trigger.cancel();
            }
            Ok(CommandOutput::ok(""))
        }));
        let sink = Arc::new(RecordingSink::new());
        let ctx = RunContext::new(temp.path(), config(2, 3))
            .with_cancel(cancel)
            .with_events(sink.clone());
        let executor = BatchExecutor::new(ctx, runner).unwrap();

        let err = executor.execute(&plan).await.unwrap_err();
        assert!(matches!(err, MendError::Cancelled { rolled_back: true, .. }));
        assert!(sink.count_where(|e| matches!(e, EngineEvent::BatchCommitted { index: 0, .. })) == 1);
        assert_eq!(read_all(temp.path()), before);

        let store = FsSnapshotStore::new(temp.path(), temp.path().join(".lintmend/snapshots"));
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_safety_limit_after_commit_restores_pre_run_state() {
        let (temp, diagnostics) = workspace(6);
        let before = read_all(temp.path());
        let plan = plan(&diagnostics);
        // Baseline and batch 0 pass, batches 1 and 2 fail
        let executor = BatchExecutor::new(RunContext::new(temp.path(), config(2, 2)), build_passing(2)).unwrap();

        let result = executor.execute(&plan).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.fixed_issues, 0);
        assert_eq!(result.failed_issues, 6);
        assert!(result.processed_files.is_empty());
        // One per failed batch plus the pre-run restore
        assert_eq!(result.metrics.rollbacks_performed, 3);
        assert_eq!(result.aborted.as_ref().map(|a| a.batch), Some(2));
        assert!(result.batches.iter().all(|b| b.status == BatchStatus::RolledBack));
        assert_eq!(read_all(temp.path()), before);

        let undone = &result.batches[0].rolled_back_issues;
        assert_eq!(undone.len(), 2);
        assert!(undone.iter().all(|i| i.reason == "safety limit reached"));
        assert_eq!(undone[0].file, "src/mod00.ts");
        assert_eq!(result.rolled_back_issues().count(), 6);
    }
}
