//! Engine pipeline
//!
//! `analyze -> classify -> plan -> execute -> collect -> gate -> alert`
//!
//! Each CLI command drives one entry point here. Every stage reports
//! through the run's event sink; nothing in this module prints.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::alerting::{AlertController, AutoResponder, build_channels};
use crate::classifier::{Classifier, assess_overall_severity};
use crate::config::DEFAULT_GATE;
use crate::context::RunContext;
use crate::domain::{DomainDetector, DomainDistribution, WorkspaceScanner, domain_distribution};
use crate::events::StageGuard;
use crate::executor::{BatchExecutor, CommandRunner, Validator};
use crate::gate::GateEvaluator;
use crate::metrics::{MetricsHistory, MetricsTracker, QualityScorer};
use crate::report::{QualityReport, ReportBuilder, ReportFiles, write_report};
use crate::storage::SharedDatabase;
use crate::strategy::{ClassifiedIssue, PolicyContext, StrategyGenerator};
use crate::types::{
    ActionRecord, Alert, Classification, Diagnostic, DomainContext, GateResult, MendError,
    MetricsSnapshot, OverallSeverity, RegressionReport, RemediationPlan, Result, RunResult,
};

/// Everything one analyzer pass produced
#[derive(Debug, Clone)]
pub struct Analysis {
    pub diagnostics: Vec<Diagnostic>,
    /// Parallel to `diagnostics`
    pub classifications: Vec<Classification>,
    pub contexts: HashMap<String, DomainContext>,
    pub plan: RemediationPlan,
    pub snapshot: MetricsSnapshot,
    pub overall: OverallSeverity,
}

/// Side effects of recording one snapshot
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub alerts: Vec<Alert>,
    pub regression: Option<RegressionReport>,
    pub actions: Vec<ActionRecord>,
}

impl Observation {
    fn merge(&mut self, other: Observation) {
        self.alerts.extend(other.alerts);
        self.actions.extend(other.actions);
        if other.regression.is_some() {
            self.regression = other.regression;
        }
    }
}

/// Outcome of `fix`
#[derive(Debug, Clone)]
pub struct FixSummary {
    pub before: Analysis,
    pub run: RunResult,
    /// Metrics after a live run; `None` for dry runs
    pub after: Option<MetricsSnapshot>,
    pub gate: Option<GateResult>,
    pub observation: Observation,
}

pub struct Pipeline {
    ctx: RunContext,
    runner: Arc<dyn CommandRunner>,
    db: SharedDatabase,
    classifier: Classifier,
    detector: DomainDetector,
    generator: StrategyGenerator,
    validator: Validator,
    scorer: QualityScorer,
    gates: GateEvaluator,
    history: MetricsHistory,
    alerts: AlertController,
    responder: AutoResponder,
}

impl Pipeline {
    pub fn new(ctx: RunContext, runner: Arc<dyn CommandRunner>, db: SharedDatabase) -> Result<Self> {
        let config = ctx.config();
        config.validate()?;

        let validator = Validator::new(runner.clone(), ctx.root(), config.commands.clone())
            .with_cancel(ctx.cancel_token().clone());
        let channels = build_channels(&config.alerting, ctx.project_dir(), ctx.events().clone())?;
        let alerts = AlertController::new(&config.alerting, channels, db.clone(), ctx.events().clone());
        let responder = AutoResponder::new(config.alerting.auto_response.clone(), ctx.clone(), db.clone());
        let history = MetricsHistory::with_database(db.clone(), config.metrics.history_capacity)?;

        Ok(Self {
            classifier: Classifier::default(),
            detector: DomainDetector::new(&config.domain)?,
            generator: StrategyGenerator::new(PolicyContext::from_config(config)?),
            scorer: QualityScorer::new(config.metrics.weights.clone()),
            gates: GateEvaluator::new(),
            validator,
            history,
            alerts,
            responder,
            runner,
            db,
            ctx,
        })
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }

    /// Configured project name, else the workspace directory name
    pub fn project_name(&self) -> String {
        self.ctx.config().project.name.clone().unwrap_or_else(|| {
            self.ctx
                .root()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string())
        })
    }

    /// Domain breakdown of every source file in the workspace, not only
    /// the ones with findings
    pub fn workspace_domains(&self) -> Result<DomainDistribution> {
        let scanner = WorkspaceScanner::new(self.ctx.root())
            .with_exclude(&self.ctx.config().project.exclude)?;
        let files = scanner.paths();
        Ok(domain_distribution(&self.detector, self.ctx.root(), &files))
    }

    fn tracker(&self) -> MetricsTracker<'_> {
        MetricsTracker::new(&self.validator, &self.classifier, &self.detector, self.scorer.clone())
    }

    /// Run the analyzer, classify every finding and build a plan.
    /// Nothing is recorded.
    #[instrument(skip_all)]
    pub async fn analyze(&self) -> Result<Analysis> {
        let _stage = StageGuard::start(self.ctx.events().as_ref(), "analyze");
        let started = Instant::now();
        let run = self
            .validator
            .analyze()
            .await?
            .ok_or_else(|| MendError::config("commands.analyze is not configured"))?;
        self.plan_from(run.diagnostics, started.elapsed().as_millis() as u64)
    }

    /// Classify and plan already-ingested diagnostics
    pub fn plan_from(&self, diagnostics: Vec<Diagnostic>, duration_ms: u64) -> Result<Analysis> {
        let files: Vec<String> = diagnostics
            .iter()
            .map(|d| d.file.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let contexts = self.detector.detect_all(self.ctx.root(), &files);
        let classifications = self.classifier.classify_all(&diagnostics, &contexts);
        let overall = assess_overall_severity(&classifications);

        let fallback = DomainContext::fallback();
        let issues: Vec<ClassifiedIssue> = diagnostics
            .iter()
            .zip(&classifications)
            .map(|(diagnostic, classification)| ClassifiedIssue {
                diagnostic,
                classification,
                context: contexts.get(&diagnostic.file).unwrap_or(&fallback),
            })
            .collect();
        let plan = self.generator.generate_batch_strategies(&issues)?;
        let snapshot = self
            .tracker()
            .summarize(&diagnostics, &classifications, &contexts, duration_ms);

        info!(
            issues = diagnostics.len(),
            auto_fixable = plan.auto_fixable,
            severity = %overall.level,
            score = format!("{:.1}", snapshot.quality_score),
            "Analysis complete"
        );
        Ok(Analysis {
            diagnostics,
            classifications,
            contexts,
            plan,
            snapshot,
            overall,
        })
    }

    /// Record a snapshot, then check alert rules, regressions and
    /// auto-response triggers against the updated history
    pub async fn observe(&mut self, snapshot: &MetricsSnapshot) -> Result<Observation> {
        let _stage = StageGuard::start(self.ctx.events().as_ref(), "observe");
        self.history.record(snapshot.clone())?;

        let mut alerts = self.alerts.check(snapshot).await?;
        let regression = self.history.regression(&self.ctx.config().metrics.regression);
        if let Some(report) = &regression
            && let Some(alert) = self.alerts.check_regression(report).await?
        {
            alerts.push(alert);
        }
        let actions = self.responder.respond(&self.history)?;

        Ok(Observation {
            alerts,
            regression,
            actions,
        })
    }

    /// Analyze and record the snapshot
    pub async fn analyze_and_record(&mut self) -> Result<(Analysis, Observation)> {
        let analysis = self.analyze().await?;
        let observation = self.observe(&analysis.snapshot).await?;
        Ok((analysis, observation))
    }

    /// Full remediation cycle.
    ///
    /// Auto-response runs on the pre-fix snapshot, so its adjustments
    /// (batch size, skipped rules, emergency stop) apply to this run.
    #[instrument(skip_all, fields(approved = approved))]
    pub async fn fix(&mut self, approved: bool) -> Result<FixSummary> {
        let (before, mut observation) = self.analyze_and_record().await?;

        let run = {
            let _stage = StageGuard::start(self.ctx.events().as_ref(), "execute");
            let executor = BatchExecutor::new(self.ctx.clone(), self.runner.clone())?
                .with_approval(approved);
            executor.execute(&before.plan).await?
        };
        if !run.dry_run {
            self.db.insert_run(&run)?;
        }

        let mut after = None;
        let mut gate = None;
        if !run.dry_run {
            if !self.ctx.adjustments().caching_enabled {
                self.detector.clear_cache();
            }
            let collected = {
                let _stage = StageGuard::start(self.ctx.events().as_ref(), "collect");
                self.tracker().collect().await?
            };
            if let Some(collected) = collected {
                observation.merge(self.observe(&collected.snapshot).await?);
                gate = Some(self.evaluate_gate(DEFAULT_GATE, &collected.snapshot)?);
                after = Some(collected.snapshot);
            }
        }

        Ok(FixSummary {
            before,
            run,
            after,
            gate,
            observation,
        })
    }

    /// Evaluate a named gate against fresh metrics and persist the result
    pub async fn quality_gate(&mut self, name: &str) -> Result<(GateResult, Observation)> {
        if self.ctx.config().gate(name).is_none() {
            return Err(MendError::Config(format!("Unknown quality gate: {}", name)));
        }
        let (analysis, observation) = self.analyze_and_record().await?;
        let result = self.evaluate_gate(name, &analysis.snapshot)?;
        Ok((result, observation))
    }

    fn evaluate_gate(&self, name: &str, snapshot: &MetricsSnapshot) -> Result<GateResult> {
        let _stage = StageGuard::start(self.ctx.events().as_ref(), "gate");
        let gate = self
            .ctx
            .config()
            .gate(name)
            .ok_or_else(|| MendError::Config(format!("Unknown quality gate: {}", name)))?;
        let result = self.gates.evaluate(gate, snapshot);
        self.db.insert_gate_result(&result)?;
        if !result.passed {
            warn!(
                gate = name,
                violations = result.violations.len(),
                "Quality gate failed"
            );
        }
        Ok(result)
    }

    /// Analyze, evaluate the default gate and write the quality report
    pub async fn report(&mut self) -> Result<(QualityReport, ReportFiles)> {
        let (analysis, observation) = self.analyze_and_record().await?;
        let gate = self.evaluate_gate(DEFAULT_GATE, &analysis.snapshot)?;

        let _stage = StageGuard::start(self.ctx.events().as_ref(), "report");
        let config = self.ctx.config();
        let report = ReportBuilder::new(self.project_name(), analysis.snapshot.clone())
            .history(&self.history, config.metrics.trend_window, &config.metrics.regression)
            .gate(gate)
            .plan(&analysis.plan)
            .alerts(observation.alerts)
            .build();
        let files = write_report(&report, &self.ctx.report_dir())?;
        Ok((report, files))
    }
}
