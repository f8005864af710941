//! Metrics collection
//!
//! Runs the analyzer, buckets its diagnostics and scores the result.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use tracing::{debug, info};

use super::score::QualityScorer;
use crate::classifier::Classifier;
use crate::domain::DomainDetector;
use crate::executor::Validator;
use crate::types::{
    CategoryCounts, Classification, Diagnostic, DomainContext, DomainCounts, DomainType,
    IssueCategory, MetricsSnapshot, PerformanceMetrics, Result,
};

/// Secondary tags the rule table puts on compiler and resolver errors
const TYPE_ERROR_TAG: &str = "type-error";
const IMPORT_ERROR_TAG: &str = "import-error";

pub struct MetricsTracker<'a> {
    validator: &'a Validator,
    classifier: &'a Classifier,
    detector: &'a DomainDetector,
    scorer: QualityScorer,
}

/// Snapshot together with the diagnostics it was computed from
#[derive(Debug, Clone)]
pub struct Collected {
    pub snapshot: MetricsSnapshot,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> MetricsTracker<'a> {
    pub fn new(
        validator: &'a Validator,
        classifier: &'a Classifier,
        detector: &'a DomainDetector,
        scorer: QualityScorer,
    ) -> Self {
        Self {
            validator,
            classifier,
            detector,
            scorer,
        }
    }

    /// Run the analyzer and build a scored snapshot.
    ///
    /// `None` when no analyze command is configured.
    pub async fn collect(&self) -> Result<Option<Collected>> {
        let started = Instant::now();
        let Some(run) = self.validator.analyze().await? else {
            debug!("No analyze command configured, skipping metrics collection");
            return Ok(None);
        };

        let snapshot = self.snapshot_from(&run.diagnostics, started.elapsed().as_millis() as u64);
        info!(
            total = snapshot.total_issues,
            errors = snapshot.errors,
            score = format!("{:.1}", snapshot.quality_score),
            "Collected quality metrics"
        );
        Ok(Some(Collected {
            snapshot,
            diagnostics: run.diagnostics,
        }))
    }

    /// Build a snapshot from already-ingested diagnostics
    pub fn snapshot_from(&self, diagnostics: &[Diagnostic], duration_ms: u64) -> MetricsSnapshot {
        let files: Vec<String> = diagnostics
            .iter()
            .map(|d| d.file.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let contexts = self.detector.detect_all(self.validator.root(), &files);
        let classifications = self.classifier.classify_all(diagnostics, &contexts);
        self.summarize(diagnostics, &classifications, &contexts, duration_ms)
    }

    /// Build a snapshot from diagnostics already classified by the caller.
    /// `classifications` is parallel to `diagnostics`.
    pub fn summarize(
        &self,
        diagnostics: &[Diagnostic],
        classifications: &[Classification],
        contexts: &HashMap<String, DomainContext>,
        duration_ms: u64,
    ) -> MetricsSnapshot {
        let errors = diagnostics.iter().filter(|d| d.severity.is_error()).count();
        let mut snapshot = MetricsSnapshot::empty();
        snapshot.total_issues = diagnostics.len();
        snapshot.errors = errors;
        snapshot.warnings = diagnostics.len() - errors;
        snapshot.auto_fixable = classifications.iter().filter(|c| c.auto_fix.can_fix).count();
        snapshot.categories = bucket_categories(diagnostics, classifications);
        snapshot.domains = bucket_domains(diagnostics.iter().filter_map(|d| {
            contexts.get(&d.file).map(|c| c.domain)
        }));
        snapshot.performance = PerformanceMetrics {
            duration_ms,
            memory_mb: peak_memory_mb(),
            cache_hit_rate: self.detector.cache_stats().hit_rate(),
        };

        self.scorer.apply(snapshot)
    }
}

fn bucket_categories(diagnostics: &[Diagnostic], classifications: &[Classification]) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for (d, c) in diagnostics.iter().zip(classifications) {
        let tagged = |tag: &str| c.category.secondary.iter().any(|s| s == tag);
        match c.category.primary {
            IssueCategory::Syntax => counts.blocking_syntax += 1,
            IssueCategory::TypeSafety => {
                counts.type_safety += 1;
                if tagged(TYPE_ERROR_TAG) {
                    counts.type_errors += 1;
                }
            }
            IssueCategory::UnusedCode => counts.unused_bindings += 1,
            IssueCategory::FrameworkHooks => counts.hook_dependency += 1,
            IssueCategory::DebugStatement => counts.debug_statements += 1,
            IssueCategory::Import if tagged(IMPORT_ERROR_TAG) || d.severity.is_error() => {
                counts.import_errors += 1
            }
            IssueCategory::Security => counts.security += 1,
            _ => {}
        }
    }
    counts
}

fn bucket_domains(domains: impl Iterator<Item = DomainType>) -> DomainCounts {
    let mut counts = DomainCounts::default();
    for domain in domains {
        match domain {
            DomainType::CalculationCritical => counts.calculation_critical += 1,
            DomainType::AutomationPipeline => counts.automation_pipeline += 1,
            DomainType::Test => counts.test += 1,
            _ => {}
        }
    }
    counts
}

/// Peak resident memory of this process, 0 where unavailable
fn peak_memory_mb() -> f64 {
    #[cfg(target_os = "linux")]
    {
        let kb = std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| {
                status
                    .lines()
                    .find(|l| l.starts_with("VmHWM:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .and_then(|v| v.parse::<f64>().ok())
            });
        if let Some(kb) = kb {
            return kb / 1024.0;
        }
    }
    0.0
}
