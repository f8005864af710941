//! Quality score
//!
//! Starts at 100 and subtracts capped penalties per bucket. Blocking syntax
//! weighs heaviest since it hides every other finding.

use crate::config::ScoreWeights;
use crate::types::MetricsSnapshot;

#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    weights: ScoreWeights,
}

impl QualityScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn score(&self, m: &MetricsSnapshot) -> f64 {
        let w = &self.weights;
        let syntax = m.categories.blocking_syntax;
        let type_safety = m.categories.type_safety;

        let mut score = 100.0;
        score -= (syntax as f64 * w.syntax_per_issue).min(w.syntax_cap);
        score -= (type_safety as f64 * w.type_safety_per_issue).min(w.type_safety_cap);
        score -= (m.other_errors() as f64 * w.error_per_issue).min(w.error_cap);
        score -= (m.warnings as f64 * w.warning_per_issue).min(w.warning_cap);

        if m.performance.duration_ms > w.performance_threshold_ms {
            score -= w.performance_penalty;
        }
        if syntax == 0 && type_safety < w.clean_type_safety_limit {
            score += w.clean_bonus;
        }

        score.clamp(0.0, 100.0)
    }

    /// Fill in `quality_score` and return the snapshot
    pub fn apply(&self, mut snapshot: MetricsSnapshot) -> MetricsSnapshot {
        snapshot.quality_score = self.score(&snapshot);
        snapshot
    }
}
