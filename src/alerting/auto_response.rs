//! Auto-response
//!
//! Named triggers are evaluated over the metrics history and mapped to
//! corrective actions on the run context. Actions are idempotent: running
//! one twice leaves the same state as running it once. Every execution is
//! written to the action log whether or not it changed anything.

use chrono::Utc;
use tracing::{info, warn};

use crate::config::AutoResponseConfig;
use crate::constants::alerting::{MIN_BATCH_SIZE, SUSTAINED_WINDOW};
use crate::context::RunContext;
use crate::events::EngineEvent;
use crate::metrics::MetricsHistory;
use crate::storage::SharedDatabase;
use crate::types::{ActionRecord, AutoResponseAction, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Several consecutive slow analyses
    SustainedDegradation,
    MemoryExceeded,
    /// Quality score under the configured floor
    QualityCollapse,
    /// Blocking syntax errors jumped between snapshots
    SyntaxSpike,
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SustainedDegradation => "sustained-performance-degradation",
            Self::MemoryExceeded => "memory-threshold-exceeded",
            Self::QualityCollapse => "quality-collapse",
            Self::SyntaxSpike => "syntax-error-spike",
        }
    }

    pub fn action(&self) -> AutoResponseAction {
        match self {
            Self::SustainedDegradation => AutoResponseAction::EnableCaching,
            Self::MemoryExceeded => AutoResponseAction::ReduceBatchSize,
            Self::QualityCollapse => AutoResponseAction::SkipNonCriticalRules,
            Self::SyntaxSpike => AutoResponseAction::EmergencyStop,
        }
    }
}

pub struct AutoResponder {
    config: AutoResponseConfig,
    ctx: RunContext,
    db: SharedDatabase,
}

impl AutoResponder {
    pub fn new(config: AutoResponseConfig, ctx: RunContext, db: SharedDatabase) -> Self {
        Self { config, ctx, db }
    }

    /// Triggers whose conditions hold for the latest history
    pub fn triggers(&self, history: &MetricsHistory) -> Vec<Trigger> {
        let Some(latest) = history.latest() else {
            return Vec::new();
        };
        let mut fired = Vec::new();

        let slow = history.recent_values("duration_ms", SUSTAINED_WINDOW);
        if slow.len() == SUSTAINED_WINDOW
            && slow
                .iter()
                .all(|d| *d > self.config.degradation_threshold_ms as f64)
        {
            fired.push(Trigger::SustainedDegradation);
        }
        if latest.performance.memory_mb > self.config.memory_limit_mb {
            fired.push(Trigger::MemoryExceeded);
        }
        if latest.quality_score < self.config.score_floor {
            fired.push(Trigger::QualityCollapse);
        }
        if let Some(previous) = history.previous() {
            let jump = latest
                .categories
                .blocking_syntax
                .saturating_sub(previous.categories.blocking_syntax);
            if jump >= self.config.syntax_spike {
                fired.push(Trigger::SyntaxSpike);
            }
        }
        fired
    }

    /// Evaluate triggers and execute their actions
    pub fn respond(&self, history: &MetricsHistory) -> Result<Vec<ActionRecord>> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }
        self.triggers(history)
            .into_iter()
            .map(|trigger| self.execute(trigger))
            .collect()
    }

    pub fn execute(&self, trigger: Trigger) -> Result<ActionRecord> {
        let action = trigger.action();
        let (changed, detail) = match action {
            AutoResponseAction::EnableCaching => (
                self.ctx.adjust(|a| a.caching_enabled = true),
                "domain context caching enabled".to_string(),
            ),
            AutoResponseAction::ReduceBatchSize => {
                let size = (self.ctx.config().execution.batch_size / 2).max(MIN_BATCH_SIZE);
                (
                    self.ctx.adjust(|a| a.batch_size_override = Some(size)),
                    format!("batch size limited to {}", size),
                )
            }
            AutoResponseAction::SkipNonCriticalRules => (
                self.ctx.adjust(|a| a.skip_non_critical = true),
                "only high and critical issues will be fixed".to_string(),
            ),
            AutoResponseAction::EmergencyStop => (
                self.ctx
                    .adjust(|a| a.emergency_stop = Some(trigger.name().to_string())),
                "live fix runs are halted".to_string(),
            ),
        };

        let record = ActionRecord {
            trigger: trigger.name().to_string(),
            action,
            changed,
            detail,
            timestamp: Utc::now(),
        };
        if action == AutoResponseAction::EmergencyStop && changed {
            warn!(trigger = trigger.name(), "Emergency stop engaged");
        } else {
            info!(trigger = trigger.name(), %action, changed, "Auto-response executed");
        }

        self.db.log_action(&record)?;
        self.ctx.events().emit(EngineEvent::ActionExecuted {
            record: record.clone(),
        });
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::Database;
    use crate::types::MetricsSnapshot;
    use std::sync::Arc;

    fn responder() -> (AutoResponder, RunContext, SharedDatabase) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.initialize().unwrap();
        let ctx = RunContext::new("/tmp/workspace", Config::default());
        let responder = AutoResponder::new(AutoResponseConfig::default(), ctx.clone(), db.clone());
        (responder, ctx, db)
    }

    fn snap(duration_ms: u64, score: f64, syntax: usize) -> MetricsSnapshot {
        let mut m = MetricsSnapshot::empty();
        m.performance.duration_ms = duration_ms;
        m.quality_score = score;
        m.categories.blocking_syntax = syntax;
        m
    }

    #[test]
    fn test_quiet_history_fires_nothing() {
        let (responder, _, _) = responder();
        let mut history = MetricsHistory::new(10);
        assert!(responder.triggers(&history).is_empty());
        history.record(snap(1000, 90.0, 0)).unwrap();
        assert!(responder.triggers(&history).is_empty());
    }

    #[test]
    fn test_sustained_degradation_needs_full_window() {
        let (responder, _, _) = responder();
        let mut history = MetricsHistory::new(10);
        history.record(snap(90_000, 90.0, 0)).unwrap();
        history.record(snap(90_000, 90.0, 0)).unwrap();
        assert!(responder.triggers(&history).is_empty());
        history.record(snap(90_000, 90.0, 0)).unwrap();
        assert_eq!(responder.triggers(&history), vec![Trigger::SustainedDegradation]);
    }

    #[test]
    fn test_syntax_spike_stops_runs() {
        let (responder, ctx, db) = responder();
        let mut history = MetricsHistory::new(10);
        history.record(snap(1000, 90.0, 0)).unwrap();
        history.record(snap(1000, 90.0, 12)).unwrap();

        let records = responder.respond(&history).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AutoResponseAction::EmergencyStop);
        assert!(records[0].changed);
        assert_eq!(
            ctx.adjustments().emergency_stop.as_deref(),
            Some("syntax-error-spike")
        );
        assert_eq!(db.recent_actions(10).unwrap().len(), 1);
    }

    #[test]
    fn test_actions_are_idempotent_and_always_logged() {
        let (responder, ctx, db) = responder();

        let first = responder.execute(Trigger::MemoryExceeded).unwrap();
        let second = responder.execute(Trigger::MemoryExceeded).unwrap();
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(ctx.effective_batch_size(), 5);

        let first = responder.execute(Trigger::QualityCollapse).unwrap();
        let second = responder.execute(Trigger::QualityCollapse).unwrap();
        assert!(first.changed && !second.changed);
        assert!(ctx.adjustments().skip_non_critical);

        assert_eq!(db.recent_actions(10).unwrap().len(), 4);
    }

    #[test]
    fn test_disabled_does_nothing() {
        let (_, ctx, db) = responder();
        let config = AutoResponseConfig {
            enabled: false,
            ..Default::default()
        };
        let responder = AutoResponder::new(config, ctx.clone(), db);
        let mut history = MetricsHistory::new(10);
        history.record(snap(1000, 10.0, 0)).unwrap();
        assert!(responder.respond(&history).unwrap().is_empty());
        assert!(!ctx.adjustments().skip_non_critical);
    }
}
