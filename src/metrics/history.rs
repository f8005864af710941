//! Bounded metrics history
//!
//! A ring buffer of snapshots, optionally mirrored to the database so that
//! regressions and trends survive between runs.

use std::collections::VecDeque;

use tracing::debug;

use super::regression::detect_regression;
use crate::config::RegressionThresholds;
use crate::constants::metrics::TREND_STABLE_BAND;
use crate::storage::SharedDatabase;
use crate::types::{MetricsSnapshot, RegressionReport, Result, Trend};

/// Metrics where a higher value is better
const HIGHER_IS_BETTER: [&str; 2] = ["quality_score", "cache_hit_rate"];

pub struct MetricsHistory {
    capacity: usize,
    entries: VecDeque<MetricsSnapshot>,
    db: Option<SharedDatabase>,
}

impl MetricsHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.min(1024)),
            db: None,
        }
    }

    /// Load the most recent `capacity` snapshots and persist new ones
    pub fn with_database(db: SharedDatabase, capacity: usize) -> Result<Self> {
        let mut history = Self::new(capacity);
        history.entries.extend(db.load_metrics_history(history.capacity)?);
        debug!(loaded = history.entries.len(), "Loaded metrics history");
        history.db = Some(db);
        Ok(history)
    }

    pub fn record(&mut self, snapshot: MetricsSnapshot) -> Result<()> {
        if let Some(db) = &self.db {
            db.insert_metrics(&snapshot, self.capacity)?;
        }
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&MetricsSnapshot> {
        self.entries.back()
    }

    pub fn previous(&self) -> Option<&MetricsSnapshot> {
        self.entries.len().checked_sub(2).and_then(|i| self.entries.get(i))
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &MetricsSnapshot> {
        self.entries.iter()
    }

    /// Values of `metric` over the last `n` snapshots, oldest first
    pub fn recent_values(&self, metric: &str, n: usize) -> Vec<f64> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries
            .iter()
            .skip(skip)
            .filter_map(|m| m.value(metric))
            .collect()
    }

    /// Compare the latest snapshot with the one before it
    pub fn regression(&self, thresholds: &RegressionThresholds) -> Option<RegressionReport> {
        detect_regression(self.previous()?, self.latest()?, thresholds)
    }

    /// Direction of `metric` across the last `window` snapshots.
    ///
    /// `None` with fewer than two data points.
    pub fn trend(&self, metric: &str, window: usize) -> Option<Trend> {
        let values = self.recent_values(metric, window.max(2));
        let (first, last) = (*values.first()?, *values.last()?);
        if values.len() < 2 {
            return None;
        }

        let change = (last - first) / first.abs().max(1.0);
        if change.abs() <= TREND_STABLE_BAND {
            return Some(Trend::Stable);
        }
        let rising = change > 0.0;
        let better = if HIGHER_IS_BETTER.contains(&metric) {
            rising
        } else {
            !rising
        };
        Some(if better {
            Trend::Improving
        } else {
            Trend::Declining
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use std::sync::Arc;

    fn snap(errors: usize, score: f64) -> MetricsSnapshot {
        let mut m = MetricsSnapshot::empty();
        m.errors = errors;
        m.total_issues = errors;
        m.quality_score = score;
        m
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut history = MetricsHistory::new(3);
        for i in 0..5 {
            history.record(snap(i, 90.0)).unwrap();
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.iter().next().unwrap().errors, 2);
        assert_eq!(history.latest().unwrap().errors, 4);
        assert_eq!(history.previous().unwrap().errors, 3);
    }

    #[test]
    fn test_trend_direction() {
        let mut history = MetricsHistory::new(10);
        assert_eq!(history.trend("errors", 5), None);

        for (errors, score) in [(50, 60.0), (40, 70.0), (30, 80.0)] {
            history.record(snap(errors, score)).unwrap();
        }
        assert_eq!(history.trend("errors", 5), Some(Trend::Improving));
        assert_eq!(history.trend("quality_score", 5), Some(Trend::Improving));

        history.record(snap(30, 80.0)).unwrap();
        assert_eq!(history.trend("errors", 2), Some(Trend::Stable));

        history.record(snap(90, 40.0)).unwrap();
        assert_eq!(history.trend("errors", 2), Some(Trend::Declining));
        assert_eq!(history.trend("quality_score", 2), Some(Trend::Declining));
    }

    #[test]
    fn test_regression_uses_last_two() {
        let mut history = MetricsHistory::new(10);
        history.record(snap(10, 90.0)).unwrap();
        assert!(history.regression(&RegressionThresholds::default()).is_none());
        history.record(snap(20, 80.0)).unwrap();
        let report = history.regression(&RegressionThresholds::default()).unwrap();
        assert!(report.regressions.iter().any(|r| r.metric == "errors"));
    }

    #[test]
    fn test_persists_and_reloads() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.initialize().unwrap();
        {
            let mut history = MetricsHistory::with_database(db.clone(), 2).unwrap();
            for i in 0..4 {
                history.record(snap(i, 90.0)).unwrap();
            }
        }
        let reloaded = MetricsHistory::with_database(db, 2).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.latest().unwrap().errors, 3);
    }
}
