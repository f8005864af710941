//! Typed persistence for engine outputs
//!
//! Each record keeps its queryable fields in columns and the full value as
//! JSON so dashboards and CI can read either.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use super::Database;
use crate::types::{
    ActionRecord, Alert, AlertSeverity, GateResult, MetricsSnapshot, ParseWithDefault, Result,
    ResultExt, RunResult, log_filter_error,
};

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

impl Database {
    // =========================================================================
    // Metrics history
    // =========================================================================

    /// Append a snapshot and prune the oldest rows beyond `capacity`
    pub fn insert_metrics(&self, snapshot: &MetricsSnapshot, capacity: usize) -> Result<i64> {
        let json = serde_json::to_string(snapshot)?;
        let capacity = capacity as i64;
        self.transaction(move |conn| {
            conn.execute(
                "INSERT INTO metrics_history
                 (recorded_at, quality_score, total_issues, errors, warnings, snapshot_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    snapshot.timestamp.to_rfc3339(),
                    snapshot.quality_score,
                    snapshot.total_issues as i64,
                    snapshot.errors as i64,
                    snapshot.warnings as i64,
                    json,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.execute(
                "DELETE FROM metrics_history WHERE id NOT IN
                 (SELECT id FROM metrics_history ORDER BY id DESC LIMIT ?1)",
                params![capacity],
            )?;
            Ok(id)
        })
    }

    /// Most recent `limit` snapshots, oldest first
    pub fn load_metrics_history(&self, limit: usize) -> Result<Vec<MetricsSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT snapshot_json FROM metrics_history ORDER BY id DESC LIMIT ?1",
        )?;
        let mut snapshots: Vec<MetricsSnapshot> = stmt
            .query_map(params![limit as i64], |row| row.get::<_, String>(0))?
            .filter_map(|r| log_filter_error(r, "Failed to read metrics row"))
            .filter_map(|json| match serde_json::from_str(&json) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!("Skipping unreadable metrics row: {}", e);
                    None
                }
            })
            .collect();
        snapshots.reverse();
        Ok(snapshots)
    }

    pub fn count_metrics(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM metrics_history", [], |r| r.get(0))
            .with_context("Failed to count metrics history")?;
        Ok(count as usize)
    }

    // =========================================================================
    // Alerts, cooldowns, suppressions
    // =========================================================================

    pub fn insert_alert(&self, alert: &Alert, dispatched: bool) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO alerts
                 (id, metric, severity, current_value, threshold, message, fired_at, dispatched, resolved)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    alert.id,
                    alert.metric,
                    alert.severity.as_str(),
                    alert.current_value,
                    alert.threshold,
                    alert.message,
                    alert.timestamp.to_rfc3339(),
                    dispatched,
                    alert.resolved,
                ],
            )
            .with_context("Failed to store alert")?;
        Ok(())
    }

    /// Most recent alerts, newest first
    pub fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, metric, severity, current_value, threshold, message, fired_at, resolved
             FROM alerts ORDER BY fired_at DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, bool>(7)?,
                ))
            })?
            .filter_map(|r| log_filter_error(r, "Failed to read alert row"))
            .map(
                |(id, metric, severity, current_value, threshold, message, fired_at, resolved)| {
                    Alert {
                        id,
                        metric,
                        severity: AlertSeverity::parse_or_default(&severity),
                        current_value,
                        threshold,
                        message,
                        timestamp: parse_time(&fired_at).unwrap_or_else(Utc::now),
                        resolved,
                    }
                },
            )
            .collect();
        Ok(rows)
    }

    /// Mark every open alert for a metric resolved; returns how many changed
    pub fn resolve_alerts(&self, metric: &str) -> Result<usize> {
        self.conn()?
            .execute(
                "UPDATE alerts SET resolved = 1, resolved_at = ?1
                 WHERE metric = ?2 AND resolved = 0",
                params![Utc::now().to_rfc3339(), metric],
            )
            .with_context("Failed to resolve alerts")
    }

    pub fn last_fired(&self, metric: &str) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT last_fired_at FROM alert_cooldowns WHERE metric = ?1",
                params![metric],
                |r| r.get(0),
            )
            .optional()
            .with_context("Failed to read alert cooldown")?;
        Ok(raw.as_deref().and_then(parse_time))
    }

    pub fn set_last_fired(&self, metric: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO alert_cooldowns (metric, last_fired_at) VALUES (?1, ?2)
                 ON CONFLICT(metric) DO UPDATE SET last_fired_at = excluded.last_fired_at",
                params![metric, at.to_rfc3339()],
            )
            .with_context("Failed to record alert cooldown")?;
        Ok(())
    }

    pub fn suppress_metric(&self, metric: &str, reason: Option<&str>) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO alert_suppressions (metric, reason, created_at)
                 VALUES (?1, ?2, ?3)",
                params![metric, reason, Utc::now().to_rfc3339()],
            )
            .with_context("Failed to suppress metric")?;
        Ok(())
    }

    /// Returns whether a suppression existed
    pub fn unsuppress_metric(&self, metric: &str) -> Result<bool> {
        let removed = self
            .conn()?
            .execute(
                "DELETE FROM alert_suppressions WHERE metric = ?1",
                params![metric],
            )
            .with_context("Failed to remove suppression")?;
        Ok(removed > 0)
    }

    pub fn is_suppressed(&self, metric: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT 1 FROM alert_suppressions WHERE metric = ?1",
                params![metric],
                |r| r.get(0),
            )
            .optional()
            .with_context("Failed to read suppressions")?;
        Ok(found.is_some())
    }

    pub fn suppressed_metrics(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT metric FROM alert_suppressions ORDER BY metric")?;
        let metrics = stmt
            .query_map([], |r| r.get(0))?
            .filter_map(|r| log_filter_error(r, "Failed to read suppression row"))
            .collect();
        Ok(metrics)
    }

    // =========================================================================
    // Auto-response action log
    // =========================================================================

    pub fn log_action(&self, record: &ActionRecord) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO action_log (trigger_name, action, changed, detail, executed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.trigger,
                    record.action.as_str(),
                    record.changed,
                    record.detail,
                    record.timestamp.to_rfc3339(),
                ],
            )
            .with_context("Failed to log auto-response action")?;
        Ok(())
    }

    /// (trigger, action, changed, detail) rows, newest first
    pub fn recent_actions(&self, limit: usize) -> Result<Vec<(String, String, bool, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT trigger_name, action, changed, detail FROM action_log
             ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
            })?
            .filter_map(|r| log_filter_error(r, "Failed to read action row"))
            .collect();
        Ok(rows)
    }

    // =========================================================================
    // Gate results and fix runs
    // =========================================================================

    pub fn insert_gate_result(&self, result: &GateResult) -> Result<()> {
        let json = serde_json::to_string(result)?;
        self.conn()?
            .execute(
                "INSERT INTO gate_results
                 (gate, passed, deployment_approved, status, evaluated_at, result_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    result.gate,
                    result.passed,
                    result.deployment_approved,
                    result.status.to_string(),
                    result.evaluated_at.to_rfc3339(),
                    json,
                ],
            )
            .with_context("Failed to store gate result")?;
        Ok(())
    }

    pub fn latest_gate_result(&self, gate: &str) -> Result<Option<GateResult>> {
        let json: Option<String> = self
            .conn()?
            .query_row(
                "SELECT result_json FROM gate_results WHERE gate = ?1 ORDER BY id DESC LIMIT 1",
                params![gate],
                |r| r.get(0),
            )
            .optional()
            .with_context("Failed to read gate result")?;
        json.map(|j| serde_json::from_str(&j).map_err(Into::into))
            .transpose()
    }

    pub fn insert_run(&self, run: &RunResult) -> Result<()> {
        let json = serde_json::to_string(run)?;
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO fix_runs
                 (id, dry_run, success, fixed_issues, failed_issues, rollbacks, aborted,
                  started_at, finished_at, result_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    run.run_id,
                    run.dry_run,
                    run.success,
                    run.fixed_issues as i64,
                    run.failed_issues as i64,
                    run.metrics.rollbacks_performed,
                    run.aborted.is_some(),
                    run.started_at.to_rfc3339(),
                    run.finished_at.to_rfc3339(),
                    json,
                ],
            )
            .with_context("Failed to store fix run")?;
        Ok(())
    }

    /// Most recent runs, newest first
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunResult>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT result_json FROM fix_runs ORDER BY started_at DESC LIMIT ?1")?;
        let runs = stmt
            .query_map(params![limit as i64], |r| r.get::<_, String>(0))?
            .filter_map(|r| log_filter_error(r, "Failed to read fix run row"))
            .filter_map(|json| serde_json::from_str(&json).ok())
            .collect();
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AlertRule, AutoResponseAction, GateStatus, RunMetrics, SeverityLevel,
        ThresholdDirection,
    };

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn snapshot(score: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            quality_score: score,
            ..MetricsSnapshot::empty()
        }
    }

    #[test]
    fn test_metrics_history_is_bounded() {
        let db = db();
        for i in 0..5 {
            db.insert_metrics(&snapshot(50.0 + i as f64), 3).unwrap();
        }
        assert_eq!(db.count_metrics().unwrap(), 3);

        let history = db.load_metrics_history(10).unwrap();
        let scores: Vec<f64> = history.iter().map(|s| s.quality_score).collect();
        assert_eq!(scores, vec![52.0, 53.0, 54.0]);
    }

    #[test]
    fn test_cooldown_roundtrip() {
        let db = db();
        assert!(db.last_fired("errors").unwrap().is_none());
        let now = Utc::now();
        db.set_last_fired("errors", now).unwrap();
        db.set_last_fired("errors", now).unwrap();
        let stored = db.last_fired("errors").unwrap().unwrap();
        assert_eq!(stored.timestamp(), now.timestamp());
    }

    #[test]
    fn test_suppressions() {
        let db = db();
        assert!(!db.is_suppressed("warnings").unwrap());
        db.suppress_metric("warnings", Some("noisy during migration"))
            .unwrap();
        assert!(db.is_suppressed("warnings").unwrap());
        assert_eq!(db.suppressed_metrics().unwrap(), vec!["warnings".to_string()]);
        assert!(db.unsuppress_metric("warnings").unwrap());
        assert!(!db.unsuppress_metric("warnings").unwrap());
    }

    #[test]
    fn test_alert_log_and_resolve() {
        let db = db();
        let rule = AlertRule {
            metric: "errors".to_string(),
            threshold: 10.0,
            direction: ThresholdDirection::Above,
            severity: AlertSeverity::Error,
            message: "too many errors".to_string(),
        };
        let alert = Alert::from_rule(&rule, 25.0);
        db.insert_alert(&alert, true).unwrap();

        let alerts = db.recent_alerts(10).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Error);
        assert!(!alerts[0].resolved);

        assert_eq!(db.resolve_alerts("errors").unwrap(), 1);
        assert!(db.recent_alerts(10).unwrap()[0].resolved);
    }

    #[test]
    fn test_action_log() {
        let db = db();
        db.log_action(&ActionRecord {
            trigger: "memory-threshold".to_string(),
            action: AutoResponseAction::ReduceBatchSize,
            changed: false,
            detail: "batch size already at minimum".to_string(),
            timestamp: Utc::now(),
        })
        .unwrap();
        let actions = db.recent_actions(5).unwrap();
        assert_eq!(actions[0].1, "reduce-batch-size");
        assert!(!actions[0].2);
    }

    #[test]
    fn test_gate_result_roundtrip() {
        let db = db();
        let result = GateResult {
            gate: "ci".to_string(),
            passed: true,
            deployment_approved: true,
            status: GateStatus::Passing,
            violations: Vec::new(),
            risk_level: SeverityLevel::Low,
            confidence: 100.0,
            evaluated_at: Utc::now(),
        };
        db.insert_gate_result(&result).unwrap();
        let loaded = db.latest_gate_result("ci").unwrap().unwrap();
        assert_eq!(loaded.gate, "ci");
        assert!(db.latest_gate_result("production").unwrap().is_none());
    }

    #[test]
    fn test_run_record() {
        let db = db();
        let now = Utc::now();
        let run = RunResult {
            run_id: "run-1".to_string(),
            dry_run: false,
            success: true,
            fixed_issues: 3,
            failed_issues: 0,
            would_fix: 0,
            processed_files: vec!["src/a.ts".to_string()],
            errors: Vec::new(),
            validation_results: Vec::new(),
            batches: Vec::new(),
            metrics: RunMetrics::default(),
            aborted: None,
            final_validation_passed: true,
            started_at: now,
            finished_at: now,
        };
        db.insert_run(&run).unwrap();
        let runs = db.recent_runs(5).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].fixed_issues, 3);
    }
}
