//! Alert evaluation and dispatch
//!
//! Rules are checked against a snapshot. A breached rule becomes an alert,
//! which is dropped when its metric is suppressed or still cooling down and
//! otherwise fanned out to every channel accepting its severity.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::channels::BoxedChannel;
use crate::config::AlertingConfig;
use crate::events::{EngineEvent, SharedSink};
use crate::storage::SharedDatabase;
use crate::types::{
    Alert, AlertRule, AlertSeverity, MetricsSnapshot, RegressionReport, RegressionSeverity, Result,
    ThresholdDirection,
};

/// Pseudo-metric used for regression alerts
pub const REGRESSION_METRIC: &str = "regression";

/// What happened to one alert
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Delivered to the named channels
    Sent(Vec<String>),
    Suppressed,
    CoolingDown { last_fired: DateTime<Utc> },
}

pub struct AlertController {
    rules: Vec<AlertRule>,
    cooldown: Duration,
    enabled: bool,
    channels: Vec<BoxedChannel>,
    db: SharedDatabase,
    events: SharedSink,
}

impl AlertController {
    pub fn new(
        config: &AlertingConfig,
        channels: Vec<BoxedChannel>,
        db: SharedDatabase,
        events: SharedSink,
    ) -> Self {
        Self {
            rules: config.rules.clone(),
            cooldown: Duration::minutes(config.cooldown_minutes),
            enabled: config.enabled,
            channels,
            db,
            events,
        }
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Rules breached by `metrics`, as fresh alerts
    pub fn evaluate(&self, metrics: &MetricsSnapshot) -> Vec<Alert> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let value = metrics.value(&rule.metric)?;
                rule.direction
                    .breached(value, rule.threshold)
                    .then(|| Alert::from_rule(rule, value))
            })
            .collect()
    }

    /// Evaluate and dispatch. Metrics whose rules no longer fire have their
    /// open alerts resolved. Returns the alerts that were sent.
    pub async fn check(&self, metrics: &MetricsSnapshot) -> Result<Vec<Alert>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let alerts = self.evaluate(metrics);
        for rule in &self.rules {
            if !alerts.iter().any(|a| a.metric == rule.metric) {
                let resolved = self.db.resolve_alerts(&rule.metric)?;
                if resolved > 0 {
                    info!(metric = %rule.metric, resolved, "Alert condition cleared");
                }
            }
        }

        let mut sent = Vec::new();
        for alert in alerts {
            if let Dispatch::Sent(_) = self.fire(&alert, Utc::now()).await? {
                sent.push(alert);
            }
        }
        Ok(sent)
    }

    /// Raise an alert for a detected regression
    pub async fn check_regression(&self, report: &RegressionReport) -> Result<Option<Alert>> {
        if !self.enabled {
            return Ok(None);
        }
        let severity = match report.severity {
            RegressionSeverity::Critical => AlertSeverity::Critical,
            RegressionSeverity::Major => AlertSeverity::Error,
            RegressionSeverity::Moderate => AlertSeverity::Warning,
            RegressionSeverity::Minor => AlertSeverity::Info,
        };
        let metrics: Vec<&str> = report.regressions.iter().map(|r| r.metric.as_str()).collect();
        let rule = AlertRule {
            metric: REGRESSION_METRIC.to_string(),
            threshold: 0.0,
            direction: ThresholdDirection::Above,
            severity,
            message: format!("{} regression in {}", report.severity, metrics.join(", ")),
        };
        let alert = Alert::from_rule(&rule, report.regressions.len() as f64);
        Ok(match self.fire(&alert, Utc::now()).await? {
            Dispatch::Sent(_) => Some(alert),
            _ => None,
        })
    }

    /// Dispatch one alert unless suppressed or cooling down
    pub async fn fire(&self, alert: &Alert, now: DateTime<Utc>) -> Result<Dispatch> {
        if self.db.is_suppressed(&alert.metric)? {
            self.db.insert_alert(alert, false)?;
            self.events.emit(EngineEvent::AlertSuppressed {
                metric: alert.metric.clone(),
                reason: "metric is suppressed".to_string(),
            });
            return Ok(Dispatch::Suppressed);
        }

        if let Some(last_fired) = self.db.last_fired(&alert.metric)?
            && now - last_fired < self.cooldown
        {
            self.db.insert_alert(alert, false)?;
            self.events.emit(EngineEvent::AlertSuppressed {
                metric: alert.metric.clone(),
                reason: format!("cooling down since {}", last_fired.to_rfc3339()),
            });
            return Ok(Dispatch::CoolingDown { last_fired });
        }

        let mut delivered = Vec::new();
        for channel in self.channels.iter().filter(|c| c.accepts(alert.severity)) {
            match channel.send(alert).await {
                Ok(()) => delivered.push(channel.name().to_string()),
                Err(e) => warn!(channel = channel.name(), "Alert delivery failed: {}", e),
            }
        }

        self.db.set_last_fired(&alert.metric, now)?;
        self.db.insert_alert(alert, true)?;
        self.events.emit(EngineEvent::AlertDispatched {
            alert: alert.clone(),
            channels: delivered.clone(),
        });
        Ok(Dispatch::Sent(delivered))
    }

    pub fn suppress(&self, metric: &str, reason: Option<&str>) -> Result<()> {
        self.db.suppress_metric(metric, reason)
    }

    pub fn unsuppress(&self, metric: &str) -> Result<bool> {
        self.db.unsuppress_metric(metric)
    }
}
