//! Alert records and auto-response actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    #[default]
    Warning,
    Error,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown alert severity: {}", s)),
        }
    }
}

/// Which side of the threshold fires the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdDirection {
    #[default]
    Above,
    Below,
}

impl ThresholdDirection {
    pub fn breached(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Above => value > threshold,
            Self::Below => value < threshold,
        }
    }
}

/// Threshold rule for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub metric: String,
    pub threshold: f64,
    #[serde(default)]
    pub direction: ThresholdDirection,
    #[serde(default)]
    pub severity: AlertSeverity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub metric: String,
    pub severity: AlertSeverity,
    pub current_value: f64,
    pub threshold: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub resolved: bool,
}

impl Alert {
    pub fn from_rule(rule: &AlertRule, current_value: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metric: rule.metric.clone(),
            severity: rule.severity,
            current_value,
            threshold: rule.threshold,
            message: rule.message.clone(),
            timestamp: Utc::now(),
            resolved: false,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} (value {:.1}, threshold {:.1})",
            self.severity, self.metric, self.message, self.current_value, self.threshold
        )
    }
}

/// Corrective action taken in response to a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoResponseAction {
    EnableCaching,
    ReduceBatchSize,
    SkipNonCriticalRules,
    EmergencyStop,
}

impl AutoResponseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnableCaching => "enable-caching",
            Self::ReduceBatchSize => "reduce-batch-size",
            Self::SkipNonCriticalRules => "skip-non-critical-rules",
            Self::EmergencyStop => "emergency-stop",
        }
    }
}

impl fmt::Display for AutoResponseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one auto-response execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub trigger: String,
    pub action: AutoResponseAction,
    /// False when the action was already in effect
    pub changed: bool,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction() {
        assert!(ThresholdDirection::Above.breached(11.0, 10.0));
        assert!(!ThresholdDirection::Above.breached(10.0, 10.0));
        assert!(ThresholdDirection::Below.breached(59.0, 60.0));
        assert!(!ThresholdDirection::Below.breached(60.0, 60.0));
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("CRITICAL".parse::<AlertSeverity>(), Ok(AlertSeverity::Critical));
        assert!("loud".parse::<AlertSeverity>().is_err());
    }
}
