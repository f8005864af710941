//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/lintmend/) and project (.lintmend/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants;
use crate::ingest::DiagnosticFormat;
use crate::types::{
    AlertRule, AlertSeverity, BlockerFlags, GateThresholds, MendError, QualityGate, Result,
    ThresholdDirection, ValidationKind,
};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    pub project: ProjectConfig,

    /// External tool command lines
    pub commands: CommandsConfig,

    /// Batch execution settings
    pub execution: ExecutionConfig,

    /// Rollback and approval settings
    pub safety: SafetyConfig,

    /// Metrics history and score weights
    pub metrics: MetricsConfig,

    /// Named quality gates
    pub gates: Vec<QualityGate>,

    pub alerting: AlertingConfig,

    /// Domain detection overrides
    pub domain: DomainConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            project: ProjectConfig::default(),
            commands: CommandsConfig::default(),
            execution: ExecutionConfig::default(),
            safety: SafetyConfig::default(),
            metrics: MetricsConfig::default(),
            gates: default_gates(),
            alerting: AlertingConfig::default(),
            domain: DomainConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `MendError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.execution.batch_size == 0 {
            return Err(MendError::config(
                "execution.batch_size must be greater than 0",
            ));
        }

        if self.execution.max_concurrent_batches == 0 {
            return Err(MendError::config(
                "execution.max_concurrent_batches must be greater than 0",
            ));
        }

        if self.safety.max_failures_before_stop == 0 {
            return Err(MendError::config(
                "safety.max_failures_before_stop must be greater than 0",
            ));
        }

        for (kind, secs) in [
            ("build", self.commands.build_timeout_secs),
            ("type_check", self.commands.type_check_timeout_secs),
            ("analyze", self.commands.analyze_timeout_secs),
            ("test", self.commands.test_timeout_secs),
        ] {
            if secs == 0 {
                return Err(MendError::Config(format!(
                    "commands.{}_timeout_secs must be greater than 0",
                    kind
                )));
            }
        }

        for pattern in &self.safety.preserve_paths {
            glob::Pattern::new(pattern).map_err(|e| {
                MendError::Config(format!("Invalid preserve path '{}': {}", pattern, e))
            })?;
        }

        for pattern in self
            .domain
            .preserve_identifiers
            .iter()
            .chain(self.domain.vocabulary_pattern.iter())
        {
            regex::Regex::new(pattern).map_err(|e| {
                MendError::Config(format!("Invalid domain pattern '{}': {}", pattern, e))
            })?;
        }

        if self.metrics.history_capacity == 0 {
            return Err(MendError::config(
                "metrics.history_capacity must be greater than 0",
            ));
        }
        self.metrics.weights.validate()?;

        if self.metrics.regression.count_ratio < 1.0 {
            return Err(MendError::config(
                "metrics.regression.count_ratio must be at least 1.0",
            ));
        }

        let mut names = std::collections::HashSet::new();
        for gate in &self.gates {
            if gate.name.trim().is_empty() {
                return Err(MendError::config("Gate names must not be empty"));
            }
            if !names.insert(gate.name.as_str()) {
                return Err(MendError::Config(format!(
                    "Duplicate gate name: {}",
                    gate.name
                )));
            }
            if let Some(score) = gate.thresholds.min_quality_score
                && !(0.0..=100.0).contains(&score)
            {
                return Err(MendError::Config(format!(
                    "Gate '{}': min_quality_score must be between 0 and 100, got {}",
                    gate.name, score
                )));
            }
        }

        for rule in &self.alerting.rules {
            if !crate::types::MetricsSnapshot::is_known_metric(&rule.metric) {
                return Err(MendError::Config(format!(
                    "Unknown alert metric: {}",
                    rule.metric
                )));
            }
        }

        for channel in &self.alerting.channels {
            if channel.enabled && channel.kind == ChannelKind::Webhook {
                let raw = channel.url.as_deref().ok_or_else(|| {
                    MendError::config("Webhook channel requires a url")
                })?;
                url::Url::parse(raw).map_err(|e| {
                    MendError::Config(format!("Invalid webhook url '{}': {}", raw, e))
                })?;
            }
        }

        Ok(())
    }

    /// Find a gate by name
    pub fn gate(&self, name: &str) -> Option<&QualityGate> {
        self.gates.iter().find(|g| g.name == name)
    }
}

// =============================================================================
// Project Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name (defaults to directory name)
    pub name: Option<String>,

    /// Glob patterns excluded from the domain scan
    pub exclude: Vec<String>,
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub build: Option<String>,
    pub type_check: Option<String>,
    /// Must print diagnostics in `analyze_format`
    pub analyze: Option<String>,
    pub test: Option<String>,

    pub analyze_format: DiagnosticFormat,

    pub build_timeout_secs: u64,
    pub type_check_timeout_secs: u64,
    pub analyze_timeout_secs: u64,
    pub test_timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        use constants::executor::timeout;
        Self {
            build: Some("yarn build".to_string()),
            type_check: Some("yarn tsc --noEmit".to_string()),
            analyze: Some("yarn lint --format json".to_string()),
            test: None,
            analyze_format: DiagnosticFormat::EslintJson,
            build_timeout_secs: timeout::BUILD_SECS,
            type_check_timeout_secs: timeout::TYPE_CHECK_SECS,
            analyze_timeout_secs: timeout::ANALYZE_SECS,
            test_timeout_secs: timeout::TEST_SECS,
        }
    }
}

impl CommandsConfig {
    pub fn command(&self, kind: ValidationKind) -> Option<&str> {
        match kind {
            ValidationKind::Build => self.build.as_deref(),
            ValidationKind::TypeCheck => self.type_check.as_deref(),
            ValidationKind::Analyze => self.analyze.as_deref(),
            ValidationKind::Test => self.test.as_deref(),
        }
    }

    pub fn timeout(&self, kind: ValidationKind) -> Duration {
        let secs = match kind {
            ValidationKind::Build => self.build_timeout_secs,
            ValidationKind::TypeCheck => self.type_check_timeout_secs,
            ValidationKind::Analyze => self.analyze_timeout_secs,
            ValidationKind::Test => self.test_timeout_secs,
        };
        Duration::from_secs(secs)
    }
}

// =============================================================================
// Execution & Safety
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Issues per batch
    pub batch_size: usize,
    /// Batches always run sequentially; values above 1 are reported and ignored
    pub max_concurrent_batches: usize,
    pub validate_after_each_batch: bool,
    /// Keep going after a per-issue fix error
    pub continue_on_error: bool,
    /// Snapshot the workspace before mutating it
    pub create_backups: bool,
    pub dry_run: bool,
    /// Minimum confidence for auto-fix eligibility
    pub min_confidence: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            batch_size: constants::executor::DEFAULT_BATCH_SIZE,
            max_concurrent_batches: 1,
            validate_after_each_batch: true,
            continue_on_error: true,
            create_backups: true,
            dry_run: false,
            min_confidence: constants::strategy::AUTO_FIX_MIN_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub rollback_enabled: bool,
    pub max_failures_before_stop: u32,
    pub require_manual_approval: bool,
    /// Glob patterns for files that are never modified
    pub preserve_paths: Vec<String>,
    /// Rule ids knowingly left open; their issues are planned as ignored
    pub exempt_rules: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            rollback_enabled: true,
            max_failures_before_stop: constants::executor::DEFAULT_MAX_FAILURES,
            require_manual_approval: false,
            preserve_paths: vec![
                "**/*.d.ts".to_string(),
                "**/generated/**".to_string(),
            ],
            exempt_rules: Vec::new(),
        }
    }
}

// =============================================================================
// Metrics
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub history_capacity: usize,
    pub trend_window: usize,
    pub weights: ScoreWeights,
    pub regression: RegressionThresholds,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            history_capacity: constants::metrics::DEFAULT_HISTORY_CAPACITY,
            trend_window: constants::metrics::DEFAULT_TREND_WINDOW,
            weights: ScoreWeights::default(),
            regression: RegressionThresholds::default(),
        }
    }
}

/// Quality score penalties and caps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub syntax_per_issue: f64,
    pub syntax_cap: f64,
    pub type_safety_per_issue: f64,
    pub type_safety_cap: f64,
    pub error_per_issue: f64,
    pub error_cap: f64,
    pub warning_per_issue: f64,
    pub warning_cap: f64,
    pub performance_penalty: f64,
    pub performance_threshold_ms: u64,
    pub clean_bonus: f64,
    /// Type-safety count below which the clean bonus applies
    pub clean_type_safety_limit: usize,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            syntax_per_issue: 10.0,
            syntax_cap: 50.0,
            type_safety_per_issue: 0.2,
            type_safety_cap: 30.0,
            error_per_issue: 0.2,
            error_cap: 20.0,
            warning_per_issue: 0.2,
            warning_cap: 15.0,
            performance_penalty: 5.0,
            performance_threshold_ms: 30_000,
            clean_bonus: 5.0,
            clean_type_safety_limit: 10,
        }
    }
}

impl ScoreWeights {
    fn validate(&self) -> Result<()> {
        let values = [
            ("syntax_per_issue", self.syntax_per_issue),
            ("syntax_cap", self.syntax_cap),
            ("type_safety_per_issue", self.type_safety_per_issue),
            ("type_safety_cap", self.type_safety_cap),
            ("error_per_issue", self.error_per_issue),
            ("error_cap", self.error_cap),
            ("warning_per_issue", self.warning_per_issue),
            ("warning_cap", self.warning_cap),
            ("performance_penalty", self.performance_penalty),
            ("clean_bonus", self.clean_bonus),
        ];
        for (name, value) in values {
            if !(0.0..=100.0).contains(&value) {
                return Err(MendError::Config(format!(
                    "metrics.weights.{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        if self.syntax_per_issue == 0.0 {
            return Err(MendError::config(
                "metrics.weights.syntax_per_issue must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionThresholds {
    /// Count metric regresses when current > previous * ratio
    pub count_ratio: f64,
    /// Score regresses when current < previous - drop
    pub score_drop: f64,
    /// Type-safety increase that makes a regression major
    pub major_type_safety_increase: usize,
    /// More regressed metrics than this makes a regression moderate
    pub moderate_metric_count: usize,
}

impl Default for RegressionThresholds {
    fn default() -> Self {
        Self {
            count_ratio: 1.1,
            score_drop: 5.0,
            major_type_safety_increase: 50,
            moderate_metric_count: 2,
        }
    }
}

// =============================================================================
// Gates
// =============================================================================

fn default_gates() -> Vec<QualityGate> {
    vec![
        QualityGate {
            name: "development".to_string(),
            thresholds: GateThresholds {
                max_errors: Some(100),
                max_warnings: None,
                max_type_safety: None,
                min_quality_score: Some(40.0),
                max_duration_ms: None,
            },
            blockers: BlockerFlags {
                blocking_syntax: true,
                ..Default::default()
            },
            exemptions: Vec::new(),
            last_status: Default::default(),
        },
        QualityGate {
            name: "ci".to_string(),
            thresholds: GateThresholds {
                max_errors: Some(25),
                max_warnings: Some(300),
                max_type_safety: Some(100),
                min_quality_score: Some(60.0),
                max_duration_ms: Some(300_000),
            },
            blockers: BlockerFlags {
                blocking_syntax: true,
                type_errors: true,
                ..Default::default()
            },
            exemptions: Vec::new(),
            last_status: Default::default(),
        },
        QualityGate {
            name: "production".to_string(),
            thresholds: GateThresholds {
                max_errors: Some(0),
                max_warnings: Some(50),
                max_type_safety: Some(10),
                min_quality_score: Some(80.0),
                max_duration_ms: Some(120_000),
            },
            blockers: BlockerFlags {
                blocking_syntax: true,
                type_errors: true,
                import_errors: true,
                security: true,
            },
            exemptions: Vec::new(),
            last_status: Default::default(),
        },
    ]
}

/// Gate used when none is named
pub const DEFAULT_GATE: &str = "ci";

// =============================================================================
// Alerting
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    pub enabled: bool,
    pub cooldown_minutes: i64,
    pub rules: Vec<AlertRule>,
    pub channels: Vec<ChannelConfig>,
    pub auto_response: AutoResponseConfig,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_minutes: constants::alerting::DEFAULT_COOLDOWN_MINUTES,
            rules: default_alert_rules(),
            channels: vec![
                ChannelConfig::new(ChannelKind::Console),
                ChannelConfig::new(ChannelKind::File),
                ChannelConfig {
                    severities: vec![AlertSeverity::Error, AlertSeverity::Critical],
                    ..ChannelConfig::new(ChannelKind::Notification)
                },
            ],
            auto_response: AutoResponseConfig::default(),
        }
    }
}

fn default_alert_rules() -> Vec<AlertRule> {
    let rule = |metric: &str, threshold, direction, severity, message: &str| AlertRule {
        metric: metric.to_string(),
        threshold,
        direction,
        severity,
        message: message.to_string(),
    };
    vec![
        rule(
            "quality_score",
            60.0,
            ThresholdDirection::Below,
            AlertSeverity::Error,
            "Quality score dropped below acceptable level",
        ),
        rule(
            "blocking_syntax",
            0.0,
            ThresholdDirection::Above,
            AlertSeverity::Critical,
            "Parse errors are blocking analysis",
        ),
        rule(
            "errors",
            100.0,
            ThresholdDirection::Above,
            AlertSeverity::Warning,
            "Error count is high",
        ),
        rule(
            "warnings",
            500.0,
            ThresholdDirection::Above,
            AlertSeverity::Info,
            "Warning count is high",
        ),
        rule(
            "duration_ms",
            120_000.0,
            ThresholdDirection::Above,
            AlertSeverity::Warning,
            "Analysis is slow",
        ),
        rule(
            "memory_mb",
            2048.0,
            ThresholdDirection::Above,
            AlertSeverity::Warning,
            "Analysis memory usage is high",
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Console,
    File,
    Notification,
    Webhook,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Console => write!(f, "console"),
            Self::File => write!(f, "file"),
            Self::Notification => write!(f, "notification"),
            Self::Webhook => write!(f, "webhook"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub kind: ChannelKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Severities this channel receives
    #[serde(default = "all_severities")]
    pub severities: Vec<AlertSeverity>,
    /// Webhook endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Environment variable holding the webhook bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
    /// Alert log path for the file channel (default: .lintmend/alerts.log)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ChannelConfig {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            enabled: true,
            severities: all_severities(),
            url: None,
            token_env: None,
            path: None,
        }
    }

    pub fn accepts(&self, severity: AlertSeverity) -> bool {
        self.severities.contains(&severity)
    }
}

fn default_true() -> bool {
    true
}

fn all_severities() -> Vec<AlertSeverity> {
    vec![
        AlertSeverity::Info,
        AlertSeverity::Warning,
        AlertSeverity::Error,
        AlertSeverity::Critical,
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoResponseConfig {
    pub enabled: bool,
    /// Duration above which a snapshot counts as slow
    pub degradation_threshold_ms: u64,
    pub memory_limit_mb: f64,
    /// Score below which non-critical rules are skipped
    pub score_floor: f64,
    /// New blocking-syntax errors that trigger an emergency stop
    pub syntax_spike: usize,
}

impl Default for AutoResponseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            degradation_threshold_ms: 60_000,
            memory_limit_mb: 2048.0,
            score_floor: 30.0,
            syntax_spike: 10,
        }
    }
}

// =============================================================================
// Domain
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Extra identifier patterns that must never be renamed
    pub preserve_identifiers: Vec<String>,
    /// Replaces the built-in vocabulary pattern for calculation-critical files
    pub vocabulary_pattern: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
