//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! Values that users may reasonably want to change live in `config` as
//! defaults; the ones here are structural.

/// Project layout under the workspace root
pub mod paths {
    /// Project data directory
    pub const PROJECT_DIR: &str = ".lintmend";

    pub const CONFIG_FILE: &str = "config.toml";

    pub const DATABASE_FILE: &str = "lintmend.db";

    pub const SNAPSHOT_DIR: &str = "snapshots";

    pub const REPORT_DIR: &str = "reports";

    pub const ALERT_LOG: &str = "alerts.log";

    pub const RUN_LOCK: &str = "run.lock";

    /// Environment variable prefix for configuration overrides
    pub const ENV_PREFIX: &str = "LINTMEND_";
}

/// Classifier constants
pub mod classifier {
    /// Confidence boost when the analyzer offers a fix the rule table does not know about
    pub const TOOL_FIX_BOOST: f64 = 0.2;

    /// Cap for the boosted confidence above
    pub const TOOL_FIX_CAP: f64 = 0.9;

    /// Boost when both the table and the analyzer agree a fix exists
    pub const AGREEMENT_BOOST: f64 = 0.05;

    pub const AGREEMENT_CAP: f64 = 0.99;

    /// Severity score added for sensitive domains
    pub const SENSITIVE_SCORE_BOOST: u8 = 15;

    /// More high-severity classifications than this makes the aggregate high
    pub const HIGH_COUNT_LIMIT: usize = 10;

    pub const HIGH_MEAN_SCORE: f64 = 70.0;

    pub const MEDIUM_MEAN_SCORE: f64 = 40.0;
}

/// Domain detection constants
pub mod domain {
    /// A pattern weight above this counts as a strong match
    pub const STRONG_MATCH_WEIGHT: f64 = 0.7;

    /// Confidence for files no pattern matched
    pub const FALLBACK_CONFIDENCE: f64 = 0.3;

    /// Bytes of file content scanned for content patterns
    pub const MAX_CONTENT_BYTES: usize = 256 * 1024;
}

/// Strategy and planning constants
pub mod strategy {
    /// Minimum confidence for auto-fix eligibility
    pub const AUTO_FIX_MIN_CONFIDENCE: f64 = 0.7;

    pub const BASE_SUCCESS_PROBABILITY: f64 = 0.8;

    /// Largest reduction from manual-review share
    pub const MANUAL_PENALTY: f64 = 0.3;

    /// Largest increase from auto-fix share
    pub const AUTO_FIX_BONUS: f64 = 0.1;

    pub const MIN_SUCCESS_PROBABILITY: f64 = 0.3;

    pub const MAX_SUCCESS_PROBABILITY: f64 = 0.95;

    /// Minutes per issue by complexity tier
    pub mod minutes {
        pub const TRIVIAL: f64 = 0.1;
        pub const SIMPLE: f64 = 0.5;
        pub const MODERATE: f64 = 2.0;
        pub const COMPLEX: f64 = 5.0;
        pub const MANUAL_ONLY: f64 = 10.0;
    }
}

/// Executor constants
pub mod executor {
    /// Default issues per batch
    pub const DEFAULT_BATCH_SIZE: usize = 10;

    pub const DEFAULT_MAX_FAILURES: u32 = 3;

    /// Captured command output kept in validation details (bytes)
    pub const MAX_DETAIL_BYTES: usize = 2000;

    /// Default per-command timeouts (seconds)
    pub mod timeout {
        pub const BUILD_SECS: u64 = 300;
        pub const TYPE_CHECK_SECS: u64 = 180;
        pub const ANALYZE_SECS: u64 = 180;
        pub const TEST_SECS: u64 = 600;
    }
}

/// Metrics constants
pub mod metrics {
    /// Ring buffer capacity for metrics history
    pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

    /// Window for trend analysis
    pub const DEFAULT_TREND_WINDOW: usize = 5;

    /// Relative change below which a trend is stable
    pub const TREND_STABLE_BAND: f64 = 0.05;
}

/// Alerting constants
pub mod alerting {
    pub const DEFAULT_COOLDOWN_MINUTES: i64 = 15;

    /// Consecutive slow snapshots that count as sustained degradation
    pub const SUSTAINED_WINDOW: usize = 3;

    /// Batch size never shrinks below this
    pub const MIN_BATCH_SIZE: usize = 1;
}

/// HTTP/Network constants
pub mod network {
    /// Webhook request timeout (seconds)
    pub const WEBHOOK_TIMEOUT_SECS: u64 = 10;

    /// Maximum retries for webhook delivery
    pub const MAX_WEBHOOK_RETRIES: usize = 3;

    /// Base delay between retries (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 200;
}
