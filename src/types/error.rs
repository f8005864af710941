//! Unified Error Type System
//!
//! Centralized error types for the entire engine.
//! Every failure is classified so the executor and CLI can decide whether a
//! problem is local to one issue, local to one batch, or fatal for the run.
//!
//! ## Error Classes
//!
//! - **Configuration**: invalid thresholds or patterns (fail fast at startup)
//! - **Ingestion**: diagnostic stream unparsable (abort analysis, no mutation)
//! - **FixApplication**: one issue could not be fixed (recorded, batch continues)
//! - **Validation**: a batch broke the build (rollback, run continues)
//! - **SafetyLimit**: failure budget exhausted or baseline unstable (abort run)
//! - **Rollback**: workspace may be inconsistent (never swallowed)
//! - **Environment**: IO, storage, process spawning, network

use std::time::Duration;
use thiserror::Error;

use super::plan::PhaseKind;
use super::validation::ValidationKind;

// =============================================================================
// Error Classes
// =============================================================================

/// Error classes used to route failures through the run state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Invalid or missing configuration
    Configuration,
    /// Diagnostic stream could not be parsed
    Ingestion,
    /// A single fix could not be applied
    FixApplication,
    /// Post-batch validation failed
    Validation,
    /// The run hit a safety limit and stopped
    SafetyLimit,
    /// Restoring a snapshot failed
    Rollback,
    /// IO, storage, subprocess or network failure
    Environment,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Ingestion => write!(f, "INGESTION"),
            Self::FixApplication => write!(f, "FIX_APPLICATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::SafetyLimit => write!(f, "SAFETY_LIMIT"),
            Self::Rollback => write!(f, "ROLLBACK"),
            Self::Environment => write!(f, "ENVIRONMENT"),
        }
    }
}

impl ErrorClass {
    /// Whether an error of this class terminates the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration | Self::SafetyLimit | Self::Rollback | Self::Environment
        )
    }

    /// Whether the error is contained by the batch that produced it
    pub fn is_batch_local(&self) -> bool {
        matches!(self, Self::FixApplication | Self::Validation)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum MendError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // Analysis Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to ingest diagnostics from {source_name}: {message}")]
    Ingestion {
        source_name: String,
        message: String,
    },

    #[error("Invalid plan: {0}")]
    Plan(String),

    // -------------------------------------------------------------------------
    // Execution Errors
    // -------------------------------------------------------------------------
    #[error("Fix for {rule_id} failed in {file}: {message}")]
    FixApplication {
        file: String,
        rule_id: String,
        message: String,
    },

    #[error("{kind} validation failed: {detail}")]
    ValidationFailure { kind: ValidationKind, detail: String },

    #[error(
        "Safety limit exceeded in {phase} phase, batch {batch}: {failures} failed batches (last failure: {validation}, rollback attempted: {rollback_attempted})"
    )]
    SafetyLimitExceeded {
        phase: PhaseKind,
        batch: usize,
        failures: u32,
        validation: String,
        rollback_attempted: bool,
    },

    #[error("Unstable baseline: {} failed before any change was made ({detail})", format_kinds(.failed))]
    UnstableBaseline {
        failed: Vec<ValidationKind>,
        detail: String,
    },

    #[error("ROLLBACK FAILED for snapshot {snapshot}: {message}. The workspace may be inconsistent and needs manual intervention")]
    RollbackFailed { snapshot: String, message: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("A newer snapshot is still open: {active}")]
    SnapshotActive { active: String },

    #[error("Another run holds the workspace lock: {path}")]
    RunLocked { path: String },

    #[error("Run cancelled in {phase} phase at batch {batch} (rolled back: {rolled_back})")]
    Cancelled {
        phase: String,
        batch: usize,
        rolled_back: bool,
    },

    #[error("Manual approval is required for live runs (pass --yes)")]
    ApprovalRequired,

    #[error("Emergency stop is active: {0}")]
    EmergencyStop(String),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },

    // -------------------------------------------------------------------------
    // Reporting Errors
    // -------------------------------------------------------------------------
    #[error("Alert channel '{channel}' failed: {message}")]
    Channel { channel: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not initialized: run 'lintmend init' first")]
    NotInitialized,
}

fn format_kinds(kinds: &[ValidationKind]) -> String {
    kinds
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<anyhow::Error> for MendError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return MendError::Io(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }
        MendError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MendError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl MendError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an ingestion error
    pub fn ingestion(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ingestion {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a per-issue fix error
    pub fn fix(
        file: impl Into<String>,
        rule_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::FixApplication {
            file: file.into(),
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Classify this error for routing decisions
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) | Self::Pattern(_) | Self::ApprovalRequired => {
                ErrorClass::Configuration
            }
            Self::Ingestion { .. } | Self::Json(_) | Self::Yaml(_) => ErrorClass::Ingestion,
            Self::FixApplication { .. } => ErrorClass::FixApplication,
            Self::ValidationFailure { .. } | Self::Timeout { .. } => ErrorClass::Validation,
            Self::SafetyLimitExceeded { .. }
            | Self::UnstableBaseline { .. }
            | Self::Cancelled { .. }
            | Self::EmergencyStop(_)
            | Self::Plan(_) => ErrorClass::SafetyLimit,
            Self::RollbackFailed { .. } => ErrorClass::Rollback,
            _ => ErrorClass::Environment,
        }
    }

    /// Whether the error must stop the run
    pub fn is_fatal(&self) -> bool {
        self.class().is_fatal()
    }

    /// Rollback failures leave the workspace in an unknown state
    pub fn requires_manual_intervention(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| MendError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| MendError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
