//! lintmend - Automated Lint Remediation Engine
//!
//! Ingests diagnostics from an external analyzer and type checker,
//! classifies each finding, plans phased fixes and applies them in
//! validated, rollback-protected batches while tracking quality over time.
//!
//! ## Core Features
//!
//! - **Rule Table Classification**: category, severity, risk and fixability per rule id
//! - **Domain Awareness**: calculation-critical and pipeline files get stricter handling
//! - **Phased Planning**: dependency-ordered phases with effort and success estimates
//! - **Transactional Batches**: snapshot, fix, validate, commit or roll back
//! - **Quality Gates**: named thresholds with blockers and exemptions
//! - **Alerting**: cooldown, suppression and auto-response on metric breaches
//!
//! ## Quick Start
//!
//! ```ignore
//! use lintmend::{Config, Database, Pipeline, RunContext};
//! use lintmend::executor::ProcessRunner;
//!
//! let db = Database::open_project(&root.join(".lintmend"))?;
//! let ctx = RunContext::new(&root, Config::default());
//! let mut pipeline = Pipeline::new(ctx, Arc::new(ProcessRunner), Arc::new(db))?;
//! let summary = pipeline.fix(true).await?;
//! ```
//!
//! ## Modules
//!
//! - [`classifier`]: diagnostic classification
//! - [`domain`]: per-file domain detection
//! - [`strategy`]: resolution strategies and phased plans
//! - [`executor`]: batch execution with snapshots and rollback
//! - [`metrics`], [`gate`], [`alerting`]: quality tracking and enforcement
//! - [`storage`]: SQLite persistence with connection pooling

pub mod alerting;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod domain;
pub mod events;
pub mod executor;
pub mod gate;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod strategy;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorClass, MendError, Result, ResultExt};

// Storage
pub use storage::database::PoolConfig;
pub use storage::{Database, SharedDatabase};

// Run context and events
pub use context::{CancelToken, RunContext};
pub use events::{EngineEvent, EventBus, EventSink, SharedSink};

// =============================================================================
// Engine Re-exports
// =============================================================================

pub use classifier::Classifier;
pub use domain::DomainDetector;
pub use executor::{BatchExecutor, CommandRunner, ProcessRunner};
pub use gate::GateEvaluator;
pub use metrics::{MetricsHistory, MetricsTracker, QualityScorer};
pub use pipeline::{Analysis, FixSummary, Observation, Pipeline};
pub use strategy::StrategyGenerator;
