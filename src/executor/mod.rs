//! Batch remediation executor
//!
//! - [`runner`]: external command execution behind [`CommandRunner`]
//! - [`validation`]: build / type-check / analyze / test passes
//! - [`snapshot`]: uniquely identified workspace checkpoints
//! - [`lock`]: one run per workspace
//! - [`fixes`]: idempotent source rewrites per rule
//! - [`batch`]: the state machine tying them together

pub mod batch;
pub mod fixes;
pub mod lock;
pub mod runner;
pub mod snapshot;
pub mod validation;

pub use batch::{Batch, BatchExecutor};
pub use fixes::{FileFixReport, FixApplier, FixOutcome, FixRegistry, IssueOutcome, SourceFile, apply_file};
pub use lock::RunLock;
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, ScriptedRunner};
pub use snapshot::{FsSnapshotStore, SnapshotStore};
pub use validation::{AnalyzeRun, Baseline, Validator};
