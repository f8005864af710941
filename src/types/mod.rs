pub mod alert;
pub mod classification;
pub mod diagnostic;
pub mod domain;
pub mod error;
pub mod execution;
pub mod gate;
pub mod metrics;
pub mod plan;
pub mod utils;
pub mod validation;

pub use alert::*;
pub use classification::*;
pub use diagnostic::*;
pub use domain::*;
pub use error::{ErrorClass, MendError, Result, ResultExt};
pub use execution::*;
pub use gate::*;
pub use metrics::*;
pub use plan::*;
pub use utils::{
    ParseWithDefault, json_i64, json_string, json_string_or, log_filter_error, normalize_path,
};
pub use validation::*;

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Type-safe wrapper for snapshot tokens
///
/// Snapshots are referenced by an opaque unique id, never by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn generate() -> Self {
        Self(format!("snap-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SnapshotId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
