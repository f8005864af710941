//! Quality Metrics Tracker
//!
//! - [`score`]: the 0-100 quality score
//! - [`regression`]: snapshot-to-snapshot regression detection
//! - [`history`]: bounded, persisted history with trend analysis
//! - [`tracker`]: analyzer run to scored snapshot

pub mod history;
pub mod regression;
pub mod score;
pub mod tracker;

pub use history::MetricsHistory;
pub use regression::detect_regression;
pub use score::QualityScorer;
pub use tracker::{Collected, MetricsTracker};
