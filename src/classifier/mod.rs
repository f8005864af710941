//! Diagnostic classification
//!
//! A single data-driven rule table plus a pure classification engine.

mod engine;
mod rules;

pub use engine::{Classifier, assess_overall_severity};
pub use rules::{FALLBACK, RuleTable, RuleTemplate};
