//! Domain context detection
//!
//! Determines which business domain a source file belongs to and what that
//! implies for remediation: rule overrides, identifiers to preserve, risks.

mod cache;
mod detector;
mod patterns;
mod scanner;

pub use cache::{CacheStats, DomainCache};
pub use detector::DomainDetector;
pub use patterns::DEFAULT_VOCABULARY;
pub use scanner::{DomainDistribution, WorkspaceScanner, domain_distribution};
