//! Validation step results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// External command used to validate the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationKind {
    Build,
    TypeCheck,
    Analyze,
    Test,
}

impl ValidationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::TypeCheck => "type-check",
            Self::Analyze => "analyze",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub kind: ValidationKind,
    pub passed: bool,
    pub detail: String,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    #[serde(default)]
    pub timed_out: bool,
}

impl ValidationResult {
    pub fn pass(kind: ValidationKind, duration: Duration) -> Self {
        Self {
            kind,
            passed: true,
            detail: "ok".to_string(),
            duration,
            timed_out: false,
        }
    }

    pub fn fail(kind: ValidationKind, detail: impl Into<String>, duration: Duration) -> Self {
        Self {
            kind,
            passed: false,
            detail: detail.into(),
            duration,
            timed_out: false,
        }
    }

    pub fn timeout(kind: ValidationKind, limit: Duration) -> Self {
        Self {
            kind,
            passed: false,
            detail: format!("timed out after {}s", limit.as_secs()),
            duration: limit,
            timed_out: true,
        }
    }
}

/// One full validation pass (build, type-check, analyze, test)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failed_kinds(&self) -> Vec<ValidationKind> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.kind)
            .collect()
    }

    pub fn get(&self, kind: ValidationKind) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.kind == kind)
    }

    /// Build counts as passed when it was not part of this pass
    pub fn build_passed(&self) -> bool {
        self.get(ValidationKind::Build).is_none_or(|r| r.passed)
    }

    /// Short description of the first failure
    pub fn first_failure(&self) -> Option<String> {
        self.results
            .iter()
            .find(|r| !r.passed)
            .map(|r| format!("{}: {}", r.kind, r.detail))
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_failures() {
        let report = ValidationReport {
            results: vec![
                ValidationResult::pass(ValidationKind::Build, Duration::from_millis(10)),
                ValidationResult::timeout(ValidationKind::TypeCheck, Duration::from_secs(3)),
            ],
        };
        assert!(!report.passed());
        assert!(report.build_passed());
        assert_eq!(report.failed_kinds(), vec![ValidationKind::TypeCheck]);
        assert_eq!(
            report.first_failure().unwrap(),
            "type-check: timed out after 3s"
        );
    }

    #[test]
    fn test_empty_report_passes() {
        assert!(ValidationReport::default().passed());
    }
}
