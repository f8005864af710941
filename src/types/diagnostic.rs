//! Diagnostic records produced by the external analyzer and type checker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity reported by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    #[default]
    Warning,
}

impl DiagnosticSeverity {
    /// ESLint encodes severity as 1 (warning) / 2 (error)
    pub fn from_eslint(level: i64) -> Option<Self> {
        match level {
            2 => Some(Self::Error),
            1 => Some(Self::Warning),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// One finding from static analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub rule_id: String,
    pub message: String,
    #[serde(default)]
    pub severity: DiagnosticSeverity,
    #[serde(default)]
    pub auto_fix_available: bool,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<String>,
        line: u32,
        column: u32,
        rule_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            rule_id: rule_id.into(),
            message: message.into(),
            severity: DiagnosticSeverity::Warning,
            auto_fix_available: false,
        }
    }

    pub fn error(mut self) -> Self {
        self.severity = DiagnosticSeverity::Error;
        self
    }

    pub fn fixable(mut self) -> Self {
        self.auto_fix_available = true;
        self
    }

    /// Stable identity used to track an issue through plan and execution
    pub fn fingerprint(&self) -> String {
        format!("{}:{}:{}:{}", self.file, self.line, self.column, self.rule_id)
    }

    /// Identifier quoted in the message, e.g. `'foo' is defined but never used`
    pub fn quoted_identifier(&self) -> Option<&str> {
        let start = self.message.find('\'')? + 1;
        let len = self.message[start..].find('\'')?;
        let ident = &self.message[start..start + len];
        if ident.is_empty() { None } else { Some(ident) }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} {} [{}] {}",
            self.file, self.line, self.column, self.severity, self.rule_id, self.message
        )
    }
}

/// Aggregate counts over a diagnostic set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCounts {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl DiagnosticCounts {
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let errors = diagnostics.iter().filter(|d| d.severity.is_error()).count();
        Self {
            total: diagnostics.len(),
            errors,
            warnings: diagnostics.len() - errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_identifier() {
        let d = Diagnostic::new(
            "a.ts",
            1,
            7,
            "@typescript-eslint/no-unused-vars",
            "'planetPosition' is assigned a value but never used.",
        );
        assert_eq!(d.quoted_identifier(), Some("planetPosition"));

        let d = Diagnostic::new("a.ts", 1, 1, "semi", "Missing semicolon.");
        assert_eq!(d.quoted_identifier(), None);
    }

    #[test]
    fn test_counts() {
        let diags = vec![
            Diagnostic::new("a.ts", 1, 1, "semi", "x").error(),
            Diagnostic::new("a.ts", 2, 1, "semi", "x"),
            Diagnostic::new("b.ts", 3, 1, "semi", "x"),
        ];
        let counts = DiagnosticCounts::from_diagnostics(&diags);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.errors, 1);
        assert_eq!(counts.warnings, 2);
    }

    #[test]
    fn test_native_json_shape() {
        let json = r#"{"file":"src/a.ts","line":3,"column":5,"ruleId":"no-console","message":"Unexpected console statement.","severity":"error","autoFixAvailable":true}"#;
        let d: Diagnostic = serde_json::from_str(json).unwrap();
        assert_eq!(d.rule_id, "no-console");
        assert!(d.severity.is_error());
        assert!(d.auto_fix_available);
    }
}
