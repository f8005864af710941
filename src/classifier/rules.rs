//! Rule table
//!
//! Maps analyzer rule ids to classification templates. Lookup order is exact
//! id, then longest matching prefix, then the single fallback entry.

use std::collections::HashMap;

use crate::ingest::PARSING_ERROR_RULE;
use crate::types::{FixComplexity, IssueCategory, RiskLevel};

/// Classification template for one rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleTemplate {
    pub category: IssueCategory,
    pub secondary: &'static [&'static str],
    /// Base severity score, 0-100
    pub score: u8,
    pub can_fix: bool,
    pub confidence: f64,
    pub complexity: FixComplexity,
    pub risk: RiskLevel,
    pub breaking_change: bool,
}

impl RuleTemplate {
    const fn new(
        category: IssueCategory,
        score: u8,
        can_fix: bool,
        confidence: f64,
        complexity: FixComplexity,
        risk: RiskLevel,
    ) -> Self {
        Self {
            category,
            secondary: &[],
            score,
            can_fix,
            confidence,
            complexity,
            risk,
            breaking_change: false,
        }
    }

    const fn secondary(mut self, tags: &'static [&'static str]) -> Self {
        self.secondary = tags;
        self
    }

    const fn breaking(mut self) -> Self {
        self.breaking_change = true;
        self
    }
}

/// Conservative entry for unknown rule ids
pub const FALLBACK: RuleTemplate = RuleTemplate::new(
    IssueCategory::General,
    50,
    false,
    0.2,
    FixComplexity::ManualOnly,
    RiskLevel::Medium,
);

use FixComplexity::*;
use IssueCategory::*;
use RiskLevel::{High, Low, Medium};

const EXACT: &[(&str, RuleTemplate)] = &[
    // Blocking syntax
    (
        PARSING_ERROR_RULE,
        RuleTemplate::new(Syntax, 95, false, 0.0, ManualOnly, High).breaking(),
    ),
    // Imports
    (
        "import/order",
        RuleTemplate::new(Import, 20, true, 0.95, Trivial, Low),
    ),
    (
        "import/no-duplicates",
        RuleTemplate::new(Import, 25, true, 0.9, Trivial, Low),
    ),
    (
        "import/first",
        RuleTemplate::new(Import, 20, true, 0.9, Trivial, Low),
    ),
    (
        "import/no-unresolved",
        RuleTemplate::new(Import, 75, false, 0.1, Complex, Medium)
            .secondary(&["import-error"])
            .breaking(),
    ),
    (
        "import/named",
        RuleTemplate::new(Import, 70, false, 0.1, Complex, Medium).secondary(&["import-error"]),
    ),
    // Unused code
    (
        "no-unused-vars",
        RuleTemplate::new(UnusedCode, 30, true, 0.85, Simple, Low),
    ),
    (
        "@typescript-eslint/no-unused-vars",
        RuleTemplate::new(UnusedCode, 30, true, 0.85, Simple, Low),
    ),
    (
        "@typescript-eslint/no-unused-expressions",
        RuleTemplate::new(UnusedCode, 35, false, 0.3, Moderate, Medium),
    ),
    // Type safety
    (
        "@typescript-eslint/no-explicit-any",
        RuleTemplate::new(TypeSafety, 60, false, 0.3, Complex, Medium)
            .secondary(&["dynamic-type-escape"]),
    ),
    (
        "@typescript-eslint/no-non-null-assertion",
        RuleTemplate::new(TypeSafety, 45, false, 0.3, Moderate, Medium),
    ),
    (
        "@typescript-eslint/ban-ts-comment",
        RuleTemplate::new(TypeSafety, 50, false, 0.2, Moderate, Medium),
    ),
    // Async
    (
        "@typescript-eslint/await-thenable",
        RuleTemplate::new(AsyncPromise, 60, true, 0.8, Simple, Low),
    ),
    (
        "@typescript-eslint/no-floating-promises",
        RuleTemplate::new(AsyncPromise, 65, true, 0.75, Simple, Medium),
    ),
    (
        "@typescript-eslint/no-misused-promises",
        RuleTemplate::new(AsyncPromise, 65, true, 0.7, Moderate, Medium),
    ),
    // Framework hooks
    (
        "react-hooks/exhaustive-deps",
        RuleTemplate::new(FrameworkHooks, 55, true, 0.4, Moderate, Medium)
            .secondary(&["hook-dependency"]),
    ),
    (
        "react-hooks/rules-of-hooks",
        RuleTemplate::new(FrameworkHooks, 90, false, 0.0, ManualOnly, High).breaking(),
    ),
    // Debug statements
    (
        "no-console",
        RuleTemplate::new(DebugStatement, 25, true, 0.9, Trivial, Low),
    ),
    (
        "no-debugger",
        RuleTemplate::new(DebugStatement, 40, true, 0.95, Trivial, Low),
    ),
    // Style
    (
        "prefer-const",
        RuleTemplate::new(Style, 15, true, 0.98, Trivial, Low),
    ),
    ("semi", RuleTemplate::new(Style, 10, true, 0.95, Trivial, Low)),
    ("quotes", RuleTemplate::new(Style, 10, true, 0.95, Trivial, Low)),
    ("indent", RuleTemplate::new(Style, 10, true, 0.95, Trivial, Low)),
    (
        "comma-dangle",
        RuleTemplate::new(Style, 10, true, 0.95, Trivial, Low),
    ),
    ("no-var", RuleTemplate::new(Style, 20, true, 0.9, Simple, Low)),
    (
        "eqeqeq",
        RuleTemplate::new(Style, 35, true, 0.75, Simple, Medium).secondary(&["equality"]),
    ),
    // Security
    (
        "no-eval",
        RuleTemplate::new(Security, 85, false, 0.0, ManualOnly, High),
    ),
    (
        "no-implied-eval",
        RuleTemplate::new(Security, 80, false, 0.0, ManualOnly, High),
    ),
];

const PREFIXES: &[(&str, RuleTemplate)] = &[
    (
        "@typescript-eslint/no-unsafe-",
        RuleTemplate::new(TypeSafety, 55, false, 0.2, Complex, Medium)
            .secondary(&["unsafe-access"]),
    ),
    // TS1xxx are syntax errors reported by the compiler
    (
        "TS1",
        RuleTemplate::new(Syntax, 90, false, 0.1, ManualOnly, High).breaking(),
    ),
    (
        "TS",
        RuleTemplate::new(TypeSafety, 70, false, 0.2, Complex, Medium).secondary(&["type-error"]),
    ),
    (
        "security/",
        RuleTemplate::new(Security, 75, false, 0.1, Complex, High),
    ),
    (
        "react-hooks/",
        RuleTemplate::new(FrameworkHooks, 50, false, 0.3, Moderate, Medium),
    ),
    (
        "import/",
        RuleTemplate::new(Import, 30, false, 0.4, Simple, Low),
    ),
];

/// Immutable rule table, built once per run
#[derive(Debug, Clone)]
pub struct RuleTable {
    exact: HashMap<&'static str, RuleTemplate>,
    /// Sorted longest prefix first
    prefixes: Vec<(&'static str, RuleTemplate)>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleTable {
    pub fn builtin() -> Self {
        let mut prefixes = PREFIXES.to_vec();
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            exact: EXACT.iter().copied().collect(),
            prefixes,
        }
    }

    /// Template for `rule_id` and whether the fallback was used
    pub fn lookup(&self, rule_id: &str) -> (&RuleTemplate, bool) {
        if let Some(t) = self.exact.get(rule_id) {
            return (t, false);
        }
        if let Some((_, t)) = self.prefixes.iter().find(|(p, _)| rule_id.starts_with(p)) {
            return (t, false);
        }
        (&FALLBACK, true)
    }

    pub fn is_known(&self, rule_id: &str) -> bool {
        !self.lookup(rule_id).1
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_lookup() {
        let table = RuleTable::builtin();
        let (t, fallback) = table.lookup("import/order");
        assert!(!fallback);
        assert_eq!(t.category, IssueCategory::Import);
        assert!(t.can_fix);
        assert_eq!(t.confidence, 0.95);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RuleTable::builtin();
        assert_eq!(table.lookup("TS1005").0.category, IssueCategory::Syntax);
        assert_eq!(table.lookup("TS2322").0.category, IssueCategory::TypeSafety);
        assert_eq!(
            table
                .lookup("@typescript-eslint/no-unsafe-member-access")
                .0
                .category,
            IssueCategory::TypeSafety
        );
    }

    #[test]
    fn test_exact_beats_prefix() {
        let table = RuleTable::builtin();
        let (t, _) = table.lookup("import/no-unresolved");
        assert!(!t.can_fix);
        assert_eq!(t.score, 75);
    }

    #[test]
    fn test_unknown_rule_falls_back() {
        let table = RuleTable::builtin();
        let (t, fallback) = table.lookup("custom-plugin/whatever");
        assert!(fallback);
        assert_eq!(*t, FALLBACK);
        assert!(!table.is_known(""));
    }

    #[test]
    fn test_table_is_not_empty() {
        assert!(!RuleTable::builtin().is_empty());
    }
}
