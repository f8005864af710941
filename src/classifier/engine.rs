//! Classification engine
//!
//! Turns a diagnostic into a [`Classification`]: table lookup, then
//! context enhancement from the file's domain and the analyzer's fix hint.

use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use super::rules::{RuleTable, RuleTemplate};
use crate::constants::classifier as consts;
use crate::types::{
    AutoFixCapability, CategorySet, Classification, Diagnostic, DomainContext, DomainImpact,
    FixComplexity, IssueCategory, OverallSeverity, RiskProfile, Severity, SeverityLevel,
};

/// Stateless classifier over an immutable rule table
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: Arc<RuleTable>,
}

impl Classifier {
    pub fn new(table: RuleTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Classify without domain context. Never fails: unknown rules get the
    /// fallback template.
    pub fn classify(
        &self,
        rule_id: &str,
        message: &str,
        file: &str,
        auto_fix_available: bool,
    ) -> Classification {
        self.classify_with_context(rule_id, message, file, auto_fix_available, None)
    }

    pub fn classify_diagnostic(
        &self,
        diagnostic: &Diagnostic,
        context: Option<&DomainContext>,
    ) -> Classification {
        self.classify_with_context(
            &diagnostic.rule_id,
            &diagnostic.message,
            &diagnostic.file,
            diagnostic.auto_fix_available,
            context,
        )
    }

    pub fn classify_with_context(
        &self,
        rule_id: &str,
        message: &str,
        file: &str,
        auto_fix_available: bool,
        context: Option<&DomainContext>,
    ) -> Classification {
        let (template, fallback) = self.table.lookup(rule_id);
        if fallback {
            tracing::trace!(rule_id, file, "Unknown rule, using fallback classification");
        }

        let mut classification = base_classification(rule_id, message, template, fallback);
        apply_tool_hint(&mut classification.auto_fix, template.can_fix, auto_fix_available);

        if let Some(ctx) = context {
            enhance_for_domain(&mut classification, ctx, rule_id);
        }

        classification
    }

    /// Classify many diagnostics in parallel. `contexts` is keyed by file path.
    pub fn classify_all(
        &self,
        diagnostics: &[Diagnostic],
        contexts: &HashMap<String, DomainContext>,
    ) -> Vec<Classification> {
        diagnostics
            .par_iter()
            .map(|d| self.classify_diagnostic(d, contexts.get(&d.file)))
            .collect()
    }
}

fn base_classification(
    rule_id: &str,
    message: &str,
    template: &RuleTemplate,
    fallback: bool,
) -> Classification {
    let mut secondary: Vec<String> = template.secondary.iter().map(|s| s.to_string()).collect();
    secondary.extend(message_tags(message, template.category));

    let mut factors = Vec::new();
    if template.breaking_change {
        factors.push("change may alter runtime behavior".to_string());
    }
    if fallback {
        factors.push("rule not in classification table".to_string());
    }

    Classification {
        rule_id: rule_id.to_string(),
        category: CategorySet {
            primary: template.category,
            secondary,
        },
        severity: Severity::from_score(template.score),
        auto_fix: AutoFixCapability {
            can_fix: template.can_fix,
            confidence: template.confidence,
            complexity: template.complexity,
        },
        domain_impact: DomainImpact::default(),
        risk: RiskProfile {
            level: template.risk,
            breaking_change_possible: template.breaking_change,
            factors,
        },
        fallback,
    }
}

/// Secondary tags inferred from the diagnostic message
fn message_tags(message: &str, category: IssueCategory) -> Vec<String> {
    let lower = message.to_lowercase();
    let mut tags = Vec::new();
    if category != IssueCategory::Import && lower.contains("import") {
        tags.push("import-related".to_string());
    }
    if category != IssueCategory::AsyncPromise && lower.contains("promise") {
        tags.push("async".to_string());
    }
    if lower.contains("hook") && category != IssueCategory::FrameworkHooks {
        tags.push("hook-related".to_string());
    }
    tags
}

/// The analyzer knows a fix exists: boost confidence instead of overriding
fn apply_tool_hint(capability: &mut AutoFixCapability, table_can_fix: bool, tool_can_fix: bool) {
    if !tool_can_fix {
        return;
    }
    if table_can_fix {
        capability.confidence =
            (capability.confidence + consts::AGREEMENT_BOOST).min(consts::AGREEMENT_CAP);
    } else {
        capability.can_fix = true;
        capability.confidence =
            (capability.confidence + consts::TOOL_FIX_BOOST).min(consts::TOOL_FIX_CAP);
        if capability.complexity == FixComplexity::ManualOnly {
            capability.complexity = FixComplexity::Complex;
        }
    }
}

fn enhance_for_domain(classification: &mut Classification, ctx: &DomainContext, rule_id: &str) {
    classification.domain_impact.domains = vec![ctx.domain];
    if !ctx.is_sensitive() {
        return;
    }

    let impact = &mut classification.domain_impact;
    impact.affects_domain_logic = true;
    impact.requires_expertise = true;

    // Pure formatting and import order cannot change domain behavior
    let cosmetic = matches!(
        classification.category.primary,
        IssueCategory::Style | IssueCategory::Import | IssueCategory::DebugStatement
    );
    impact.special_handling_required = ctx.rule_override(rule_id).is_some() || !cosmetic;

    let score = classification
        .severity
        .score
        .saturating_add(consts::SENSITIVE_SCORE_BOOST);
    classification.severity = Severity::from_score(score);
    classification.risk.level = classification.risk.level.raised();
    classification
        .risk
        .factors
        .push(format!("file is {}", ctx.domain));
}

/// Aggregate severity over a set of classifications
pub fn assess_overall_severity(classifications: &[Classification]) -> OverallSeverity {
    let mut counts = [0usize; 4];
    let mut total = 0.0;
    for c in classifications {
        let idx = match c.severity.level {
            SeverityLevel::Critical => 0,
            SeverityLevel::High => 1,
            SeverityLevel::Medium => 2,
            SeverityLevel::Low => 3,
        };
        counts[idx] += 1;
        total += c.severity.score as f64;
    }
    let [critical, high, medium, low] = counts;
    let mean_score = if classifications.is_empty() {
        0.0
    } else {
        total / classifications.len() as f64
    };

    let level = if critical > 0 {
        SeverityLevel::Critical
    } else if high > consts::HIGH_COUNT_LIMIT || mean_score > consts::HIGH_MEAN_SCORE {
        SeverityLevel::High
    } else if high > 0 || mean_score > consts::MEDIUM_MEAN_SCORE {
        SeverityLevel::Medium
    } else {
        SeverityLevel::Low
    };

    OverallSeverity {
        level,
        mean_score,
        critical,
        high,
        medium,
        low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DomainType, RiskLevel};
    use proptest::prelude::*;

    fn calc_context() -> DomainContext {
        DomainContext {
            domain: DomainType::CalculationCritical,
            subtype: Some("astronomical".into()),
            confidence: 0.9,
            ..DomainContext::fallback()
        }
    }

    #[test]
    fn test_known_rule() {
        let c = Classifier::default();
        let result = c.classify("prefer-const", "'x' is never reassigned.", "src/a.ts", true);
        assert_eq!(result.category.primary, IssueCategory::Style);
        assert!(result.auto_fix.can_fix);
        assert!(result.auto_fix.confidence > 0.98);
        assert!(result.auto_fix.confidence <= 0.99);
        assert!(!result.fallback);
    }

    #[test]
    fn test_unknown_rule_is_conservative() {
        let c = Classifier::default();
        let result = c.classify("acme/strange-rule", "", "src/a.ts", false);
        assert!(result.fallback);
        assert_eq!(result.severity.level, SeverityLevel::Medium);
        assert!(!result.auto_fix.can_fix);
        assert_eq!(result.auto_fix.complexity, FixComplexity::ManualOnly);
        assert!(result.auto_fix.confidence < 0.5);
    }

    #[test]
    fn test_tool_hint_boosts_instead_of_overriding() {
        let c = Classifier::default();
        let result = c.classify("@typescript-eslint/no-explicit-any", "", "src/a.ts", true);
        assert!(result.auto_fix.can_fix);
        assert!((result.auto_fix.confidence - 0.5).abs() < 1e-9);

        let result = c.classify("acme/unknown", "", "src/a.ts", true);
        assert!(result.auto_fix.can_fix);
        assert!(result.auto_fix.confidence <= 0.9);
        assert_eq!(result.auto_fix.complexity, FixComplexity::Complex);
    }

    #[test]
    fn test_sensitive_domain_raises_severity_and_risk() {
        let c = Classifier::default();
        let ctx = calc_context();
        let plain = c.classify("@typescript-eslint/no-explicit-any", "", "src/a.ts", false);
        let enhanced = c.classify_with_context(
            "@typescript-eslint/no-explicit-any",
            "",
            "src/calculations/planets.ts",
            false,
            Some(&ctx),
        );
        assert_eq!(enhanced.severity.score, plain.severity.score + 15);
        assert_eq!(enhanced.risk.level, RiskLevel::High);
        assert!(enhanced.domain_impact.requires_expertise);
        assert!(enhanced.domain_impact.special_handling_required);
        assert_eq!(
            enhanced.domain_impact.domains,
            vec![DomainType::CalculationCritical]
        );
    }

    #[test]
    fn test_cosmetic_rules_stay_automatable_in_sensitive_files() {
        let c = Classifier::default();
        let ctx = calc_context();
        let result = c.classify_with_context("import/order", "", "src/calc.ts", true, Some(&ctx));
        assert!(!result.domain_impact.special_handling_required);
        assert!(result.is_auto_fix_eligible(0.7));
    }

    #[test]
    fn test_non_sensitive_context_only_tags_domain() {
        let c = Classifier::default();
        let ctx = DomainContext {
            domain: DomainType::Test,
            ..DomainContext::fallback()
        };
        let result = c.classify_with_context(
            "@typescript-eslint/no-unused-vars",
            "'x' is defined but never used.",
            "src/__tests__/a.test.ts",
            false,
            Some(&ctx),
        );
        assert_eq!(result.severity.score, 30);
        assert!(!result.domain_impact.requires_expertise);
        assert_eq!(result.domain_impact.domains, vec![DomainType::Test]);
    }

    #[test]
    fn test_classify_all_uses_contexts() {
        let c = Classifier::default();
        let diags = vec![
            Diagnostic::new("src/calc.ts", 1, 1, "no-unused-vars", "'a' is defined"),
            Diagnostic::new("src/ui.ts", 1, 1, "no-unused-vars", "'b' is defined"),
        ];
        let mut contexts = HashMap::new();
        contexts.insert("src/calc.ts".to_string(), calc_context());
        let results = c.classify_all(&diags, &contexts);
        assert_eq!(results.len(), 2);
        assert!(results[0].domain_impact.special_handling_required);
        assert!(!results[1].domain_impact.special_handling_required);
    }

    fn classified(score: u8) -> Classification {
        let mut c = Classifier::default().classify("semi", "", "a.ts", false);
        c.severity = Severity::from_score(score);
        c
    }

    #[test]
    fn test_overall_severity() {
        assert_eq!(assess_overall_severity(&[]).level, SeverityLevel::Low);
        assert_eq!(
            assess_overall_severity(&[classified(10), classified(90)]).level,
            SeverityLevel::Critical
        );
        assert_eq!(
            assess_overall_severity(&[classified(70), classified(10)]).level,
            SeverityLevel::Medium
        );
        let many_high: Vec<_> = (0..11).map(|_| classified(70)).collect();
        assert_eq!(
            assess_overall_severity(&many_high).level,
            SeverityLevel::High
        );
        assert_eq!(
            assess_overall_severity(&[classified(50), classified(50)]).level,
            SeverityLevel::Medium
        );
        assert_eq!(
            assess_overall_severity(&[classified(20), classified(30)]).level,
            SeverityLevel::Low
        );
    }

    proptest! {
        #[test]
        fn prop_classification_is_deterministic(
            rule in prop::sample::select(vec![
                "import/order", "no-console", "TS2322", "TS1005", "eqeqeq",
                "@typescript-eslint/no-explicit-any", "react-hooks/exhaustive-deps",
                "unknown/rule", "",
            ]),
            domain in prop::sample::select(DomainType::ALL.to_vec()),
            tool_fix in any::<bool>(),
        ) {
            let c = Classifier::default();
            let ctx = DomainContext { domain, ..DomainContext::fallback() };
            let a = c.classify_with_context(rule, "msg", "src/x.ts", tool_fix, Some(&ctx));
            let b = c.classify_with_context(rule, "msg", "src/x.ts", tool_fix, Some(&ctx));
            prop_assert_eq!(a.category, b.category);
            prop_assert_eq!(a.severity, b.severity);
            prop_assert_eq!(a.risk, b.risk);
            prop_assert!(a.auto_fix.confidence <= 1.0);
        }
    }
}
