//! Per-issue strategy selection

use std::collections::HashSet;

use crate::config::Config;
use crate::constants::strategy::{self as consts, minutes};
use crate::types::{
    Classification, DomainContext, FixComplexity, MendError, ResolutionStrategy, Result,
    RiskLevel, StrategyType,
};

/// Project policy that shapes strategy selection
#[derive(Debug, Clone)]
pub struct PolicyContext {
    pub min_confidence: f64,
    pub exempt_rules: HashSet<String>,
    preserve_paths: Vec<glob::Pattern>,
}

impl Default for PolicyContext {
    fn default() -> Self {
        Self {
            min_confidence: consts::AUTO_FIX_MIN_CONFIDENCE,
            exempt_rules: HashSet::new(),
            preserve_paths: Vec::new(),
        }
    }
}

impl PolicyContext {
    pub fn from_config(config: &Config) -> Result<Self> {
        let preserve_paths = config
            .safety
            .preserve_paths
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| {
                    MendError::Config(format!("Invalid preserve path '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            min_confidence: config.execution.min_confidence,
            exempt_rules: config.safety.exempt_rules.iter().cloned().collect(),
            preserve_paths,
        })
    }

    pub fn with_preserve_paths(mut self, patterns: &[&str]) -> Result<Self> {
        for p in patterns {
            self.preserve_paths.push(
                glob::Pattern::new(p)
                    .map_err(|e| MendError::Config(format!("Invalid preserve path '{}': {}", p, e)))?,
            );
        }
        Ok(self)
    }

    pub fn with_exempt_rule(mut self, rule_id: &str) -> Self {
        self.exempt_rules.insert(rule_id.to_string());
        self
    }

    /// Whether a workspace-relative path must never be modified
    pub fn is_preserved(&self, path: &str) -> bool {
        let anchored = format!("/{}", path);
        self.preserve_paths
            .iter()
            .any(|p| p.matches(path) || p.matches(&anchored))
    }

    pub fn is_exempt(&self, rule_id: &str) -> bool {
        self.exempt_rules.contains(rule_id)
    }
}

/// File-level facts relevant to a single issue
#[derive(Debug, Clone, Copy)]
pub struct FileContext<'a> {
    pub path: &'a str,
    pub preserved: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StrategyGenerator {
    policy: PolicyContext,
}

impl StrategyGenerator {
    pub fn new(policy: PolicyContext) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PolicyContext {
        &self.policy
    }

    pub fn file_context<'a>(&self, path: &'a str) -> FileContext<'a> {
        FileContext {
            path,
            preserved: self.policy.is_preserved(path),
        }
    }

    /// Choose a resolution strategy for one classified issue
    pub fn generate(
        &self,
        classification: &Classification,
        context: &DomainContext,
        file: FileContext<'_>,
    ) -> ResolutionStrategy {
        let risk = classification.risk.level;
        let complexity = classification.auto_fix.complexity;

        if self.policy.is_exempt(&classification.rule_id) {
            return ResolutionStrategy {
                strategy_type: StrategyType::Ignore,
                estimated_minutes: 0.0,
                risk,
                rationale: format!("{} is exempt by project policy", classification.rule_id),
                steps: Vec::new(),
            };
        }

        let eligible = classification.is_auto_fix_eligible(self.policy.min_confidence);
        if eligible && !file.preserved {
            return ResolutionStrategy {
                strategy_type: StrategyType::AutoFix,
                estimated_minutes: minutes_for(complexity),
                risk,
                rationale: format!(
                    "{} fix at {:.0}% confidence",
                    complexity,
                    classification.auto_fix.confidence * 100.0
                ),
                steps: vec![
                    "apply automated fix".to_string(),
                    "validate batch".to_string(),
                ],
            };
        }

        let impact = &classification.domain_impact;
        if risk == RiskLevel::High || impact.requires_expertise || file.preserved {
            let rationale = if file.preserved {
                format!("{} is a preserved path", file.path)
            } else if impact.requires_expertise {
                format!("{} code requires domain expertise", context.domain)
            } else {
                "high-risk change".to_string()
            };
            let mut steps = vec!["review the change with the code owner".to_string()];
            steps.extend(context.risk_factors.iter().map(|f| f.mitigation.clone()));
            return ResolutionStrategy {
                strategy_type: StrategyType::ManualReview,
                estimated_minutes: minutes_for(complexity).max(minutes::COMPLEX),
                risk,
                rationale,
                steps,
            };
        }

        if classification.category.primary.is_rule_adjustable() {
            let steps = match context.rule_override(&classification.rule_id) {
                Some(rule) => vec![format!(
                    "{} {} in the lint configuration: {}",
                    rule.action.name(),
                    rule.rule_id,
                    rule.reason
                )],
                None => vec![format!(
                    "tune {} in the lint configuration",
                    classification.rule_id
                )],
            };
            return ResolutionStrategy {
                strategy_type: StrategyType::RuleAdjustment,
                estimated_minutes: minutes::SIMPLE,
                risk,
                rationale: format!(
                    "{} issues are well understood but not safely automatable",
                    classification.category.primary
                ),
                steps,
            };
        }

        ResolutionStrategy {
            strategy_type: StrategyType::ManualReview,
            estimated_minutes: minutes_for(complexity),
            risk,
            rationale: "no safe automated fix".to_string(),
            steps: vec!["fix manually".to_string()],
        }
    }
}

/// Estimated minutes per issue for a complexity tier
pub fn minutes_for(complexity: FixComplexity) -> f64 {
    match complexity {
        FixComplexity::Trivial => minutes::TRIVIAL,
        FixComplexity::Simple => minutes::SIMPLE,
        FixComplexity::Moderate => minutes::MODERATE,
        FixComplexity::Complex => minutes::COMPLEX,
        FixComplexity::ManualOnly => minutes::MANUAL_ONLY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::types::DomainType;

    fn calc_context() -> DomainContext {
        DomainContext {
            domain: DomainType::CalculationCritical,
            confidence: 0.9,
            ..DomainContext::fallback()
        }
    }

    fn file(path: &str) -> FileContext<'_> {
        FileContext {
            path,
            preserved: false,
        }
    }

    #[test]
    fn test_auto_fix_selected() {
        let c = Classifier::default().classify("import/order", "", "src/a.ts", true);
        let s = StrategyGenerator::default().generate(&c, &DomainContext::fallback(), file("src/a.ts"));
        assert_eq!(s.strategy_type, StrategyType::AutoFix);
        assert!((s.estimated_minutes - minutes::TRIVIAL).abs() < 1e-9);
    }

    #[test]
    fn test_sensitive_domain_goes_to_review() {
        let ctx = calc_context();
        let c = Classifier::default().classify_with_context(
            "@typescript-eslint/no-explicit-any",
            "Unexpected any",
            "src/calculations/a.ts",
            false,
            Some(&ctx),
        );
        let s = StrategyGenerator::default().generate(&c, &ctx, file("src/calculations/a.ts"));
        assert_eq!(s.strategy_type, StrategyType::ManualReview);
    }

    #[test]
    fn test_high_risk_goes_to_review() {
        let c = Classifier::default().classify("no-eval", "", "src/a.ts", false);
        let s = StrategyGenerator::default().generate(&c, &DomainContext::fallback(), file("src/a.ts"));
        assert_eq!(s.strategy_type, StrategyType::ManualReview);
        assert_eq!(s.risk, RiskLevel::High);
    }

    #[test]
    fn test_rule_adjustment_for_low_confidence_style() {
        let mut c = Classifier::default().classify("semi", "", "src/a.ts", false);
        c.auto_fix.confidence = 0.5;
        let s = StrategyGenerator::default().generate(&c, &DomainContext::fallback(), file("src/a.ts"));
        assert_eq!(s.strategy_type, StrategyType::RuleAdjustment);
    }

    #[test]
    fn test_exempt_rule_ignored() {
        let generator = StrategyGenerator::new(PolicyContext::default().with_exempt_rule("no-console"));
        let c = Classifier::default().classify("no-console", "", "src/a.ts", true);
        let s = generator.generate(&c, &DomainContext::fallback(), file("src/a.ts"));
        assert_eq!(s.strategy_type, StrategyType::Ignore);
        assert_eq!(s.estimated_minutes, 0.0);
    }

    #[test]
    fn test_preserved_path_not_auto_fixed() {
        let policy = PolicyContext::default()
            .with_preserve_paths(&["**/generated/**"])
            .unwrap();
        let generator = StrategyGenerator::new(policy);
        let ctx = generator.file_context("src/generated/api.ts");
        assert!(ctx.preserved);

        let c = Classifier::default().classify("prefer-const", "", ctx.path, true);
        let s = generator.generate(&c, &DomainContext::fallback(), ctx);
        assert_eq!(s.strategy_type, StrategyType::ManualReview);
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = Config::default();
        config.safety.exempt_rules = vec!["semi".to_string()];
        let policy = PolicyContext::from_config(&config).unwrap();
        assert!(policy.is_exempt("semi"));
        assert!(policy.is_preserved("src/types/global.d.ts"));
        assert!(!policy.is_preserved("src/index.ts"));
    }
}
