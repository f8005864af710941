//! Phase planning
//!
//! Groups planned issues into the canonical phases, wires each phase to
//! every earlier non-empty phase, and orders them topologically.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap, VecDeque};

use super::generator::StrategyGenerator;
use crate::constants::strategy as consts;
use crate::types::{
    Classification, Diagnostic, DomainContext, IssueCategory, MendError, Phase, PhaseKind,
    PlannedIssue, RemediationPlan, Result, RiskLevel, StrategyType,
};

/// One classified diagnostic with the domain context of its file
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedIssue<'a> {
    pub diagnostic: &'a Diagnostic,
    pub classification: &'a Classification,
    pub context: &'a DomainContext,
}

impl StrategyGenerator {
    /// Build a phased remediation plan for a set of classified issues
    pub fn generate_batch_strategies(&self, issues: &[ClassifiedIssue<'_>]) -> Result<RemediationPlan> {
        let mut grouped: BTreeMap<PhaseKind, Vec<PlannedIssue>> = BTreeMap::new();

        for issue in issues {
            let file = self.file_context(&issue.diagnostic.file);
            let strategy = self.generate(issue.classification, issue.context, file);
            let planned = PlannedIssue {
                diagnostic: issue.diagnostic.clone(),
                classification: issue.classification.clone(),
                strategy,
                domain: issue.context.domain,
                preserve_patterns: issue
                    .context
                    .preservation
                    .iter()
                    .map(|p| p.pattern.clone())
                    .collect(),
            };
            grouped.entry(assign_phase(&planned)).or_default().push(planned);
        }

        let mut phases: Vec<Phase> = Vec::new();
        for (kind, mut issues) in grouped {
            issues.sort_by(|a, b| {
                a.diagnostic
                    .file
                    .cmp(&b.diagnostic.file)
                    .then_with(|| a.diagnostic.line.cmp(&b.diagnostic.line))
                    .then_with(|| a.diagnostic.column.cmp(&b.diagnostic.column))
            });
            let estimated_minutes = issues.iter().map(|i| i.strategy.estimated_minutes).sum();
            let risk_level = issues
                .iter()
                .map(|i| i.strategy.risk)
                .max()
                .unwrap_or(RiskLevel::Low);
            phases.push(Phase {
                kind,
                dependencies: phases.iter().map(|p| p.kind).collect(),
                issues,
                estimated_minutes,
                risk_level,
            });
        }

        let order = topological_order(&phases)?;
        let mut by_kind: HashMap<PhaseKind, Phase> = phases.into_iter().map(|p| (p.kind, p)).collect();
        let phases: Vec<Phase> = order.iter().filter_map(|k| by_kind.remove(k)).collect();

        let count = |t: StrategyType| {
            phases
                .iter()
                .flat_map(|p| &p.issues)
                .filter(|i| i.strategy.strategy_type == t)
                .count()
        };
        let total_issues = issues.len();
        let auto_fixable = count(StrategyType::AutoFix);
        let manual_review = count(StrategyType::ManualReview);

        let plan = RemediationPlan {
            estimated_minutes: phases.iter().map(|p| p.estimated_minutes).sum(),
            success_probability: success_probability(total_issues, auto_fixable, manual_review),
            rule_adjustments: count(StrategyType::RuleAdjustment),
            ignored: count(StrategyType::Ignore),
            phases,
            total_issues,
            auto_fixable,
            manual_review,
            created_at: Utc::now(),
        };

        tracing::debug!(
            phases = plan.phases.len(),
            total = plan.total_issues,
            auto_fixable = plan.auto_fixable,
            "Generated remediation plan"
        );
        Ok(plan)
    }
}

/// Canonical phase for a planned issue
pub fn assign_phase(issue: &PlannedIssue) -> PhaseKind {
    if issue.is_auto_fix() {
        return PhaseKind::AutoFix;
    }
    if issue.classification.domain_impact.special_handling_required {
        return PhaseKind::DomainSpecific;
    }
    match issue.classification.category.primary {
        IssueCategory::Import
        | IssueCategory::Style
        | IssueCategory::DebugStatement
        | IssueCategory::UnusedCode => PhaseKind::ImportStyle,
        IssueCategory::TypeSafety | IssueCategory::AsyncPromise | IssueCategory::Syntax => {
            PhaseKind::TypeSafety
        }
        IssueCategory::FrameworkHooks => PhaseKind::FrameworkSpecific,
        IssueCategory::Security | IssueCategory::General => PhaseKind::DomainSpecific,
    }
}

/// Kahn's algorithm over declared phase dependencies.
///
/// Fails with a plan error on a cycle or on a dependency naming a phase
/// that is not part of the plan. Among ready phases the canonical order wins.
pub fn topological_order(phases: &[Phase]) -> Result<Vec<PhaseKind>> {
    let mut in_degree: BTreeMap<PhaseKind, usize> = phases.iter().map(|p| (p.kind, 0)).collect();
    let mut dependents: HashMap<PhaseKind, Vec<PhaseKind>> = HashMap::new();

    for phase in phases {
        for dep in &phase.dependencies {
            if !in_degree.contains_key(dep) {
                return Err(MendError::Plan(format!(
                    "phase {} depends on missing phase {}",
                    phase.kind, dep
                )));
            }
            dependents.entry(*dep).or_default().push(phase.kind);
            if let Some(d) = in_degree.get_mut(&phase.kind) {
                *d += 1;
            }
        }
    }

    let mut ready: VecDeque<PhaseKind> = in_degree
        .iter()
        .filter(|&(_, &d)| d == 0)
        .map(|(&k, _)| k)
        .collect();
    let mut order = Vec::with_capacity(phases.len());

    while let Some(kind) = ready.pop_front() {
        order.push(kind);
        let mut unlocked = Vec::new();
        for next in dependents.get(&kind).into_iter().flatten() {
            if let Some(d) = in_degree.get_mut(next) {
                *d -= 1;
                if *d == 0 {
                    unlocked.push(*next);
                }
            }
        }
        unlocked.sort();
        ready.extend(unlocked);
    }

    if order.len() != phases.len() {
        return Err(MendError::Plan(
            "phase dependency graph contains a cycle".to_string(),
        ));
    }
    Ok(order)
}

/// Check that the plan's phase sequence respects every declared dependency
pub fn validate_plan(plan: &RemediationPlan) -> Result<()> {
    topological_order(&plan.phases)?;
    for (i, phase) in plan.phases.iter().enumerate() {
        for dep in &phase.dependencies {
            let satisfied = plan.phases[..i].iter().any(|p| p.kind == *dep);
            if !satisfied {
                return Err(MendError::Plan(format!(
                    "phase {} scheduled before its dependency {}",
                    phase.kind, dep
                )));
            }
        }
    }
    Ok(())
}

pub fn success_probability(total: usize, auto_fixable: usize, manual_review: usize) -> f64 {
    if total == 0 {
        return consts::BASE_SUCCESS_PROBABILITY;
    }
    let manual_frac = manual_review as f64 / total as f64;
    let auto_frac = auto_fixable as f64 / total as f64;
    (consts::BASE_SUCCESS_PROBABILITY - consts::MANUAL_PENALTY * manual_frac
        + consts::AUTO_FIX_BONUS * auto_frac)
        .clamp(consts::MIN_SUCCESS_PROBABILITY, consts::MAX_SUCCESS_PROBABILITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::domain::DomainDetector;
    use crate::config::DomainConfig;
    use crate::types::DomainType;
    use proptest::prelude::*;

    fn scenario_a() -> (Vec<Diagnostic>, Vec<Classification>, Vec<DomainContext>) {
        let detector = DomainDetector::new(&DomainConfig::default()).unwrap();
        let diagnostics = vec![
            Diagnostic::new("src/utils/format.ts", 1, 1, "import/order", "wrong order").fixable(),
            Diagnostic::new(
                "src/calculations/positions.ts",
                12,
                20,
                "@typescript-eslint/no-explicit-any",
                "Unexpected any. Specify a different type.",
            ),
            Diagnostic::new(
                "src/__tests__/format.test.ts",
                3,
                7,
                "@typescript-eslint/no-unused-vars",
                "'helper' is assigned a value but never used.",
            ),
        ];
        let contexts: Vec<DomainContext> = diagnostics
            .iter()
            .map(|d| detector.detect(&d.file, ""))
            .collect();
        let classifier = Classifier::default();
        let classifications = diagnostics
            .iter()
            .zip(&contexts)
            .map(|(d, c)| classifier.classify_diagnostic(d, Some(c)))
            .collect();
        (diagnostics, classifications, contexts)
    }

    fn plan_for(
        d: &[Diagnostic],
        c: &[Classification],
        x: &[DomainContext],
    ) -> RemediationPlan {
        let issues: Vec<ClassifiedIssue> = d
            .iter()
            .zip(c)
            .zip(x)
            .map(|((diagnostic, classification), context)| ClassifiedIssue {
                diagnostic,
                classification,
                context,
            })
            .collect();
        StrategyGenerator::default()
            .generate_batch_strategies(&issues)
            .unwrap()
    }

    #[test]
    fn test_mixed_plan_has_two_phases() {
        let (d, c, x) = scenario_a();
        assert_eq!(x[1].domain, DomainType::CalculationCritical);
        assert_eq!(x[2].domain, DomainType::Test);

        let plan = plan_for(&d, &c, &x);
        assert_eq!(
            plan.execution_order(),
            vec![PhaseKind::AutoFix, PhaseKind::DomainSpecific]
        );

        let auto = plan.phase(PhaseKind::AutoFix).unwrap();
        let rules: Vec<&str> = auto
            .issues
            .iter()
            .map(|i| i.diagnostic.rule_id.as_str())
            .collect();
        assert_eq!(
            rules,
            vec!["@typescript-eslint/no-unused-vars", "import/order"]
        );

        let review = plan.phase(PhaseKind::DomainSpecific).unwrap();
        assert_eq!(review.issues.len(), 1);
        assert_eq!(
            review.issues[0].strategy.strategy_type,
            StrategyType::ManualReview
        );
        assert_eq!(review.dependencies, vec![PhaseKind::AutoFix]);
        assert!(!review.issues[0].preserve_patterns.is_empty());

        assert_eq!(plan.auto_fixable, 2);
        assert_eq!(plan.manual_review, 1);
        validate_plan(&plan).unwrap();
    }

    #[test]
    fn test_success_probability_bounds() {
        assert!((success_probability(0, 0, 0) - 0.8).abs() < 1e-9);
        assert!((success_probability(10, 10, 0) - 0.9).abs() < 1e-9);
        assert!((success_probability(10, 0, 10) - 0.5).abs() < 1e-9);
        // 2 auto, 1 manual of 3
        let p = success_probability(3, 2, 1);
        assert!((p - (0.8 - 0.1 + 0.2 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_cycle_rejected() {
        let phase = |kind, deps: Vec<PhaseKind>| Phase {
            kind,
            issues: Vec::new(),
            estimated_minutes: 0.0,
            risk_level: RiskLevel::Low,
            dependencies: deps,
        };
        let phases = vec![
            phase(PhaseKind::AutoFix, vec![PhaseKind::TypeSafety]),
            phase(PhaseKind::TypeSafety, vec![PhaseKind::AutoFix]),
        ];
        assert!(matches!(topological_order(&phases), Err(MendError::Plan(_))));

        let dangling = vec![phase(PhaseKind::AutoFix, vec![PhaseKind::ImportStyle])];
        assert!(topological_order(&dangling).is_err());
    }

    #[test]
    fn test_empty_plan() {
        let plan = StrategyGenerator::default()
            .generate_batch_strategies(&[])
            .unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_issues, 0);
    }

    const RULES: &[&str] = &[
        "import/order",
        "no-console",
        "@typescript-eslint/no-explicit-any",
        "react-hooks/exhaustive-deps",
        "TS2322",
        "no-eval",
        "semi",
        "custom/unknown",
        "@typescript-eslint/no-floating-promises",
    ];

    proptest! {
        #[test]
        fn prop_plan_order_is_topological(
            picks in proptest::collection::vec((0..RULES.len(), any::<bool>(), any::<bool>()), 0..40)
        ) {
            let calc = DomainContext {
                domain: DomainType::CalculationCritical,
                confidence: 0.9,
                ..DomainContext::fallback()
            };
            let plain = DomainContext::fallback();
            let classifier = Classifier::default();

            let diagnostics: Vec<Diagnostic> = picks
                .iter()
                .enumerate()
                .map(|(i, (r, fixable, _))| {
                    let d = Diagnostic::new(format!("src/f{}.ts", i % 5), i as u32 + 1, 1, RULES[*r], "m");
                    if *fixable { d.fixable() } else { d }
                })
                .collect();
            let contexts: Vec<&DomainContext> = picks
                .iter()
                .map(|(_, _, sensitive)| if *sensitive { &calc } else { &plain })
                .collect();
            let classifications: Vec<Classification> = diagnostics
                .iter()
                .zip(&contexts)
                .map(|(d, c)| classifier.classify_diagnostic(d, Some(*c)))
                .collect();
            let issues: Vec<ClassifiedIssue> = diagnostics
                .iter()
                .zip(&classifications)
                .zip(&contexts)
                .map(|((diagnostic, classification), context)| ClassifiedIssue {
                    diagnostic,
                    classification,
                    context: *context,
                })
                .collect();

            let plan = StrategyGenerator::default().generate_batch_strategies(&issues).unwrap();
            prop_assert!(validate_plan(&plan).is_ok());
            prop_assert_eq!(plan.phases.iter().map(|p| p.issues.len()).sum::<usize>(), picks.len());
            let mut sorted = plan.execution_order();
            sorted.sort();
            prop_assert_eq!(sorted, plan.execution_order());
            prop_assert!((0.3..=0.95).contains(&plan.success_probability));
        }
    }
}
