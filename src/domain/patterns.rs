//! Domain pattern tables
//!
//! Weighted regexes over file paths and file contents, plus the per-domain
//! rule overrides, preservation requirements and risk factors.

use regex::Regex;
use serde_json::{Map, Value};

use crate::types::{
    DomainType, PreservationRequirement, Result, RiskFactor, RuleAction, SeverityLevel,
    SpecialRule,
};

/// Identifier vocabulary of calculation code that unused-binding detection must ignore
pub const DEFAULT_VOCABULARY: &str =
    "^(_|planet|degree|sign|longitude|latitude|position|transit|element|fire|water|earth|air)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    Path,
    Content,
}

#[derive(Debug, Clone)]
pub struct DomainPattern {
    pub domain: DomainType,
    pub regex: Regex,
    pub weight: f64,
    pub source: MatchSource,
}

type PatternSpec = (DomainType, &'static str, f64);

const PATH_PATTERNS: &[PatternSpec] = &[
    (
        DomainType::CalculationCritical,
        r"(?i)(^|/)(calculations?|astro\w*|ephemeris|planetary|celestial|zodiac|alchem\w*|elemental)(/|[._-])",
        0.9,
    ),
    (
        DomainType::CalculationCritical,
        r"(?i)(^|/)nutrition(al)?(/|[._-])",
        0.8,
    ),
    (
        DomainType::AutomationPipeline,
        r"(?i)(^|/)(campaigns?|automation|pipelines?)(/|[._-])",
        0.85,
    ),
    (DomainType::AutomationPipeline, r"(?i)(^|/)migrations?/", 0.8),
    (DomainType::AutomationPipeline, r"(^|/)\.github/workflows/", 0.9),
    (DomainType::Test, r"\.(test|spec)\.[cm]?[jt]sx?$", 0.95),
    (DomainType::Test, r"(^|/)__tests__/", 0.95),
    (DomainType::Test, r"(^|/)(tests?|e2e|__mocks__)/", 0.8),
    (DomainType::Script, r"(^|/)scripts?/", 0.8),
    (DomainType::Script, r"\.(sh|mjs|cjs)$", 0.5),
    (DomainType::Component, r"(^|/)components?/", 0.8),
    (DomainType::Component, r"\.tsx$", 0.4),
    (DomainType::Component, r"(^|/)(pages|app)/", 0.6),
    (DomainType::Service, r"(^|/)(services?|api)/", 0.8),
    (DomainType::Service, r"(^|/)server/", 0.6),
    (DomainType::Config, r"(^|/)[^/]*\.config\.[cm]?[jt]s$", 0.9),
    (DomainType::Config, r"(^|/)(tsconfig|package)\.json$", 0.9),
    (DomainType::Config, r"(^|/)config/", 0.75),
    (DomainType::Utility, r"(^|/)(utils?|helpers?|lib)/", 0.6),
];

const CONTENT_PATTERNS: &[PatternSpec] = &[
    (
        DomainType::CalculationCritical,
        r"\b(calculate|compute)\w*(Position|Transit|Aspect|Element|Longitude|Degree)",
        0.8,
    ),
    (
        DomainType::CalculationCritical,
        r"(?i)\b(longitude|latitude|ephemeris|zodiac|planetary)\b",
        0.6,
    ),
    (
        DomainType::CalculationCritical,
        r"\bMath\.(sin|cos|atan2|asin|acos)\b",
        0.3,
    ),
    (
        DomainType::AutomationPipeline,
        r"\b(execSync|spawnSync|child_process)\b",
        0.75,
    ),
    (
        DomainType::AutomationPipeline,
        r"(?i)\b(campaign|pipeline|migration)\w*\b",
        0.4,
    ),
    (DomainType::Test, r#"\b(describe|it|test)\(\s*['"`]"#, 0.8),
    (DomainType::Test, r"\bexpect\(", 0.5),
    (
        DomainType::Component,
        r#"from\s+['"]react['"]|\bReact\.FC\b|\bJSX\.Element\b"#,
        0.75,
    ),
    (
        DomainType::Component,
        r"\buse(State|Effect|Memo|Callback|Ref)\(",
        0.6,
    ),
    (
        DomainType::Service,
        r"\bfetch\(|\baxios\.|\bexpress\(\)|\bapp\.(get|post|put|delete)\(",
        0.7,
    ),
    (
        DomainType::Config,
        r"module\.exports\s*=|export\s+default\s+defineConfig",
        0.75,
    ),
];

const SUBTYPES: &[(DomainType, &str, &str)] = &[
    (
        DomainType::CalculationCritical,
        "nutritional",
        r"(?i)nutrition|calorie|macronutrient",
    ),
    (
        DomainType::CalculationCritical,
        "elemental",
        r"(?i)alchem|elemental|\b(fire|water|earth|air)\b",
    ),
    (
        DomainType::CalculationCritical,
        "astronomical",
        r"(?i)planet|ephemeris|longitude|transit|zodiac|astro",
    ),
    (DomainType::AutomationPipeline, "ci", r"\.github/workflows|(?i)\bci\b"),
    (DomainType::AutomationPipeline, "migration", r"(?i)migrat"),
    (DomainType::AutomationPipeline, "campaign", r"(?i)campaign"),
];

pub fn compile_patterns() -> Result<Vec<DomainPattern>> {
    let path = PATH_PATTERNS.iter().map(|p| (p, MatchSource::Path));
    let content = CONTENT_PATTERNS.iter().map(|p| (p, MatchSource::Content));
    path.chain(content)
        .map(|(&(domain, pattern, weight), source)| {
            Ok(DomainPattern {
                domain,
                regex: Regex::new(pattern)?,
                weight,
                source,
            })
        })
        .collect()
}

pub fn compile_subtypes() -> Result<Vec<(DomainType, &'static str, Regex)>> {
    SUBTYPES
        .iter()
        .map(|&(domain, name, pattern)| Ok((domain, name, Regex::new(pattern)?)))
        .collect()
}

fn rule(rule_id: &str, action: RuleAction, reason: &str) -> SpecialRule {
    SpecialRule {
        rule_id: rule_id.to_string(),
        action,
        reason: reason.to_string(),
    }
}

fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Rule overrides recommended for a domain
pub fn special_rules(
    domain: DomainType,
    subtype: Option<&str>,
    vocabulary: &str,
) -> Vec<SpecialRule> {
    match domain {
        DomainType::CalculationCritical => {
            let mut rules = vec![
                rule(
                    "@typescript-eslint/no-explicit-any",
                    RuleAction::Disable,
                    "calculation libraries exchange untyped numeric structures",
                ),
                rule(
                    "@typescript-eslint/no-unused-vars",
                    RuleAction::Modify {
                        parameters: params(&[
                            ("varsIgnorePattern", Value::from(vocabulary)),
                            ("argsIgnorePattern", Value::from("^_")),
                        ]),
                    },
                    "domain vocabulary names are referenced by convention",
                ),
                rule(
                    "eqeqeq",
                    RuleAction::Enhance,
                    "loose equality on numeric values hides precision bugs",
                ),
            ];
            if subtype == Some("astronomical") {
                rules.push(rule(
                    "no-loss-of-precision",
                    RuleAction::Enhance,
                    "ephemeris constants need full precision",
                ));
            }
            rules
        }
        DomainType::AutomationPipeline => vec![
            rule(
                "no-console",
                RuleAction::Modify {
                    parameters: params(&[(
                        "allow",
                        Value::from(vec!["log", "info", "warn", "error"]),
                    )]),
                },
                "console output is the pipeline's progress channel",
            ),
            rule(
                "@typescript-eslint/no-floating-promises",
                RuleAction::Monitor,
                "unawaited steps can silently skip pipeline work",
            ),
        ],
        DomainType::Test => vec![
            rule(
                "@typescript-eslint/no-explicit-any",
                RuleAction::Disable,
                "mocks and fixtures are intentionally loose",
            ),
            rule(
                "@typescript-eslint/no-non-null-assertion",
                RuleAction::Disable,
                "tests assert presence explicitly",
            ),
        ],
        DomainType::Script => vec![rule(
            "no-console",
            RuleAction::Disable,
            "scripts report through the console",
        )],
        DomainType::Component => vec![
            rule(
                "react-hooks/exhaustive-deps",
                RuleAction::Enhance,
                "stale closures cause rendering bugs",
            ),
            rule(
                "react-hooks/rules-of-hooks",
                RuleAction::Enhance,
                "hook order must be stable",
            ),
        ],
        DomainType::Service => vec![
            rule(
                "@typescript-eslint/no-floating-promises",
                RuleAction::Enhance,
                "unhandled rejections crash request handlers",
            ),
            rule(
                "no-eval",
                RuleAction::Monitor,
                "services handle untrusted input",
            ),
        ],
        DomainType::Config => vec![rule(
            "@typescript-eslint/no-var-requires",
            RuleAction::Disable,
            "config files are loaded as CommonJS",
        )],
        DomainType::Utility => Vec::new(),
    }
}

/// Identifier patterns that must survive remediation
pub fn preservation(domain: DomainType, vocabulary: &str) -> Vec<PreservationRequirement> {
    let req = |pattern: &str, reason: &str| PreservationRequirement {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };
    match domain {
        DomainType::CalculationCritical => vec![
            req(
                &format!("(?i){}", vocabulary),
                "domain vocabulary used by calculation conventions",
            ),
            req(
                "^[A-Z][A-Z0-9_]+$",
                "named constants hold reference values",
            ),
        ],
        DomainType::AutomationPipeline => vec![req(
            "(?i)^(campaign|pipeline|step|stage)",
            "pipeline state names are looked up dynamically",
        )],
        _ => Vec::new(),
    }
}

pub fn risk_factors(domain: DomainType) -> Vec<RiskFactor> {
    let factor = |description: &str, severity, mitigation: &str| RiskFactor {
        description: description.to_string(),
        severity,
        mitigation: mitigation.to_string(),
    };
    match domain {
        DomainType::CalculationCritical => vec![factor(
            "numeric formulas can break silently without type errors",
            SeverityLevel::High,
            "compare calculation outputs against reference values before and after changes",
        )],
        DomainType::AutomationPipeline => vec![factor(
            "pipeline code mutates external state",
            SeverityLevel::Medium,
            "exercise the pipeline in dry-run mode and review its log",
        )],
        DomainType::Component => vec![factor(
            "hook dependency edits can cause render loops",
            SeverityLevel::Medium,
            "check affected components in the browser after changes",
        )],
        DomainType::Service => vec![factor(
            "request handling and API contracts may change",
            SeverityLevel::Medium,
            "run the service integration tests",
        )],
        _ => Vec::new(),
    }
}
