//! Domain Context Detector
//!
//! Scores weighted path and content patterns for a file and derives its
//! domain, subtype, rule overrides, preservation requirements and risks.

use rayon::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::cache::{CacheStats, DomainCache};
use super::patterns::{self, DomainPattern, MatchSource};
use crate::config::DomainConfig;
use crate::constants::domain as consts;
use crate::types::{DomainContext, DomainType, PreservationRequirement, Result};

pub struct DomainDetector {
    patterns: Vec<DomainPattern>,
    subtypes: Vec<(DomainType, &'static str, Regex)>,
    vocabulary: String,
    extra_preservation: Vec<String>,
    cache: DomainCache,
}

#[derive(Debug, Clone, Copy)]
struct PatternMatch {
    domain: DomainType,
    weight: f64,
    source: MatchSource,
}

impl DomainDetector {
    pub fn new(config: &DomainConfig) -> Result<Self> {
        let vocabulary = config
            .vocabulary_pattern
            .clone()
            .unwrap_or_else(|| patterns::DEFAULT_VOCABULARY.to_string());
        Regex::new(&vocabulary)?;
        for p in &config.preserve_identifiers {
            Regex::new(p)?;
        }

        Ok(Self {
            patterns: patterns::compile_patterns()?,
            subtypes: patterns::compile_subtypes()?,
            vocabulary,
            extra_preservation: config.preserve_identifiers.clone(),
            cache: DomainCache::new(),
        })
    }

    /// Detect the domain of a file from its path and content. Pure.
    pub fn detect(&self, path: &str, content: &str) -> DomainContext {
        let matches = self.matches(path, content);

        let Some((domain, confidence)) = select_domain(&matches) else {
            let mut ctx = DomainContext::fallback();
            ctx.preservation = self.preservation(ctx.domain);
            return ctx;
        };

        let subtype = self
            .subtypes
            .iter()
            .filter(|(d, _, _)| *d == domain)
            .find(|(_, _, re)| re.is_match(path) || re.is_match(content))
            .map(|(_, name, _)| name.to_string());

        DomainContext {
            domain,
            special_rules: patterns::special_rules(domain, subtype.as_deref(), &self.vocabulary),
            preservation: self.preservation(domain),
            risk_factors: patterns::risk_factors(domain),
            subtype,
            confidence,
        }
    }

    /// Detect a workspace file, reusing the cached result while its
    /// modification time is unchanged
    pub fn detect_file(&self, root: &Path, rel_path: &str) -> Arc<DomainContext> {
        let full = root.join(rel_path);
        let modified = std::fs::metadata(&full).and_then(|m| m.modified()).ok();

        self.cache.get_or_compute(rel_path, modified, || {
            let content = read_prefix(&full).unwrap_or_else(|e| {
                tracing::debug!("Could not read {}: {}", full.display(), e);
                String::new()
            });
            self.detect(rel_path, &content)
        })
    }

    /// Detect many files in parallel
    pub fn detect_all(&self, root: &Path, files: &[String]) -> HashMap<String, DomainContext> {
        files
            .par_iter()
            .map(|f| (f.clone(), (*self.detect_file(root, f)).clone()))
            .collect()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn matches(&self, path: &str, content: &str) -> Vec<PatternMatch> {
        self.patterns
            .iter()
            .filter(|p| match p.source {
                MatchSource::Path => p.regex.is_match(path),
                MatchSource::Content => !content.is_empty() && p.regex.is_match(content),
            })
            .map(|p| PatternMatch {
                domain: p.domain,
                weight: p.weight,
                source: p.source,
            })
            .collect()
    }

    fn preservation(&self, domain: DomainType) -> Vec<PreservationRequirement> {
        let mut reqs = patterns::preservation(domain, &self.vocabulary);
        reqs.extend(
            self.extra_preservation
                .iter()
                .map(|p| PreservationRequirement {
                    pattern: p.clone(),
                    reason: "configured preservation pattern".to_string(),
                }),
        );
        reqs
    }
}

/// Pick the winning domain and its confidence.
///
/// The domain owning the heaviest strong match wins, with path matches
/// ahead of content matches at equal weight. Without any strong match, a
/// domain whose combined weight reaches 1.0 wins. Confidence is the
/// winner's summed weight clamped to [0, 1].
fn select_domain(matches: &[PatternMatch]) -> Option<(DomainType, f64)> {
    let strong = matches
        .iter()
        .filter(|m| m.weight > consts::STRONG_MATCH_WEIGHT)
        .max_by(|a, b| {
            a.weight
                .total_cmp(&b.weight)
                .then_with(|| source_rank(a.source).cmp(&source_rank(b.source)))
        });

    let sum_for = |domain: DomainType| -> f64 {
        matches
            .iter()
            .filter(|m| m.domain == domain)
            .map(|m| m.weight)
            .sum()
    };

    let domain = match strong {
        Some(m) => m.domain,
        None => {
            let best = DomainType::ALL
                .iter()
                .map(|&d| (d, sum_for(d)))
                .max_by(|a, b| a.1.total_cmp(&b.1))?;
            if best.1 + 1e-9 < 1.0 {
                return None;
            }
            best.0
        }
    };

    Some((domain, sum_for(domain).clamp(0.0, 1.0)))
}

fn source_rank(source: MatchSource) -> u8 {
    match source {
        MatchSource::Path => 1,
        MatchSource::Content => 0,
    }
}

fn read_prefix(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let end = bytes.len().min(consts::MAX_CONTENT_BYTES);
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RuleAction;
    use tempfile::TempDir;

    fn detector() -> DomainDetector {
        DomainDetector::new(&DomainConfig::default()).unwrap()
    }

    #[test]
    fn test_calculation_path() {
        let ctx = detector().detect(
            "src/calculations/planetaryPositions.ts",
            "export function calculatePlanetPosition(date: Date) { return 0 }",
        );
        assert_eq!(ctx.domain, DomainType::CalculationCritical);
        assert_eq!(ctx.subtype.as_deref(), Some("astronomical"));
        assert!(ctx.confidence > 0.9);
        assert!(ctx.is_sensitive());
        assert_eq!(
            ctx.rule_override("@typescript-eslint/no-explicit-any")
                .map(|r| &r.action),
            Some(&RuleAction::Disable)
        );
        assert!(!ctx.preservation.is_empty());
        assert!(!ctx.risk_factors.is_empty());
    }

    #[test]
    fn test_test_file() {
        let ctx = detector().detect(
            "src/__tests__/recipe.test.ts",
            "describe('recipe', () => { it('works', () => expect(1).toBe(1)) })",
        );
        assert_eq!(ctx.domain, DomainType::Test);
        assert!(!ctx.is_sensitive());
    }

    #[test]
    fn test_heavier_match_wins() {
        // config path (0.9) against calculation content (0.8)
        let ctx = detector().detect(
            "vite.config.ts",
            "const x = computePlanetaryLongitude(now)",
        );
        assert_eq!(ctx.domain, DomainType::Config);
    }

    #[test]
    fn test_tie_prefers_path() {
        let matches = [
            PatternMatch {
                domain: DomainType::Service,
                weight: 0.8,
                source: MatchSource::Content,
            },
            PatternMatch {
                domain: DomainType::Component,
                weight: 0.8,
                source: MatchSource::Path,
            },
        ];
        let (domain, _) = select_domain(&matches).unwrap();
        assert_eq!(domain, DomainType::Component);
    }

    #[test]
    fn test_combined_weak_evidence() {
        // .tsx (0.4) + hooks (0.6) reach 1.0 without a strong match
        let ctx = detector().detect("src/Widget.tsx", "const [a, setA] = useState(0)");
        assert_eq!(ctx.domain, DomainType::Component);
        assert!((ctx.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_utility() {
        let ctx = detector().detect("src/misc.ts", "export const x = 1;");
        assert_eq!(ctx.domain, DomainType::Utility);
        assert!((ctx.confidence - 0.3).abs() < 1e-9);
        assert!(ctx.subtype.is_none());
    }

    #[test]
    fn test_automation_subtype() {
        let ctx = detector().detect(
            "src/services/campaign/CampaignController.ts",
            "import { execSync } from 'child_process'",
        );
        assert_eq!(ctx.domain, DomainType::AutomationPipeline);
        assert_eq!(ctx.subtype.as_deref(), Some("campaign"));
    }

    #[test]
    fn test_configured_vocabulary_and_preservation() {
        let config = DomainConfig {
            preserve_identifiers: vec!["^legacy".to_string()],
            vocabulary_pattern: Some("^(moon|sun)".to_string()),
        };
        let d = DomainDetector::new(&config).unwrap();
        let ctx = d.detect("src/calculations/lunar.ts", "");
        assert!(ctx.preservation.iter().any(|p| p.pattern == "^legacy"));
        assert!(ctx.preservation.iter().any(|p| p.pattern.contains("moon")));
    }

    #[test]
    fn test_invalid_vocabulary_rejected() {
        let config = DomainConfig {
            preserve_identifiers: Vec::new(),
            vocabulary_pattern: Some("(".to_string()),
        };
        assert!(DomainDetector::new(&config).is_err());
    }

    #[test]
    fn test_detect_file_uses_cache() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("src/calculations");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.ts"), "export const degree = 1;").unwrap();

        let d = detector();
        let first = d.detect_file(temp.path(), "src/calculations/a.ts");
        let second = d.detect_file(temp.path(), "src/calculations/a.ts");
        assert_eq!(first.domain, DomainType::CalculationCritical);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(d.cache_stats().hits, 1);
    }

    #[test]
    fn test_detect_all() {
        let temp = TempDir::new().unwrap();
        let files = vec![
            "src/components/Card.tsx".to_string(),
            "scripts/deploy.sh".to_string(),
        ];
        let contexts = detector().detect_all(temp.path(), &files);
        assert_eq!(contexts["src/components/Card.tsx"].domain, DomainType::Component);
        assert_eq!(contexts["scripts/deploy.sh"].domain, DomainType::Script);
    }
}
