//! Workspace source scan
//!
//! Lists JavaScript and TypeScript sources for domain statistics.

use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::DomainDetector;
use crate::types::{DomainType, Result, normalize_path};

/// Default maximum file size considered for domain detection (1MB)
const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Extensions the remediation engine understands
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"];

/// Directories never worth scanning
const DEFAULT_SKIP_DIRS: &[&str] = &["node_modules", ".git", "build", "dist", "coverage", ".next"];

/// Walks a workspace for JavaScript and TypeScript sources, honoring
/// gitignore rules plus configured exclude globs.
pub struct WorkspaceScanner {
    root: PathBuf,
    exclude: Vec<glob::Pattern>,
    max_file_size: u64,
}

impl WorkspaceScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let exclude = DEFAULT_SKIP_DIRS
            .iter()
            .filter_map(|d| glob::Pattern::new(&format!("**/{}/**", d)).ok())
            .collect();
        Self {
            root: root.as_ref().to_path_buf(),
            exclude,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        for p in patterns {
            self.exclude.push(glob::Pattern::new(p).map_err(|e| {
                crate::types::MendError::config(format!("invalid exclude glob '{}': {}", p, e))
            })?);
        }
        Ok(self)
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Relative, normalized paths of every eligible source file, sorted
    pub fn paths(&self) -> Vec<String> {
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .build();

        let mut files: Vec<String> = walker
            .filter_map(|e| e.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let path = entry.path();
                let rel = normalize_path(&path.strip_prefix(&self.root).ok()?.to_string_lossy());
                (self.is_source(path) && !self.is_excluded(&rel) && self.check_size(path))
                    .then_some(rel)
            })
            .collect();
        files.sort();
        files
    }

    fn is_excluded(&self, rel: &str) -> bool {
        let anchored = format!("/{}", rel);
        self.exclude
            .iter()
            .any(|p| p.matches(rel) || p.matches(&anchored))
    }

    fn check_size(&self, path: &Path) -> bool {
        path.metadata()
            .map(|m| m.len() <= self.max_file_size)
            .unwrap_or(false)
    }

    fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
    }
}

/// Per-domain file counts for a workspace
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DomainDistribution {
    pub total_files: usize,
    pub by_domain: BTreeMap<String, usize>,
}

impl DomainDistribution {
    pub fn count(&self, domain: DomainType) -> usize {
        self.by_domain.get(domain.as_str()).copied().unwrap_or(0)
    }
}

/// Detect the domain of every scanned file and tally the result
pub fn domain_distribution(
    detector: &DomainDetector,
    root: &Path,
    files: &[String],
) -> DomainDistribution {
    let contexts = detector.detect_all(root, files);
    let mut by_domain = BTreeMap::new();
    for ctx in contexts.values() {
        *by_domain.entry(ctx.domain.as_str().to_string()).or_insert(0) += 1;
    }
    DomainDistribution {
        total_files: contexts.len(),
        by_domain,
    }
}
