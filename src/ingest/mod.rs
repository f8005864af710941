//! Diagnostic ingestion
//!
//! Parses analyzer output into [`Diagnostic`] records. Supported formats:
//!
//! - `eslint-json`: output of `eslint --format json`
//! - `native-json`: a JSON array of diagnostic records
//! - `tsc`: `tsc --noEmit` text output
//!
//! Paths are normalized relative to the workspace root so they can be used
//! for domain detection, batching and snapshotting.

mod eslint;
mod native;
mod tsc;

pub use eslint::parse_eslint_json;
pub use native::parse_native_json;
pub use tsc::parse_tsc_output;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{Diagnostic, MendError, Result, normalize_path};

/// Rule id assigned to parser errors (ESLint reports them with a null rule id)
pub const PARSING_ERROR_RULE: &str = "parsing-error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticFormat {
    #[default]
    EslintJson,
    NativeJson,
    Tsc,
}

impl std::fmt::Display for DiagnosticFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EslintJson => write!(f, "eslint-json"),
            Self::NativeJson => write!(f, "native-json"),
            Self::Tsc => write!(f, "tsc"),
        }
    }
}

impl std::str::FromStr for DiagnosticFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "eslint-json" | "eslint" => Ok(Self::EslintJson),
            "native-json" | "json" => Ok(Self::NativeJson),
            "tsc" => Ok(Self::Tsc),
            _ => Err(format!(
                "Unknown diagnostic format: {}. Valid values: eslint-json, native-json, tsc",
                s
            )),
        }
    }
}

/// Parse analyzer output in the given format
pub fn parse(format: DiagnosticFormat, text: &str, root: &Path) -> Result<Vec<Diagnostic>> {
    let mut diagnostics = match format {
        DiagnosticFormat::EslintJson => parse_eslint_json(text)?,
        DiagnosticFormat::NativeJson => parse_native_json(text)?,
        DiagnosticFormat::Tsc => parse_tsc_output(text)?,
    };
    for d in &mut diagnostics {
        d.file = relativize(&d.file, root);
    }
    tracing::debug!(format = %format, count = diagnostics.len(), "Parsed diagnostics");
    Ok(diagnostics)
}

/// Strip the workspace root from an absolute path
pub fn relativize(file: &str, root: &Path) -> String {
    let path = Path::new(file);
    if path.is_absolute() {
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        for base in [root, canonical_root.as_path()] {
            if let Ok(rel) = path.strip_prefix(base) {
                return normalize_path(&rel.to_string_lossy());
            }
        }
    }
    normalize_path(file)
}

/// Find the start of a JSON document, skipping package-manager banners
/// such as `yarn run v1.22.19` that precede the payload on stdout
pub(crate) fn json_payload<'a>(text: &'a str, source_name: &str) -> Result<&'a str> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return Ok(trimmed);
    }
    let mut offset = 0;
    for line in trimmed.split_inclusive('\n') {
        let l = line.trim_start();
        if l.starts_with('[') || l.starts_with('{') {
            return Ok(&trimmed[offset..]);
        }
        offset += line.len();
    }
    Err(MendError::ingestion(
        source_name,
        "no JSON document found in output",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relativize_absolute_path() {
        let temp_dir = TempDir::new().unwrap();
        let abs = temp_dir.path().join("src").join("a.ts");
        assert_eq!(
            relativize(&abs.to_string_lossy(), temp_dir.path()),
            "src/a.ts"
        );
        assert_eq!(relativize("./lib/b.ts", temp_dir.path()), "lib/b.ts");
    }

    #[test]
    fn test_json_payload_skips_banner() {
        let text = "yarn run v1.22.19\n$ eslint . --format json\n[{\"filePath\":\"a.ts\"}]\n";
        let payload = json_payload(text, "eslint").unwrap();
        assert!(payload.starts_with('['));
    }

    #[test]
    fn test_json_payload_missing() {
        assert!(matches!(
            json_payload("command not found", "eslint"),
            Err(MendError::Ingestion { .. })
        ));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(
            "eslint-json".parse::<DiagnosticFormat>().unwrap(),
            DiagnosticFormat::EslintJson
        );
        assert_eq!("tsc".parse::<DiagnosticFormat>().unwrap(), DiagnosticFormat::Tsc);
        assert!("sarif".parse::<DiagnosticFormat>().is_err());
    }

    #[test]
    fn test_parse_dispatch() {
        let temp_dir = TempDir::new().unwrap();
        let text = "src/a.ts(3,7): error TS2304: Cannot find name 'x'.";
        let diags = parse(DiagnosticFormat::Tsc, text, temp_dir.path()).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule_id, "TS2304");
    }
}
