//! `tsc --noEmit` text output.

use regex::Regex;

use crate::types::{Diagnostic, DiagnosticSeverity, MendError, Result};

/// `src/a.ts(12,5): error TS2322: Type 'string' is not assignable ...`
const LINE_PATTERN: &str = r"^(?P<file>.+?)\((?P<line>\d+),(?P<col>\d+)\): (?P<sev>error|warning) (?P<code>TS\d+): (?P<msg>.*)$";

/// `Found 3 errors in 2 files.`
const SUMMARY_PATTERN: &str = r"Found (?P<n>\d+) errors?";

/// Parse compiler output. Continuation lines of multi-line messages are
/// ignored. A summary that reports errors nobody could parse is an
/// ingestion failure rather than a clean result.
pub fn parse_tsc_output(text: &str) -> Result<Vec<Diagnostic>> {
    let line_re = Regex::new(LINE_PATTERN)?;
    let summary_re = Regex::new(SUMMARY_PATTERN)?;

    let mut diagnostics = Vec::new();
    let mut reported: Option<usize> = None;

    for raw in text.lines() {
        let line = raw.trim_end();
        if let Some(caps) = line_re.captures(line) {
            let severity = if &caps["sev"] == "error" {
                DiagnosticSeverity::Error
            } else {
                DiagnosticSeverity::Warning
            };
            diagnostics.push(Diagnostic {
                file: caps["file"].to_string(),
                line: caps["line"].parse().unwrap_or(1),
                column: caps["col"].parse().unwrap_or(1),
                rule_id: caps["code"].to_string(),
                message: caps["msg"].to_string(),
                severity,
                auto_fix_available: false,
            });
        } else if let Some(caps) = summary_re.captures(line) {
            reported = caps["n"].parse().ok();
        }
    }

    if let Some(n) = reported
        && n > 0
        && diagnostics.is_empty()
    {
        return Err(MendError::ingestion(
            "tsc",
            format!("compiler reported {} errors but none could be parsed", n),
        ));
    }

    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_errors() {
        let text = "\
src/utils/astrology/core.ts(14,7): error TS2322: Type 'string' is not assignable to type 'number'.
src/utils/astrology/core.ts(30,1): error TS1005: ';' expected.
  Some continuation line of the previous message.

Found 2 errors in 1 file.
";
        let diags = parse_tsc_output(text).unwrap();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].file, "src/utils/astrology/core.ts");
        assert_eq!(diags[0].line, 14);
        assert_eq!(diags[0].column, 7);
        assert_eq!(diags[0].rule_id, "TS2322");
        assert!(diags[1].severity.is_error());
    }

    #[test]
    fn test_clean_output() {
        assert!(parse_tsc_output("").unwrap().is_empty());
        assert!(parse_tsc_output("Done in 3.2s.\n").unwrap().is_empty());
    }

    #[test]
    fn test_unparsable_summary_is_error() {
        let text = "something odd happened\nFound 4 errors.\n";
        assert!(matches!(
            parse_tsc_output(text),
            Err(MendError::Ingestion { .. })
        ));
    }
}
