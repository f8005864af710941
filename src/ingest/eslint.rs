//! ESLint `--format json` output.

use serde_json::Value;

use super::{PARSING_ERROR_RULE, json_payload};
use crate::types::{
    Diagnostic, DiagnosticSeverity, MendError, Result, json_i64, json_string, json_string_or,
};

/// Parse the ESLint JSON formatter output.
///
/// Each file entry carries `filePath` and `messages`. A message with a null
/// `ruleId` is a parser error and is reported as [`PARSING_ERROR_RULE`].
/// Messages with severity 0 (off) are skipped.
pub fn parse_eslint_json(text: &str) -> Result<Vec<Diagnostic>> {
    let payload = json_payload(text, "eslint")?;
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| MendError::ingestion("eslint", format!("invalid JSON: {}", e)))?;

    let files = value
        .as_array()
        .ok_or_else(|| MendError::ingestion("eslint", "expected a JSON array of file results"))?;

    let mut diagnostics = Vec::new();
    for (idx, file) in files.iter().enumerate() {
        let path = json_string(file, "filePath").ok_or_else(|| {
            MendError::ingestion("eslint", format!("entry {} has no filePath", idx))
        })?;
        let Some(messages) = file.get("messages").and_then(Value::as_array) else {
            continue;
        };

        for msg in messages {
            let Some(severity) = DiagnosticSeverity::from_eslint(json_i64(msg, "severity", 0))
            else {
                continue;
            };
            let rule_id = json_string(msg, "ruleId");
            let fatal = msg.get("fatal").and_then(Value::as_bool).unwrap_or(false);
            let rule_id = match rule_id {
                Some(id) if !fatal => id,
                _ => PARSING_ERROR_RULE.to_string(),
            };
            let severity = if rule_id == PARSING_ERROR_RULE {
                DiagnosticSeverity::Error
            } else {
                severity
            };

            diagnostics.push(Diagnostic {
                file: path.clone(),
                line: json_i64(msg, "line", 1).max(0) as u32,
                column: json_i64(msg, "column", 1).max(0) as u32,
                rule_id,
                message: json_string_or(msg, "message", ""),
                severity,
                auto_fix_available: msg.get("fix").is_some_and(|f| !f.is_null())
                    || msg
                        .get("suggestions")
                        .and_then(Value::as_array)
                        .is_some_and(|s| !s.is_empty()),
            });
        }
    }

    Ok(diagnostics)
}
