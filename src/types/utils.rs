//! Small helpers shared by ingestion and storage.

use crate::types::AlertSeverity;
use std::fmt::Display;

/// String field of a JSON object
#[inline]
pub fn json_string(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(String::from)
}

#[inline]
pub fn json_string_or(value: &serde_json::Value, key: &str, default: &str) -> String {
    json_string(value, key).unwrap_or_else(|| default.to_string())
}

#[inline]
pub fn json_i64(value: &serde_json::Value, key: &str, default: i64) -> i64 {
    value.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
}

/// Enum columns read back from the database. An unknown value falls back
/// to a default and is logged, since it means the row was written by a
/// different schema.
pub trait ParseWithDefault: Sized {
    fn type_name() -> &'static str;

    fn default_value() -> Self;

    fn try_parse(s: &str) -> Option<Self>;

    fn parse_or_default(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_else(|| {
            tracing::warn!("Invalid {} value '{}', using default", Self::type_name(), s);
            Self::default_value()
        })
    }
}

impl ParseWithDefault for AlertSeverity {
    fn type_name() -> &'static str {
        "AlertSeverity"
    }

    fn default_value() -> Self {
        AlertSeverity::Warning
    }

    fn try_parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

/// `filter_map` adapter that logs the rows it drops
pub fn log_filter_error<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    result.map_err(|e| tracing::debug!("{}: {}", context, e)).ok()
}

/// Forward slashes, no leading `./`
pub fn normalize_path(path: &str) -> String {
    let p = path.replace('\\', "/");
    p.strip_prefix("./").map(String::from).unwrap_or(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_severity_fallback() {
        assert_eq!(AlertSeverity::parse_or_default("critical"), AlertSeverity::Critical);
        assert_eq!(AlertSeverity::parse_or_default("??"), AlertSeverity::Warning);
    }

    #[test]
    fn test_json_helpers() {
        let v = serde_json::json!({"ruleId": "semi", "line": 4});
        assert_eq!(json_string(&v, "ruleId").as_deref(), Some("semi"));
        assert_eq!(json_string_or(&v, "missing", "x"), "x");
        assert_eq!(json_i64(&v, "line", 0), 4);
        assert_eq!(json_i64(&v, "column", 1), 1);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./src/a.ts"), "src/a.ts");
        assert_eq!(normalize_path("src\\lib\\b.ts"), "src/lib/b.ts");
    }
}
