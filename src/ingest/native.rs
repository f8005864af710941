//! Native diagnostic records (`[{file, line, column, ruleId, ...}]`).

use super::json_payload;
use crate::types::{Diagnostic, MendError, Result};

pub fn parse_native_json(text: &str) -> Result<Vec<Diagnostic>> {
    let payload = json_payload(text, "native")?;
    serde_json::from_str(payload)
        .map_err(|e| MendError::ingestion("native", format!("invalid diagnostic records: {}", e)))
}
