//! JSON reporter
//!
//! Full `AggregateReport` dump for machine consumption, piping to jq, or
//! further processing.

use crate::scoring::AggregateReport;
use anyhow::Result;

/// Render report as pretty-printed JSON
pub fn render(report: &AggregateReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render report as compact JSON (single line)
pub fn render_compact(report: &AggregateReport) -> Result<String> {
    Ok(serde_json::to_string(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::sample_aggregate;

    #[test]
    fn test_json_render_valid() {
        let json_str = render(&sample_aggregate()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["performance_score"], 85.0);
        assert_eq!(
            parsed["database"]["findings"][0]["issue_type"],
            "full_table_scan"
        );
        // Empty domains are omitted entirely
        assert!(parsed.get("cpu").is_none());
    }

    #[test]
    fn test_json_render_compact() {
        let json_str = render_compact(&sample_aggregate()).expect("render compact JSON");
        assert!(!json_str.contains('\n'));
        let _: serde_json::Value = serde_json::from_str(&json_str).expect("parse compact JSON");
    }
}
