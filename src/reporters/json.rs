//! JSON reporter
//!
//! Pretty-printed JSON for any serialisable report, for piping to jq or CI.

use anyhow::Result;
use serde::Serialize;

pub fn render<T: Serialize + ?Sized>(report: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ConsistencyEngine;
    use crate::reporters::tests::test_validation;

    #[test]
    fn test_json_validation_report() {
        let json_str = render(&test_validation()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["can_deliver"], false);
        assert_eq!(parsed["remaining_issues"][0]["category"], "ERROR_HANDLING_MISSING");
        assert_eq!(parsed["severity_counts"]["high"], 1);
    }

    #[test]
    fn test_json_dashboard_keys_are_categories() {
        let dashboard = ConsistencyEngine::default().get_dashboard();
        let json_str = render(&dashboard).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        let scores = parsed["per_category_scores"].as_object().expect("scores object");
        assert_eq!(scores.len(), 7);
        assert!(parsed["rules"].as_array().is_some_and(|r| !r.is_empty()));
    }
}
