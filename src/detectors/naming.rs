//! Deprecated Identifier Detector
//!
//! Flags every occurrence of a deprecated identifier from the rule catalog,
//! e.g. `JWT_SECRET_KEY` where the codebase standardised on `JWT_SECRET`.

use tracing::debug;

use crate::detectors::base::{Detector, SourceUnit};
use crate::models::{InconsistencyIssue, IssueCategory};
use crate::rules::{CompiledRule, RuleCatalog};

pub struct NamingDetector {
    rules: Vec<CompiledRule>,
}

impl NamingDetector {
    pub fn new(catalog: &RuleCatalog) -> Self {
        Self {
            rules: catalog.naming_rules().cloned().collect(),
        }
    }
}

impl Detector for NamingDetector {
    fn name(&self) -> &'static str {
        "deprecated-names"
    }

    fn description(&self) -> &'static str {
        "Detects deprecated identifiers that have a canonical replacement"
    }

    fn categories(&self) -> &'static [IssueCategory] {
        &[IssueCategory::VariableNameMismatch]
    }

    fn detect(&self, unit: &SourceUnit) -> Vec<InconsistencyIssue> {
        let mut issues = Vec::new();

        for (i, line) in unit.lines().iter().enumerate() {
            let line_number = i as u32 + 1;
            if unit.is_line_suppressed(line_number) {
                continue;
            }
            for compiled in &self.rules {
                let Some(canonical) = compiled.rule.auto_fix_pattern.as_deref() else {
                    continue;
                };
                for m in compiled.regex.find_iter(line) {
                    issues.push(
                        InconsistencyIssue::new(
                            IssueCategory::VariableNameMismatch,
                            compiled.rule.severity,
                            unit.path,
                            line_number,
                            m.as_str(),
                            canonical,
                        )
                        .with_description(compiled.rule.description.clone())
                        .with_suggested_fix(format!(
                            "Rename `{}` to `{}`",
                            m.as_str(),
                            canonical
                        ))
                        .with_occurrence(m.start()),
                    );
                }
            }
        }

        debug!("NamingDetector found {} issues in {}", issues.len(), unit.path);
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn detect(source: &str) -> Vec<InconsistencyIssue> {
        let detector = NamingDetector::new(&RuleCatalog::builtin());
        detector.detect(&SourceUnit::new(source, "settings.py"))
    }

    #[test]
    fn test_detects_jwt_secret_key() {
        let issues = detect("JWT_SECRET_KEY = \"x\"\n");
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.category, IssueCategory::VariableNameMismatch);
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.line_number, 1);
        assert_eq!(issue.expected, "JWT_SECRET");
        assert!(issue.auto_fixable);
    }

    #[test]
    fn test_flags_every_occurrence_with_line() {
        let issues = detect("import os\nDB_URL = os.environ[\"DB_URL\"]\nprint(DB_URL)\n");
        let lines: Vec<u32> = issues.iter().map(|i| i.line_number).collect();
        assert_eq!(lines, vec![2, 2, 3]);
    }

    #[test]
    fn test_canonical_name_not_flagged() {
        assert!(detect("JWT_SECRET = \"x\"\nDATABASE_URL = 1\n").is_empty());
    }

    #[test]
    fn test_suppressed_line_skipped() {
        assert!(detect("JWT_SECRET_KEY = \"x\"  # sentinel: ignore\n").is_empty());
    }

    #[test]
    fn test_applies_to_any_language() {
        let detector = NamingDetector::new(&RuleCatalog::builtin());
        let issues = detector.detect(&SourceUnit::new("const userId = 1;", "app.js"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].expected, "user_id");
    }
}
