//! Naming Convention Detector
//!
//! PEP 8 naming on the AST: functions and methods are snake_case, classes are
//! PascalCase. Dunder methods are exempt. Files that do not parse are skipped;
//! the signature detector already reports the syntax error.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::detectors::base::{Detector, SourceUnit};
use crate::detectors::case::{to_pascal_case, to_snake_case};
use crate::models::{InconsistencyIssue, IssueCategory, Severity};

pub const SNAKE_CASE_PATTERN: &str = r"^_*[a-z][a-z0-9_]*$";
pub const PASCAL_CASE_PATTERN: &str = r"^_*[A-Z][A-Za-z0-9]*$";

static SNAKE_CASE: OnceLock<Regex> = OnceLock::new();
static PASCAL_CASE: OnceLock<Regex> = OnceLock::new();

pub fn is_snake_case(name: &str) -> bool {
    SNAKE_CASE
        .get_or_init(|| Regex::new(SNAKE_CASE_PATTERN).expect("valid regex"))
        .is_match(name)
}

pub fn is_pascal_case(name: &str) -> bool {
    PASCAL_CASE
        .get_or_init(|| Regex::new(PASCAL_CASE_PATTERN).expect("valid regex"))
        .is_match(name)
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

pub struct ConventionDetector;

impl ConventionDetector {
    pub fn new() -> Self {
        Self
    }

    fn issue(
        unit: &SourceUnit,
        line: u32,
        kind: &str,
        name: &str,
        expected: String,
        convention: &str,
    ) -> InconsistencyIssue {
        InconsistencyIssue::new(
            IssueCategory::NamingConvention,
            Severity::Low,
            unit.path,
            line,
            name,
            expected.clone(),
        )
        .with_description(format!("{} `{}` is not {}", kind, name, convention))
        .with_suggested_fix(format!("Rename `{}` to `{}` and update its callers", name, expected))
    }
}

impl Default for ConventionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for ConventionDetector {
    fn name(&self) -> &'static str {
        "naming-convention"
    }

    fn description(&self) -> &'static str {
        "Detects functions that are not snake_case and classes that are not PascalCase"
    }

    fn categories(&self) -> &'static [IssueCategory] {
        &[IssueCategory::NamingConvention]
    }

    fn detect(&self, unit: &SourceUnit) -> Vec<InconsistencyIssue> {
        let Some(model) = unit.model() else {
            return vec![];
        };
        let mut issues = Vec::new();

        for func in model.find_functions() {
            if is_dunder(&func.name) || is_snake_case(&func.name) {
                continue;
            }
            let expected = to_snake_case(&func.name);
            if expected == func.name || !is_snake_case(&expected) {
                continue;
            }
            if unit.is_line_suppressed(func.line_start) {
                continue;
            }
            let kind = if func.is_method { "Method" } else { "Function" };
            issues.push(Self::issue(unit, func.line_start, kind, &func.name, expected, "snake_case"));
        }

        for class in model.find_classes() {
            if is_pascal_case(&class.name) {
                continue;
            }
            let expected = to_pascal_case(&class.name);
            if expected == class.name || !is_pascal_case(&expected) {
                continue;
            }
            if unit.is_line_suppressed(class.line_start) {
                continue;
            }
            issues.push(Self::issue(unit, class.line_start, "Class", &class.name, expected, "PascalCase"));
        }

        issues.sort_by_key(|i| i.line_number);
        debug!("ConventionDetector found {} issues in {}", issues.len(), unit.path);
        issues
    }
}
