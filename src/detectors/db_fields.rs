//! Database Field Naming Detector
//!
//! Model fields (SQLAlchemy `Column`/`mapped_column`, Django `models.*Field`,
//! pydantic/SQLModel `Field`) must be snake_case so column names match the
//! schema conventions.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::detectors::base::{Detector, SourceUnit};
use crate::detectors::case::to_snake_case;
use crate::detectors::convention::is_snake_case;
use crate::models::{InconsistencyIssue, IssueCategory, Severity};

pub const FIELD_DECLARATION_PATTERN: &str = r"^(?P<indent>[ \t]+)(?P<name>[A-Za-z_]\w*)\s*(?::\s*[^=\n]+)?=\s*(?:\w+\.)*(?P<ctor>Column|Field|mapped_column|relationship|\w+Field)\(";

static FIELD_DECLARATION: OnceLock<Regex> = OnceLock::new();

fn field_declaration() -> &'static Regex {
    FIELD_DECLARATION.get_or_init(|| Regex::new(FIELD_DECLARATION_PATTERN).expect("valid regex"))
}

pub struct DbFieldDetector;

impl DbFieldDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DbFieldDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for DbFieldDetector {
    fn name(&self) -> &'static str {
        "db-field-naming"
    }

    fn description(&self) -> &'static str {
        "Detects database model fields that are not snake_case"
    }

    fn categories(&self) -> &'static [IssueCategory] {
        &[IssueCategory::DatabaseFieldNaming]
    }

    fn detect(&self, unit: &SourceUnit) -> Vec<InconsistencyIssue> {
        let mut issues = Vec::new();

        for (i, line) in unit.lines().iter().enumerate() {
            let line_number = i as u32 + 1;
            let Some(caps) = field_declaration().captures(line) else {
                continue;
            };
            let name = &caps["name"];
            if is_snake_case(name) {
                continue;
            }
            let expected = to_snake_case(name);
            if expected == name || !is_snake_case(&expected) {
                continue;
            }
            if unit.is_line_suppressed(line_number) {
                continue;
            }

            issues.push(
                InconsistencyIssue::new(
                    IssueCategory::DatabaseFieldNaming,
                    Severity::Medium,
                    unit.path,
                    line_number,
                    name,
                    expected.clone(),
                )
                .with_description(format!(
                    "Model field `{}` ({}) is not snake_case",
                    name, &caps["ctor"]
                ))
                .with_suggested_fix(format!("Rename field `{}` to `{}`", name, expected)),
            );
        }

        debug!("DbFieldDetector found {} issues in {}", issues.len(), unit.path);
        issues
    }
}
