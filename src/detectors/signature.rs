//! Function Signature Detector
//!
//! AST-based checks on data-access functions (`create_`, `update_`,
//! `delete_`, `get_`):
//! - declared synchronously where the codebase expects `async def`
//! - no `try` block anywhere in the body
//!
//! A file that does not parse gets a single Critical syntax issue instead.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::detectors::base::{Detector, SourceUnit};
use crate::error::ConsistencyError;
use crate::models::{InconsistencyIssue, IssueCategory, Severity};

pub const CRUD_PREFIX_PATTERN: &str = r"^(?:create|update|delete|get)_";

static CRUD_PREFIX: OnceLock<Regex> = OnceLock::new();

fn crud_prefix() -> &'static Regex {
    CRUD_PREFIX.get_or_init(|| Regex::new(CRUD_PREFIX_PATTERN).expect("valid regex"))
}

pub struct SignatureDetector;

impl SignatureDetector {
    pub fn new() -> Self {
        Self
    }

    fn syntax_issue(unit: &SourceUnit, error: &ConsistencyError) -> InconsistencyIssue {
        let (line, message) = match error {
            ConsistencyError::SourceSyntax { line, message, .. } => (*line, message.clone()),
            other => (1, other.to_string()),
        };
        InconsistencyIssue::new(
            IssueCategory::SyntaxError,
            Severity::Critical,
            unit.path,
            line,
            message.clone(),
            "valid syntax",
        )
        .with_description(format!("Source does not parse: {}", message))
        .with_suggested_fix("Fix the syntax error; structural checks are skipped until the file parses")
    }
}

impl Default for SignatureDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SignatureDetector {
    fn name(&self) -> &'static str {
        "function-signature"
    }

    fn description(&self) -> &'static str {
        "Detects synchronous or unguarded data-access functions"
    }

    fn categories(&self) -> &'static [IssueCategory] {
        &[
            IssueCategory::FunctionSignatureMismatch,
            IssueCategory::ErrorHandlingMissing,
            IssueCategory::SyntaxError,
        ]
    }

    fn detect(&self, unit: &SourceUnit) -> Vec<InconsistencyIssue> {
        if let Some(error) = unit.syntax_error() {
            return vec![Self::syntax_issue(unit, error)];
        }
        let Some(model) = unit.model() else {
            return vec![];
        };

        let mut issues = Vec::new();
        for func in model.find_functions() {
            if !crud_prefix().is_match(&func.name) || unit.is_line_suppressed(func.line_start) {
                continue;
            }

            if !func.is_async {
                issues.push(
                    InconsistencyIssue::new(
                        IssueCategory::FunctionSignatureMismatch,
                        Severity::Medium,
                        unit.path,
                        func.line_start,
                        format!("def {}", func.name),
                        format!("async def {}", func.name),
                    )
                    .with_description(format!(
                        "Data-access function `{}` is declared synchronously",
                        func.name
                    ))
                    .with_suggested_fix(format!(
                        "Declare `{}` with `async def` and await its I/O calls",
                        func.name
                    )),
                );
            }

            if !func.has_try {
                issues.push(
                    InconsistencyIssue::new(
                        IssueCategory::ErrorHandlingMissing,
                        Severity::High,
                        unit.path,
                        func.line_start,
                        func.name.clone(),
                        "try/except around data access",
                    )
                    .with_description(format!(
                        "Data-access function `{}` has no error handling",
                        func.name
                    ))
                    .with_suggested_fix(format!(
                        "Wrap the body of `{}` in try/except and translate failures into domain errors",
                        func.name
                    )),
                );
            }
        }

        debug!("SignatureDetector found {} issues in {}", issues.len(), unit.path);
        issues
    }
}
