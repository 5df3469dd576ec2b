//! Import Order Detector
//!
//! Module-level imports must come in three blocks: standard library, then
//! third-party, then local. Uses the AST's import list when the file parses
//! and falls back to a textual scan when it does not.

use std::borrow::Cow;

use tracing::debug;

use crate::detectors::base::{Detector, DetectorOptions, SourceUnit};
use crate::detectors::imports::{classify, scan_imports, ImportGroup};
use crate::models::{InconsistencyIssue, IssueCategory, Severity};
use crate::parsers::ImportInfo;

pub struct ImportOrderDetector {
    first_party: Vec<String>,
}

impl ImportOrderDetector {
    pub fn new(options: &DetectorOptions) -> Self {
        Self {
            first_party: options.first_party.clone(),
        }
    }
}

impl Detector for ImportOrderDetector {
    fn name(&self) -> &'static str {
        "import-order"
    }

    fn description(&self) -> &'static str {
        "Detects imports outside their standard / third-party / local block"
    }

    fn categories(&self) -> &'static [IssueCategory] {
        &[IssueCategory::ImportOrder]
    }

    fn detect(&self, unit: &SourceUnit) -> Vec<InconsistencyIssue> {
        if !unit.is_python() {
            return vec![];
        }

        let imports: Cow<[ImportInfo]> = match unit.model() {
            Some(model) => Cow::Borrowed(model.find_imports()),
            None => Cow::Owned(scan_imports(unit.source)),
        };

        let mut issues = Vec::new();
        let mut highest = ImportGroup::Standard;

        for import in imports.iter() {
            let group = classify(import, &self.first_party);
            if group < highest {
                if unit.is_line_suppressed(import.line_start) {
                    continue;
                }
                let statement = unit
                    .lines()
                    .get(import.line_start as usize - 1)
                    .map(|l| l.trim())
                    .unwrap_or(import.module.as_str());
                issues.push(
                    InconsistencyIssue::new(
                        IssueCategory::ImportOrder,
                        Severity::Low,
                        unit.path,
                        import.line_start,
                        statement,
                        group.label(),
                    )
                    .with_description(format!(
                        "{} import `{}` appears after {} imports",
                        capitalize(group.label()),
                        import.module,
                        highest.label()
                    ))
                    .with_suggested_fix(
                        "Group imports as standard library, third-party, then local, \
                         separated by blank lines",
                    ),
                );
            } else {
                highest = group;
            }
        }

        debug!("ImportOrderDetector found {} issues in {}", issues.len(), unit.path);
        issues
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
