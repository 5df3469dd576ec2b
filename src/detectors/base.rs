//! Base detector trait and types
//!
//! This module defines the core abstractions for consistency detection:
//! - `SourceUnit`, one file's text plus its parsed source model
//! - `Detector` trait that all detectors must implement
//! - `DetectorOptions` for the few knobs detectors take from configuration

use std::sync::OnceLock;

use crate::error::ConsistencyError;
use crate::models::{InconsistencyIssue, IssueCategory};
use crate::parsers::{self, Language, SourceModel};

const SUPPRESSION_PATTERN: &str = "sentinel: ignore";
const SUPPRESSION_PATTERN_ALT: &str = "sentinel:ignore";

/// One source file as seen by the detectors.
///
/// The source model is parsed lazily, on the first `model()` or
/// `syntax_error()` call, and then shared by every AST-dependent detector.
pub struct SourceUnit<'a> {
    pub path: &'a str,
    pub source: &'a str,
    pub language: Language,
    lines: Vec<&'a str>,
    model: OnceLock<Option<Result<Box<dyn SourceModel>, ConsistencyError>>>,
}

impl<'a> SourceUnit<'a> {
    pub fn new(source: &'a str, path: &'a str) -> Self {
        Self {
            path,
            source,
            language: Language::from_path(path),
            lines: source.lines().collect(),
            model: OnceLock::new(),
        }
    }

    fn parsed(&self) -> &Option<Result<Box<dyn SourceModel>, ConsistencyError>> {
        self.model.get_or_init(|| parsers::parse_source(self.source, self.path))
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    /// The parsed model, if the language is supported and the source parsed
    pub fn model(&self) -> Option<&dyn SourceModel> {
        match self.parsed() {
            Some(Ok(model)) => Some(model.as_ref()),
            _ => None,
        }
    }

    /// The parse failure, if the language is supported and the source did not parse
    pub fn syntax_error(&self) -> Option<&ConsistencyError> {
        match self.parsed() {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_python(&self) -> bool {
        self.language == Language::Python
    }

    /// Whether the 1-based `line_number` carries an inline suppression
    pub fn is_line_suppressed(&self, line_number: u32) -> bool {
        let idx = line_number as usize;
        if idx == 0 || idx > self.lines.len() {
            return false;
        }
        let prev = if idx >= 2 { Some(self.lines[idx - 2]) } else { None };
        is_line_suppressed(self.lines[idx - 1], prev)
    }
}

/// Check if a line should be suppressed via inline comment
///
/// Supports:
/// - `# sentinel: ignore` at the end of the line
/// - `# sentinel: ignore` alone on the line above
pub fn is_line_suppressed(line: &str, prev_line: Option<&str>) -> bool {
    let line_lower = line.to_lowercase();
    if line_lower.contains(SUPPRESSION_PATTERN) || line_lower.contains(SUPPRESSION_PATTERN_ALT) {
        return true;
    }

    // Only count the previous line if it is just a comment (not code + comment)
    if let Some(prev) = prev_line {
        let prev_lower = prev.trim().to_lowercase();
        if prev_lower.starts_with('#')
            && (prev_lower.contains(SUPPRESSION_PATTERN)
                || prev_lower.contains(SUPPRESSION_PATTERN_ALT))
        {
            return true;
        }
    }

    false
}

/// Detector knobs taken from configuration
#[derive(Debug, Clone, Default)]
pub struct DetectorOptions {
    /// Top-level package names that count as local imports
    pub first_party: Vec<String>,
}

/// Trait for all consistency detectors
///
/// Detectors are stateless: the same unit always yields the same issues and
/// the order detectors run in does not matter.
pub trait Detector: Send + Sync {
    /// Unique identifier for this detector
    fn name(&self) -> &'static str;

    /// Human-readable description of what this detector finds
    fn description(&self) -> &'static str;

    /// Issue categories this detector can emit
    fn categories(&self) -> &'static [IssueCategory];

    /// Scan one source unit
    fn detect(&self, unit: &SourceUnit) -> Vec<InconsistencyIssue>;
}
