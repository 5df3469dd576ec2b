//! Deterministic auto-fix pipeline
//!
//! Applies lossless textual transforms for fixable issues and returns the
//! transformed source plus every issue it could not fix. Fixes are applied in
//! phases so that recorded line numbers stay valid:
//!
//! 1. line-local renames (`VARIABLE_NAME_MISMATCH`)
//! 2. file-wide identifier renames (`DATABASE_FIELD_NAMING`, `NAMING_CONVENTION`)
//! 3. import regrouping (`IMPORT_ORDER`)
//!
//! Renames never add or remove lines; only the last phase does.

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::detectors::imports::{classify, scan_imports, ImportGroup};
use crate::error::ConsistencyError;
use crate::models::{InconsistencyIssue, IssueCategory};
use crate::parsers::ImportInfo;

/// Why a single fix could not be applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixError {
    #[error("line {line} is out of range (source has {lines} lines)")]
    LineOutOfRange { line: u32, lines: usize },

    #[error("`{pattern}` not found on line {line}")]
    PatternNotFound { pattern: String, line: u32 },

    #[error("`{0}` not found in file")]
    IdentifierNotFound(String),

    #[error("renaming `{from}` would collide with existing `{to}`")]
    NameCollision { from: String, to: String },

    #[error("line {line} is outside the leading import block")]
    OutsideImportBlock { line: u32 },

    #[error("`{0}` is not a valid replacement")]
    InvalidReplacement(String),

    #[error("no deterministic fix exists for {0}")]
    Unsupported(IssueCategory),
}

impl FixError {
    pub fn into_consistency_error(self, category: IssueCategory) -> ConsistencyError {
        ConsistencyError::FixApplication {
            category,
            reason: self.to_string(),
        }
    }
}

/// Result of one `apply_fixes` batch
#[derive(Debug, Clone, Default)]
pub struct FixOutcome {
    pub fixed_source: String,
    /// Issues whose fix was applied (or found already applied)
    pub fixed: Vec<InconsistencyIssue>,
    /// Non-fixable issues plus failed fixes, in input order. Failed ones carry `fix_error`.
    pub remaining: Vec<InconsistencyIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    LineRename,
    FileRename,
    ImportRegroup,
}

impl Phase {
    fn of(category: IssueCategory) -> Option<Phase> {
        match category {
            IssueCategory::VariableNameMismatch => Some(Phase::LineRename),
            IssueCategory::DatabaseFieldNaming | IssueCategory::NamingConvention => Some(Phase::FileRename),
            IssueCategory::ImportOrder => Some(Phase::ImportRegroup),
            _ => None,
        }
    }
}

enum Status {
    Untouched,
    Fixed,
    Failed(FixError),
}

/// Applies fixes for one source file at a time
#[derive(Debug, Clone, Default)]
pub struct FixPipeline {
    first_party: Vec<String>,
}

impl FixPipeline {
    pub fn new(first_party: Vec<String>) -> Self {
        Self { first_party }
    }

    pub fn apply_fixes(&self, source: &str, issues: &[InconsistencyIssue]) -> FixOutcome {
        let mut lines: Vec<String> = source.split('\n').map(str::to_string).collect();
        let mut status: Vec<Status> = issues.iter().map(|_| Status::Untouched).collect();

        let mut order: Vec<(Phase, usize)> = Vec::new();
        for (idx, issue) in issues.iter().enumerate() {
            if !issue.auto_fixable {
                continue;
            }
            match Phase::of(issue.category) {
                Some(phase) => order.push((phase, idx)),
                None => status[idx] = Status::Failed(FixError::Unsupported(issue.category)),
            }
        }
        // Stable: input order is kept within a phase
        order.sort_by_key(|(phase, _)| *phase);

        let mut import_batch = Vec::new();
        for (phase, idx) in order {
            let issue = &issues[idx];
            let result = match phase {
                Phase::LineRename => rename_on_line(&mut lines, issue),
                Phase::FileRename => rename_in_file(&mut lines, issue),
                Phase::ImportRegroup => {
                    import_batch.push(idx);
                    continue;
                }
            };
            status[idx] = to_status(result);
        }

        if !import_batch.is_empty() {
            for (idx, result) in self.regroup_imports(&mut lines, issues, &import_batch) {
                status[idx] = to_status(result);
            }
        }

        let mut outcome = FixOutcome {
            fixed_source: lines.join("\n"),
            ..Default::default()
        };
        for (issue, status) in issues.iter().zip(status) {
            match status {
                Status::Fixed => outcome.fixed.push(issue.clone()),
                Status::Untouched => outcome.remaining.push(issue.clone()),
                Status::Failed(err) => {
                    debug!(
                        "Fix for {} at {}:{} failed: {}",
                        issue.category, issue.file_path, issue.line_number, err
                    );
                    let mut demoted = issue.clone();
                    demoted.fix_error = Some(err.to_string());
                    outcome.remaining.push(demoted);
                }
            }
        }

        debug!(
            "Applied {} fixes, {} issues remaining",
            outcome.fixed.len(),
            outcome.remaining.len()
        );
        outcome
    }

    /// Regroup the leading import block once for every import issue inside it
    fn regroup_imports(
        &self,
        lines: &mut Vec<String>,
        issues: &[InconsistencyIssue],
        batch: &[usize],
    ) -> Vec<(usize, Result<(), FixError>)> {
        let source = lines.join("\n");
        let block = leading_import_block(&source, lines);

        let mut results = Vec::with_capacity(batch.len());
        let mut any_inside = false;
        for &idx in batch {
            let line = issues[idx].line_number;
            let inside = block
                .as_ref()
                .is_some_and(|b| b.entries.iter().any(|e| e.import.line_start == line));
            if inside {
                any_inside = true;
                results.push((idx, Ok(())));
            } else {
                results.push((idx, Err(FixError::OutsideImportBlock { line })));
            }
        }

        if let (true, Some(block)) = (any_inside, block) {
            let regrouped = block.render(lines, &self.first_party);
            let start = block.start as usize - 1;
            let end = block.end as usize;
            lines.splice(start..end, regrouped);
        }
        results
    }
}

fn to_status(result: Result<(), FixError>) -> Status {
    match result {
        Ok(()) => Status::Fixed,
        Err(e) => Status::Failed(e),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn word_regex(word: &str) -> Regex {
    // An escaped literal between word boundaries is always a valid pattern
    Regex::new(&format!(r"\b{}\b", regex::escape(word))).expect("valid regex")
}

fn rename_on_line(lines: &mut [String], issue: &InconsistencyIssue) -> Result<(), FixError> {
    if !is_identifier(&issue.expected) {
        return Err(FixError::InvalidReplacement(issue.expected.clone()));
    }
    let idx = issue.line_number as usize;
    if idx == 0 || idx > lines.len() {
        return Err(FixError::LineOutOfRange {
            line: issue.line_number,
            lines: lines.len(),
        });
    }
    let line = &mut lines[idx - 1];
    let from = word_regex(&issue.actual);
    if from.is_match(line) {
        *line = from.replace_all(line, issue.expected.as_str()).into_owned();
        return Ok(());
    }
    if word_regex(&issue.expected).is_match(line) {
        // An earlier fix in this batch already handled this occurrence
        return Ok(());
    }
    Err(FixError::PatternNotFound {
        pattern: issue.actual.clone(),
        line: issue.line_number,
    })
}

fn rename_in_file(lines: &mut [String], issue: &InconsistencyIssue) -> Result<(), FixError> {
    if !is_identifier(&issue.expected) {
        return Err(FixError::InvalidReplacement(issue.expected.clone()));
    }
    let from = word_regex(&issue.actual);
    let to = word_regex(&issue.expected);
    let has_from = lines.iter().any(|l| from.is_match(l));
    let has_to = lines.iter().any(|l| to.is_match(l));

    match (has_from, has_to) {
        (true, true) => Err(FixError::NameCollision {
            from: issue.actual.clone(),
            to: issue.expected.clone(),
        }),
        (true, false) => {
            for line in lines.iter_mut() {
                if from.is_match(line) {
                    *line = from.replace_all(line, issue.expected.as_str()).into_owned();
                }
            }
            Ok(())
        }
        (false, true) => Ok(()),
        (false, false) => Err(FixError::IdentifierNotFound(issue.actual.clone())),
    }
}

struct BlockEntry {
    import: ImportInfo,
    /// Comment lines between the previous statement and this one, moved with it
    comments: Vec<usize>,
}

/// The leading run of top-level imports, separated only by blank or comment lines
struct ImportBlock {
    start: u32,
    end: u32,
    entries: Vec<BlockEntry>,
}

impl ImportBlock {
    fn render(&self, lines: &[String], first_party: &[String]) -> Vec<String> {
        let mut groups: [Vec<&BlockEntry>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for entry in &self.entries {
            let slot = match classify(&entry.import, first_party) {
                ImportGroup::Standard => 0,
                ImportGroup::ThirdParty => 1,
                ImportGroup::Local => 2,
            };
            groups[slot].push(entry);
        }

        let mut out = Vec::new();
        for group in groups.iter().filter(|g| !g.is_empty()) {
            if !out.is_empty() {
                out.push(String::new());
            }
            for entry in group {
                out.extend(entry.comments.iter().map(|&i| lines[i].clone()));
                let start = entry.import.line_start as usize - 1;
                let end = entry.import.line_end as usize;
                out.extend(lines[start..end].iter().cloned());
            }
        }
        out
    }
}

fn leading_import_block(source: &str, lines: &[String]) -> Option<ImportBlock> {
    let imports = scan_imports(source);
    let first = imports.first()?;

    let mut block = ImportBlock {
        start: first.line_start,
        end: first.line_end,
        entries: Vec::new(),
    };
    let mut prev_end = first.line_start - 1;

    for import in imports {
        // Lines strictly between the previous statement and this one (0-based)
        let gap = prev_end as usize..import.line_start as usize - 1;
        let mut comments = Vec::new();
        let mut contiguous = true;
        for i in gap {
            let text = lines[i].trim();
            if text.starts_with('#') {
                comments.push(i);
            } else if !text.is_empty() {
                contiguous = false;
                break;
            }
        }
        if !contiguous {
            break;
        }
        block.end = import.line_end;
        prev_end = import.line_end;
        block.entries.push(BlockEntry { import, comments });
    }

    Some(block)
}

/// Apply fixes and return only the transformed source and what is left
pub fn auto_fix(pipeline: &FixPipeline, source: &str, issues: &[InconsistencyIssue]) -> (String, Vec<InconsistencyIssue>) {
    let outcome = pipeline.apply_fixes(source, issues);
    (outcome.fixed_source, outcome.remaining)
}
