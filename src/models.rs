//! Core data models for consistency-sentinel
//!
//! These models are shared by the detectors, the fix pipeline, the context
//! layer and the monitor.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Generate a deterministic issue ID based on content hash.
///
/// The same inconsistency in the same place gets the same ID across runs,
/// which keeps fix results and history comparable between scans.
///
/// The ID is a 16-character hex string derived from hashing:
/// - category (what kind of inconsistency)
/// - file path (where it was found)
/// - line number (specific location)
/// - actual (the offending text)
pub fn deterministic_issue_id(category: IssueCategory, file: &str, line: u32, actual: &str) -> String {
    let input = format!("{}\n{file}\n{line}\n{actual}", category.as_str());
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

/// Severity levels for issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Penalty subtracted from the reality score for one remaining issue
    pub fn penalty(&self) -> f64 {
        match self {
            Severity::Critical => 0.15,
            Severity::High => 0.05,
            Severity::Medium => 0.02,
            Severity::Low => 0.01,
        }
    }

    /// Critical and High issues block delivery
    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!(
                "unknown severity '{}' (expected critical, high, medium or low)",
                other
            )),
        }
    }
}

/// The kind of inconsistency a detector reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCategory {
    VariableNameMismatch,
    ImportOrder,
    FunctionSignatureMismatch,
    ErrorHandlingMissing,
    ApiEndpointShape,
    ConfigTypeMismatch,
    DatabaseFieldNaming,
    NamingConvention,
    SyntaxError,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 9] = [
        IssueCategory::VariableNameMismatch,
        IssueCategory::ImportOrder,
        IssueCategory::FunctionSignatureMismatch,
        IssueCategory::ErrorHandlingMissing,
        IssueCategory::ApiEndpointShape,
        IssueCategory::ConfigTypeMismatch,
        IssueCategory::DatabaseFieldNaming,
        IssueCategory::NamingConvention,
        IssueCategory::SyntaxError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::VariableNameMismatch => "VARIABLE_NAME_MISMATCH",
            IssueCategory::ImportOrder => "IMPORT_ORDER",
            IssueCategory::FunctionSignatureMismatch => "FUNCTION_SIGNATURE_MISMATCH",
            IssueCategory::ErrorHandlingMissing => "ERROR_HANDLING_MISSING",
            IssueCategory::ApiEndpointShape => "API_ENDPOINT_SHAPE",
            IssueCategory::ConfigTypeMismatch => "CONFIG_TYPE_MISMATCH",
            IssueCategory::DatabaseFieldNaming => "DATABASE_FIELD_NAMING",
            IssueCategory::NamingConvention => "NAMING_CONVENTION",
            IssueCategory::SyntaxError => "SYNTAX_ERROR",
        }
    }

    /// Whether a lossless deterministic substitution exists for this category
    pub fn is_auto_fixable(&self) -> bool {
        matches!(
            self,
            IssueCategory::VariableNameMismatch
                | IssueCategory::ImportOrder
                | IssueCategory::DatabaseFieldNaming
                | IssueCategory::NamingConvention
        )
    }

    /// Metric category this issue counts against
    pub fn check_category(&self) -> CheckCategory {
        match self {
            IssueCategory::VariableNameMismatch | IssueCategory::NamingConvention => {
                CheckCategory::Naming
            }
            IssueCategory::DatabaseFieldNaming => CheckCategory::Schema,
            IssueCategory::ConfigTypeMismatch => CheckCategory::Config,
            IssueCategory::SyntaxError => CheckCategory::Syntax,
            IssueCategory::ApiEndpointShape | IssueCategory::FunctionSignatureMismatch => {
                CheckCategory::Api
            }
            IssueCategory::ErrorHandlingMissing => CheckCategory::ErrorHandling,
            IssueCategory::ImportOrder => CheckCategory::ImportOrder,
        }
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IssueCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        IssueCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown issue category '{}'", s))
    }
}

/// Repository-wide check categories, one metric each per monitoring cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Naming,
    Schema,
    Config,
    Syntax,
    Api,
    ErrorHandling,
    ImportOrder,
}

impl CheckCategory {
    pub const ALL: [CheckCategory; 7] = [
        CheckCategory::Naming,
        CheckCategory::Schema,
        CheckCategory::Config,
        CheckCategory::Syntax,
        CheckCategory::Api,
        CheckCategory::ErrorHandling,
        CheckCategory::ImportOrder,
    ];

    /// Minimum acceptable score before a breach alert is raised
    pub fn default_threshold(&self) -> f64 {
        match self {
            CheckCategory::Naming
            | CheckCategory::Schema
            | CheckCategory::Config
            | CheckCategory::Syntax => 100.0,
            CheckCategory::Api | CheckCategory::ErrorHandling => 95.0,
            CheckCategory::ImportOrder => 90.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckCategory::Naming => "naming",
            CheckCategory::Schema => "schema",
            CheckCategory::Config => "config",
            CheckCategory::Syntax => "syntax",
            CheckCategory::Api => "api",
            CheckCategory::ErrorHandling => "error_handling",
            CheckCategory::ImportOrder => "import_order",
        }
    }
}

impl std::fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        CheckCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown check category '{}'", s))
    }
}

/// A single detected inconsistency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InconsistencyIssue {
    pub id: String,
    pub category: IssueCategory,
    pub severity: Severity,
    pub file_path: String,
    pub line_number: u32,
    pub description: String,
    /// What the code should contain
    pub expected: String,
    /// What the code contains (the matched snippet)
    pub actual: String,
    pub suggested_fix: String,
    pub auto_fixable: bool,
    /// Set on the copy returned by the fix pipeline when the fix attempt failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_error: Option<String>,
}

impl InconsistencyIssue {
    /// Build an issue; the ID and fixability are derived from the category.
    pub fn new(
        category: IssueCategory,
        severity: Severity,
        file_path: &str,
        line_number: u32,
        actual: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        let actual = actual.into();
        Self {
            id: deterministic_issue_id(category, file_path, line_number, &actual),
            category,
            severity,
            file_path: file_path.to_string(),
            line_number,
            description: String::new(),
            expected: expected.into(),
            actual,
            suggested_fix: String::new(),
            auto_fixable: category.is_auto_fixable(),
            fix_error: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = fix.into();
        self
    }

    /// Distinguish several matches of the same text on one line
    pub fn with_occurrence(mut self, column: usize) -> Self {
        let key = format!("{}@{}", self.actual, column);
        self.id = deterministic_issue_id(self.category, &self.file_path, self.line_number, &key);
        self
    }
}

/// Issue counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

impl SeverityCounts {
    pub fn from_issues(issues: &[InconsistencyIssue]) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
            counts.total += 1;
        }
        counts
    }

    /// Zero Critical and zero High issues
    pub fn is_deliverable(&self) -> bool {
        self.critical == 0 && self.high == 0
    }
}

/// Result of `validate`: detection, context suppression and auto-fix in one pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub file_path: String,
    pub is_consistent: bool,
    /// Share of detected issues that were fixed, 0-100
    pub consistency_score: f64,
    pub total_issues: usize,
    pub fixed_issues: usize,
    pub suppressed_issues: usize,
    pub remaining_issues: Vec<InconsistencyIssue>,
    pub fixed_source: String,
    pub can_deliver: bool,
    pub severity_counts: SeverityCounts,
}

/// Result of `check_with_context`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextReport {
    pub file_path: String,
    pub is_real: bool,
    /// 1.0 minus the severity-weighted penalty of the kept issues, 0.0-1.0
    pub reality_score: f64,
    pub hallucinations: Vec<InconsistencyIssue>,
    pub severity_counts: SeverityCounts,
    pub suppressed_count: usize,
    pub summary: String,
}
