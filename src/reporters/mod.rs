//! Output reporters for consistency results
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::models::{ContextReport, ValidationReport};
use crate::reporting::{CatalogSummary, Dashboard, MonitorStatus};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

pub fn render_validation(report: &ValidationReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_validation(report)),
        OutputFormat::Json => json::render(report),
    }
}

pub fn render_context(report: &ContextReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_context(report)),
        OutputFormat::Json => json::render(report),
    }
}

pub fn render_dashboard(dashboard: &Dashboard, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_dashboard(dashboard)),
        OutputFormat::Json => json::render(dashboard),
    }
}

pub fn render_status(status: &MonitorStatus, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_status(status)),
        OutputFormat::Json => json::render(status),
    }
}

pub fn render_catalog(version: &str, rules: &[CatalogSummary], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_catalog(version, rules)),
        OutputFormat::Json => json::render(&serde_json::json!({
            "version": version,
            "rules": rules,
        })),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{InconsistencyIssue, IssueCategory, Severity, SeverityCounts};

    /// A report with one remaining High issue
    pub(crate) fn test_validation() -> ValidationReport {
        let remaining = vec![InconsistencyIssue::new(
            IssueCategory::ErrorHandlingMissing,
            Severity::High,
            "app/users.py",
            3,
            "create_user",
            "try/except around data access",
        )
        .with_suggested_fix("Wrap the body in try/except")];

        ValidationReport {
            file_path: "app/users.py".into(),
            is_consistent: false,
            consistency_score: 50.0,
            total_issues: 2,
            fixed_issues: 1,
            suppressed_issues: 1,
            severity_counts: SeverityCounts::from_issues(&remaining),
            remaining_issues: remaining,
            fixed_source: "import os\n".into(),
            can_deliver: false,
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("sarif").is_err());
        assert_eq!(OutputFormat::default().to_string(), "text");
    }
}
