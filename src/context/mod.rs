//! Context suppression layer
//!
//! Reclassifies detected issues as intentional when their surroundings say so:
//! test fixtures, security honeypots, and code that defines the very patterns
//! the detectors look for. Matching is plain case-insensitive substring
//! containment against the file path, the full source and the issue's
//! matched text. The first matching rule drops the issue.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{InconsistencyIssue, IssueCategory};

/// Minimum reality score for a file to count as real
pub const REALITY_THRESHOLD: f64 = 0.95;

/// Whitelist entry marking an issue category as intentional in some context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRule {
    pub category: IssueCategory,
    pub indicators: Vec<String>,
    pub justification: String,
}

impl ContextRule {
    pub fn new(category: IssueCategory, indicators: &[&str], justification: &str) -> Self {
        Self {
            category,
            indicators: indicators.iter().map(|s| s.to_string()).collect(),
            justification: justification.to_string(),
        }
    }

    /// Indicators are compared lowercased; the haystacks must already be lowercase
    fn matches(&self, haystacks: &[&str]) -> Option<&str> {
        self.indicators.iter().map(String::as_str).find(|indicator| {
            let needle = indicator.to_lowercase();
            !needle.is_empty() && haystacks.iter().any(|h| h.contains(&needle))
        })
    }
}

const TEST_FIXTURE_INDICATORS: &[&str] = &["tests/", "conftest.py", "@pytest.fixture", "fixtures/"];
const HONEYPOT_INDICATORS: &[&str] = &["honeypot", "canary_token", "decoy_credentials"];

fn builtin_rules() -> Vec<ContextRule> {
    vec![
        ContextRule::new(
            IssueCategory::VariableNameMismatch,
            &["DEPRECATED_NAMES", "deprecated_to_canonical", "naming_migrations"],
            "Pattern-definition code lists deprecated names on purpose",
        ),
        ContextRule::new(
            IssueCategory::VariableNameMismatch,
            HONEYPOT_INDICATORS,
            "Security honeypots expose legacy secret names as bait",
        ),
        ContextRule::new(
            IssueCategory::ConfigTypeMismatch,
            HONEYPOT_INDICATORS,
            "Honeypot settings mimic misconfigured secrets",
        ),
        ContextRule::new(
            IssueCategory::VariableNameMismatch,
            TEST_FIXTURE_INDICATORS,
            "Test fixtures exercise legacy names to cover migration paths",
        ),
        ContextRule::new(
            IssueCategory::ConfigTypeMismatch,
            TEST_FIXTURE_INDICATORS,
            "Test settings are built programmatically",
        ),
        ContextRule::new(
            IssueCategory::ErrorHandlingMissing,
            TEST_FIXTURE_INDICATORS,
            "Test helpers let failures propagate to the test runner",
        ),
        ContextRule::new(
            IssueCategory::FunctionSignatureMismatch,
            TEST_FIXTURE_INDICATORS,
            "Test helpers may stay synchronous",
        ),
        ContextRule::new(
            IssueCategory::ApiEndpointShape,
            TEST_FIXTURE_INDICATORS,
            "Test apps register throwaway routes",
        ),
        ContextRule::new(
            IssueCategory::NamingConvention,
            &["import unittest", "from unittest", "TestCase)"],
            "unittest hooks are camelCase by framework contract",
        ),
    ]
}

/// Ordered list of context rules
#[derive(Debug, Clone)]
pub struct ContextFilter {
    rules: Vec<ContextRule>,
}

impl Default for ContextFilter {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ContextFilter {
    pub fn builtin() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    pub fn from_rules(rules: Vec<ContextRule>) -> Self {
        Self { rules }
    }

    /// A new filter with `extra` evaluated after the current rules
    pub fn with_rules(&self, extra: Vec<ContextRule>) -> Self {
        let mut rules = self.rules.clone();
        rules.extend(extra);
        Self { rules }
    }

    pub fn rules(&self) -> &[ContextRule] {
        &self.rules
    }

    /// Split issues into the ones to keep and a count of the ones suppressed
    pub fn filter(
        &self,
        issues: Vec<InconsistencyIssue>,
        source: &str,
        path: &str,
    ) -> (Vec<InconsistencyIssue>, usize) {
        if issues.is_empty() {
            return (issues, 0);
        }
        let path_lower = path.to_lowercase();
        let source_lower = source.to_lowercase();

        let before = issues.len();
        let kept: Vec<InconsistencyIssue> = issues
            .into_iter()
            .filter(|issue| match self.suppressing_rule(issue, &path_lower, &source_lower) {
                Some((rule, indicator)) => {
                    debug!(
                        "Suppressed {} at {}:{} ({} via `{}`)",
                        issue.category, issue.file_path, issue.line_number, rule.justification, indicator
                    );
                    false
                }
                None => true,
            })
            .collect();

        let suppressed = before - kept.len();
        (kept, suppressed)
    }

    fn suppressing_rule<'a>(
        &'a self,
        issue: &InconsistencyIssue,
        path_lower: &str,
        source_lower: &str,
    ) -> Option<(&'a ContextRule, &'a str)> {
        let actual_lower = issue.actual.to_lowercase();
        let haystacks = [path_lower, source_lower, actual_lower.as_str()];
        self.rules
            .iter()
            .filter(|rule| rule.category == issue.category)
            .find_map(|rule| rule.matches(&haystacks).map(|indicator| (rule, indicator)))
    }
}

/// `1.0 - Σ severity penalty` over the kept issues, clamped to [0, 1]
pub fn reality_score(issues: &[InconsistencyIssue]) -> f64 {
    let penalty: f64 = issues.iter().map(|i| i.severity.penalty()).sum();
    (1.0 - penalty).clamp(0.0, 1.0)
}

pub fn is_real(score: f64) -> bool {
    // Tolerate float error at exactly one High issue (1.0 - 0.05)
    score + 1e-9 >= REALITY_THRESHOLD
}
