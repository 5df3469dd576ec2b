//! Rule catalog
//!
//! The immutable, versioned set of consistency rules. Naming rules are data:
//! each carries the deprecated name as its match pattern and the canonical
//! name as its auto-fix. The remaining rules describe the structural checks and
//! share their patterns with the detectors that implement them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::detectors::{api_shape, config_typing, convention, db_fields, imports, signature};
use crate::error::{ConsistencyError, ConsistencyResult};
use crate::models::{IssueCategory, Severity};

/// Version of the built-in catalog. Bump when rules are added or changed.
pub const CATALOG_VERSION: &str = "2024.3";

/// Built-in deprecated -> canonical identifier table
const BUILTIN_RENAMES: &[(&str, &str, Severity)] = &[
    ("JWT_SECRET_KEY", "JWT_SECRET", Severity::Critical),
    ("DB_URL", "DATABASE_URL", Severity::High),
    ("REDIS_URI", "REDIS_URL", Severity::High),
    ("SECRET_TOKEN", "SECRET_KEY", Severity::High),
    ("userId", "user_id", Severity::Medium),
    ("created_date", "created_at", Severity::Low),
    ("updated_date", "updated_at", Severity::Low),
];

/// A named pattern describing undesirable code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyRule {
    pub name: String,
    pub description: String,
    pub match_pattern: String,
    pub severity: Severity,
    pub category: IssueCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_fix_pattern: Option<String>,
}

impl ConsistencyRule {
    /// A deprecated -> canonical rename rule
    pub fn rename(deprecated: &str, canonical: &str, severity: Severity) -> Self {
        Self {
            name: format!("rename-{}", deprecated),
            description: format!("`{}` is deprecated, use `{}`", deprecated, canonical),
            match_pattern: format!(r"\b{}\b", regex::escape(deprecated)),
            severity,
            category: IssueCategory::VariableNameMismatch,
            auto_fix_pattern: Some(canonical.to_string()),
        }
    }

    fn structural(
        name: &str,
        description: &str,
        match_pattern: &str,
        severity: Severity,
        category: IssueCategory,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            match_pattern: match_pattern.to_string(),
            severity,
            category,
            auto_fix_pattern: None,
        }
    }
}

/// A rule together with its compiled pattern
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: ConsistencyRule,
    pub regex: Regex,
}

/// Versioned, read-only collection of rules
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    version: String,
    rules: Vec<CompiledRule>,
}

impl RuleCatalog {
    /// The built-in catalog
    pub fn builtin() -> Self {
        let mut rules: Vec<ConsistencyRule> = BUILTIN_RENAMES
            .iter()
            .map(|(deprecated, canonical, severity)| {
                ConsistencyRule::rename(deprecated, canonical, *severity)
            })
            .collect();

        rules.extend([
            ConsistencyRule::structural(
                "import-order",
                "Imports are grouped standard library, then third-party, then local",
                imports::IMPORT_LINE_PATTERN,
                Severity::Low,
                IssueCategory::ImportOrder,
            ),
            ConsistencyRule::structural(
                "crud-signature-async",
                "Data-mutating and fetching functions are declared async",
                signature::CRUD_PREFIX_PATTERN,
                Severity::Medium,
                IssueCategory::FunctionSignatureMismatch,
            ),
            ConsistencyRule::structural(
                "crud-error-handling",
                "Data-mutating and fetching functions handle errors with try/except",
                signature::CRUD_PREFIX_PATTERN,
                Severity::High,
                IssueCategory::ErrorHandlingMissing,
            ),
            ConsistencyRule::structural(
                "api-get-collection-route",
                "GET routes address a sub-resource path, not a bare top-level segment",
                api_shape::ROUTE_PATTERN,
                Severity::Medium,
                IssueCategory::ApiEndpointShape,
            ),
            ConsistencyRule::structural(
                "config-sensitive-typing",
                "Secrets, keys, tokens and passwords in settings are typed as strings",
                config_typing::CONFIG_ANNOTATION_PATTERN,
                Severity::High,
                IssueCategory::ConfigTypeMismatch,
            ),
            ConsistencyRule::structural(
                "db-field-snake-case",
                "Database model fields use snake_case",
                db_fields::FIELD_DECLARATION_PATTERN,
                Severity::Medium,
                IssueCategory::DatabaseFieldNaming,
            ),
            ConsistencyRule::structural(
                "function-snake-case",
                "Functions use snake_case names",
                convention::SNAKE_CASE_PATTERN,
                Severity::Low,
                IssueCategory::NamingConvention,
            ),
            ConsistencyRule::structural(
                "class-pascal-case",
                "Classes use PascalCase names",
                convention::PASCAL_CASE_PATTERN,
                Severity::Low,
                IssueCategory::NamingConvention,
            ),
            ConsistencyRule::structural(
                "syntax-valid",
                "Source parses without syntax errors",
                r"^",
                Severity::Critical,
                IssueCategory::SyntaxError,
            ),
        ]);

        Self::from_rules(CATALOG_VERSION, rules).expect("valid built-in catalog")
    }

    /// Compile a catalog, rejecting duplicate names and invalid patterns
    pub fn from_rules(version: &str, rules: Vec<ConsistencyRule>) -> ConsistencyResult<Self> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            if !seen.insert(rule.name.clone()) {
                return Err(ConsistencyError::config(format!(
                    "duplicate rule name '{}'",
                    rule.name
                )));
            }
            let regex = Regex::new(&rule.match_pattern).map_err(|e| {
                ConsistencyError::config(format!("rule '{}' has an invalid pattern: {}", rule.name, e))
            })?;
            compiled.push(CompiledRule { rule, regex });
        }
        Ok(Self {
            version: version.to_string(),
            rules: compiled,
        })
    }

    /// A new catalog with `extra` appended; the version gets a `+custom` suffix
    pub fn with_rules(&self, extra: Vec<ConsistencyRule>) -> ConsistencyResult<Self> {
        if extra.is_empty() {
            return Ok(self.clone());
        }
        let mut rules: Vec<ConsistencyRule> = self.rules.iter().map(|c| c.rule.clone()).collect();
        rules.extend(extra);
        Self::from_rules(&format!("{}+custom", self.version), rules)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> impl Iterator<Item = &ConsistencyRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ConsistencyRule> {
        self.rules.iter().find(|c| c.rule.name == name).map(|c| &c.rule)
    }

    /// Rules that carry a deterministic rename
    pub fn naming_rules(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().filter(|c| {
            c.rule.category == IssueCategory::VariableNameMismatch && c.rule.auto_fix_pattern.is_some()
        })
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
