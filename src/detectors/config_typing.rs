//! Config Typing Detector
//!
//! Settings classes annotate values as `NAME: type`. Sensitive names (secrets,
//! keys, tokens, passwords, credentials) must be typed as strings so they are
//! never coerced into numbers or booleans on load.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::detectors::base::{Detector, SourceUnit};
use crate::models::{InconsistencyIssue, IssueCategory, Severity};

pub const CONFIG_ANNOTATION_PATTERN: &str =
    r"^\s*(?P<name>[A-Z][A-Z0-9_]*)\s*:\s*(?P<type>[^=#\n]+?)\s*(?:=|#|$)";

const SENSITIVE_PARTS: &[&str] = &[
    "SECRET",
    "KEY",
    "APIKEY",
    "TOKEN",
    "PASSWORD",
    "PASSWD",
    "CREDENTIAL",
    "CREDENTIALS",
];

const STRING_TYPES: &[&str] = &[
    "str",
    "SecretStr",
    "pydantic.SecretStr",
    "Optional[str]",
    "typing.Optional[str]",
    "Optional[SecretStr]",
    "str|None",
    "None|str",
    "SecretStr|None",
];

static CONFIG_ANNOTATION: OnceLock<Regex> = OnceLock::new();

fn config_annotation() -> &'static Regex {
    CONFIG_ANNOTATION.get_or_init(|| Regex::new(CONFIG_ANNOTATION_PATTERN).expect("valid regex"))
}

pub struct ConfigTypingDetector;

impl ConfigTypingDetector {
    pub fn new() -> Self {
        Self
    }

    fn is_sensitive(name: &str) -> bool {
        name.split('_').any(|part| SENSITIVE_PARTS.contains(&part))
    }

    fn is_string_type(annotation: &str) -> bool {
        let compact: String = annotation.chars().filter(|c| !c.is_whitespace()).collect();
        STRING_TYPES.contains(&compact.as_str())
    }
}

impl Default for ConfigTypingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for ConfigTypingDetector {
    fn name(&self) -> &'static str {
        "config-typing"
    }

    fn description(&self) -> &'static str {
        "Detects sensitive settings typed as something other than a string"
    }

    fn categories(&self) -> &'static [IssueCategory] {
        &[IssueCategory::ConfigTypeMismatch]
    }

    fn detect(&self, unit: &SourceUnit) -> Vec<InconsistencyIssue> {
        let mut issues = Vec::new();

        for (i, line) in unit.lines().iter().enumerate() {
            let line_number = i as u32 + 1;
            let Some(caps) = config_annotation().captures(line) else {
                continue;
            };
            let name = &caps["name"];
            let annotation = caps["type"].trim();
            if !Self::is_sensitive(name) || Self::is_string_type(annotation) {
                continue;
            }
            if unit.is_line_suppressed(line_number) {
                continue;
            }

            issues.push(
                InconsistencyIssue::new(
                    IssueCategory::ConfigTypeMismatch,
                    Severity::High,
                    unit.path,
                    line_number,
                    format!("{}: {}", name, annotation),
                    format!("{}: str", name),
                )
                .with_description(format!(
                    "Sensitive setting `{}` is typed `{}` instead of a string",
                    name, annotation
                ))
                .with_suggested_fix(format!(
                    "Annotate `{}` as `str` (or `SecretStr`) and parse it where it is used",
                    name
                )),
            );
        }

        debug!("ConfigTypingDetector found {} issues in {}", issues.len(), unit.path);
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(source: &str) -> Vec<InconsistencyIssue> {
        ConfigTypingDetector::new().detect(&SourceUnit::new(source, "settings.py"))
    }

    #[test]
    fn test_flags_sensitive_non_string() {
        let source = "class Settings(BaseSettings):\n    API_KEY: int = 0\n    DEBUG: bool = False\n";
        let issues = detect(source);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line_number, 2);
        assert_eq!(issues[0].actual, "API_KEY: int");
        assert_eq!(issues[0].severity, Severity::High);
        assert!(!issues[0].auto_fixable);
    }

    #[test]
    fn test_string_types_pass() {
        let source = "JWT_SECRET: str\nDB_PASSWORD: SecretStr = ''\nAUTH_TOKEN: Optional[str] = None\nREFRESH_TOKEN: str | None = None\n";
        assert!(detect(source).is_empty(), "{:?}", detect(source));
    }

    #[test]
    fn test_sensitive_match_is_by_word() {
        // MONKEY is not KEY
        assert!(detect("MONKEY_COUNT: int = 3\n").is_empty());
        assert_eq!(detect("SECRET_KEY: bytes = b''\n").len(), 1);
    }
}
