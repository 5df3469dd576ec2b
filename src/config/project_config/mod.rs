//! Project-level configuration support
//!
//! Loads per-project configuration from `sentinel.toml` or `.sentinelrc.json`
//! in the repository root.
//!
//! # Configuration Format
//!
//! ```toml
//! # sentinel.toml
//!
//! [monitor]
//! interval_secs = 30
//! backoff_secs = 5
//! metric_retention_hours = 24
//! alert_retention_hours = 24
//! dedupe_breach_alerts = false
//!
//! [thresholds]
//! naming = 100
//! api = 95
//!
//! [naming]
//! renames = [{ deprecated = "AUTH_TOKEN_KEY", canonical = "AUTH_TOKEN", severity = "high" }]
//!
//! [imports]
//! first_party = ["app"]
//!
//! [[context]]
//! category = "CONFIG_TYPE_MISMATCH"
//! indicators = ["legacy_settings"]
//! justification = "Legacy settings module kept for compatibility"
//!
//! [exclude]
//! paths = ["migrations/"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::context::ContextRule;
use crate::error::{ConsistencyError, ConsistencyResult};
use crate::models::{CheckCategory, Severity};
use crate::monitor::metrics::{MetricPolicy, Thresholds};
use crate::rules::ConsistencyRule;

pub const CONFIG_TOML: &str = "sentinel.toml";
pub const CONFIG_JSON: &str = ".sentinelrc.json";

/// Built-in default exclusion patterns for virtualenvs and build output.
/// These are applied automatically unless `skip_defaults = true` in config.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "**/.venv/**",
    "**/venv/**",
    "**/site-packages/**",
    "**/__pycache__/**",
    "**/node_modules/**",
    "**/build/**",
    "**/dist/**",
];

/// Engine configuration loaded from sentinel.toml or similar
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Per-category threshold overrides, keyed by check category name
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,

    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub imports: ImportsConfig,

    /// Context rules evaluated after the built-in ones
    #[serde(default)]
    pub context: Vec<ContextRule>,

    #[serde(default)]
    pub exclude: ExcludeConfig,
}

/// Monitoring loop and retention settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Wait after a failed cycle
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    #[serde(default = "default_retention_hours")]
    pub metric_retention_hours: u64,

    /// Resolved alerts older than this are pruned; unresolved ones never are
    #[serde(default = "default_retention_hours")]
    pub alert_retention_hours: u64,

    /// Suppress repeat breach alerts while an unresolved one exists for the category
    #[serde(default)]
    pub dedupe_breach_alerts: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            backoff_secs: default_backoff_secs(),
            metric_retention_hours: default_retention_hours(),
            alert_retention_hours: default_retention_hours(),
            dedupe_breach_alerts: false,
        }
    }
}

fn default_interval_secs() -> u64 {
    30
}
fn default_backoff_secs() -> u64 {
    5
}
fn default_retention_hours() -> u64 {
    24
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

/// Extra deprecated -> canonical name pairs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamingConfig {
    #[serde(default)]
    pub renames: Vec<RenameEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameEntry {
    pub deprecated: String,
    pub canonical: String,
    #[serde(default = "default_rename_severity")]
    pub severity: Severity,
}

fn default_rename_severity() -> Severity {
    Severity::Medium
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportsConfig {
    /// Top-level packages that count as local imports
    #[serde(default)]
    pub first_party: Vec<String>,
}

/// Path exclusion configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeConfig {
    /// Paths/patterns to exclude from monitoring
    #[serde(default)]
    pub paths: Vec<String>,

    /// If true, disable built-in default exclusion patterns
    #[serde(default)]
    pub skip_defaults: bool,
}

impl ExcludeConfig {
    /// Returns effective exclusion patterns (defaults + user patterns).
    /// If `skip_defaults` is true, only user patterns are returned.
    pub fn effective_patterns(&self) -> Vec<String> {
        let mut patterns = Vec::new();

        if !self.skip_defaults {
            patterns.extend(DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()));
        }

        for p in &self.paths {
            if !patterns.contains(p) {
                patterns.push(p.clone());
            }
        }

        patterns
    }
}

/// Load engine configuration from the repository root.
///
/// Tries `sentinel.toml`, then `.sentinelrc.json`. A file that fails to parse
/// is logged and skipped; with no usable file the defaults apply.
pub fn load_engine_config(repo_path: &Path) -> EngineConfig {
    let toml_path = repo_path.join(CONFIG_TOML);
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded engine config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    let json_path = repo_path.join(CONFIG_JSON);
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded engine config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    debug!("No engine config found, using defaults");
    EngineConfig::default()
}

fn load_toml_config(path: &Path) -> ConsistencyResult<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConsistencyError::config(e.to_string()))
}

fn load_json_config(path: &Path) -> ConsistencyResult<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| ConsistencyError::config(e.to_string()))
}

impl EngineConfig {
    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> ConsistencyResult<()> {
        self.thresholds()?;
        let m = &self.monitor;
        if m.interval_secs == 0 {
            return Err(ConsistencyError::config("monitor.interval_secs must be > 0"));
        }
        if m.backoff_secs == 0 {
            return Err(ConsistencyError::config("monitor.backoff_secs must be > 0"));
        }
        if m.metric_retention_hours == 0 || m.alert_retention_hours == 0 {
            return Err(ConsistencyError::config("retention windows must be > 0 hours"));
        }
        for rename in &self.naming.renames {
            if rename.deprecated.trim().is_empty() || rename.canonical.trim().is_empty() {
                return Err(ConsistencyError::config("naming.renames entries need both names"));
            }
            if rename.deprecated == rename.canonical {
                return Err(ConsistencyError::config(format!(
                    "naming rename '{}' maps to itself",
                    rename.deprecated
                )));
            }
        }
        for rule in &self.context {
            if rule.indicators.iter().all(|i| i.trim().is_empty()) {
                return Err(ConsistencyError::config(format!(
                    "context rule for {} has no indicators",
                    rule.category
                )));
            }
        }
        Ok(())
    }

    /// Default thresholds with the configured overrides applied
    pub fn thresholds(&self) -> ConsistencyResult<Thresholds> {
        let mut thresholds: Thresholds = CheckCategory::ALL
            .iter()
            .map(|c| (*c, c.default_threshold()))
            .collect();
        for (name, value) in &self.thresholds {
            let category: CheckCategory = name.parse().map_err(|e: String| ConsistencyError::config(e))?;
            if !(0.0..=100.0).contains(value) {
                return Err(ConsistencyError::config(format!(
                    "threshold for {} must be within [0, 100], got {}",
                    category, value
                )));
            }
            thresholds.insert(category, *value);
        }
        Ok(thresholds)
    }

    pub fn metric_policy(&self) -> ConsistencyResult<MetricPolicy> {
        Ok(MetricPolicy {
            thresholds: self.thresholds()?,
            metric_retention: chrono::Duration::hours(self.monitor.metric_retention_hours as i64),
            alert_retention: chrono::Duration::hours(self.monitor.alert_retention_hours as i64),
            dedupe_breach_alerts: self.monitor.dedupe_breach_alerts,
        })
    }

    /// Configured renames as catalog rules
    pub fn extra_rules(&self) -> Vec<ConsistencyRule> {
        self.naming
            .renames
            .iter()
            .map(|r| ConsistencyRule::rename(&r.deprecated, &r.canonical, r.severity))
            .collect()
    }

    /// Check if a repository-relative path should be excluded
    pub fn should_exclude(&self, path: &str) -> bool {
        self.exclude
            .effective_patterns()
            .iter()
            .any(|pattern| glob_match(pattern, path))
    }
}

/// Simple glob pattern matching
pub fn glob_match(pattern: &str, path: &str) -> bool {
    // Handle **/X/** patterns (match if path contains X as a directory)
    if pattern.starts_with("**/") && pattern.ends_with("/**") {
        let middle = pattern.trim_start_matches("**/").trim_end_matches("/**");
        return path.contains(&format!("/{}/", middle)) || path.starts_with(&format!("{}/", middle));
    }

    // Handle ** (match any path segments)
    if let Some((prefix, suffix)) = pattern.split_once("**") {
        let prefix = prefix.trim_end_matches('/');
        let suffix = suffix.trim_start_matches('/');

        if !prefix.is_empty() && !path.starts_with(prefix) {
            return false;
        }
        return match suffix.split_once('*') {
            None => suffix.is_empty() || path.ends_with(suffix),
            Some((before, after)) => path.contains(before) && path.ends_with(after),
        };
    }

    // Handle single * (match within segment)
    if let Some((prefix, suffix)) = pattern.split_once('*') {
        return path.starts_with(prefix) && path.ends_with(suffix);
    }

    // "migrations/" only matches "migrations/0001.py", NOT "app/migrations/0001.py"
    // Use "**/migrations/**" for recursive matching
    path.starts_with(pattern)
}
