//! The consistency engine
//!
//! One explicitly constructed object that owns the rule catalog, the
//! detectors, the context filter, the fix pipeline and the metric store.
//! Callers share it by reference (or `Arc`); there is no global instance.
//!
//! ```text
//!   source ──► detect ──► context filter ──► fix pipeline ──► report
//!                │                                   │
//!                └──────── MetricStore (history) ◄───┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::context::{self, ContextFilter};
use crate::detectors::{default_detectors, DetectorEngine, DetectorOptions, SourceUnit};
use crate::error::ConsistencyResult;
use crate::fixes::{FixOutcome, FixPipeline};
use crate::models::{ContextReport, InconsistencyIssue, IssueCategory, SeverityCounts, ValidationReport};
use crate::monitor::metrics::{MetricPolicy, MetricStore, ScanRecord};
use crate::reporting::{self, Dashboard};
use crate::rules::RuleCatalog;

/// Issues found in one file after context suppression
#[derive(Debug, Clone, Default)]
pub struct FileScan {
    pub kept: Vec<InconsistencyIssue>,
    pub suppressed: usize,
}

pub struct ConsistencyEngine {
    config: EngineConfig,
    catalog: Arc<RuleCatalog>,
    detectors: DetectorEngine,
    context: ContextFilter,
    fixer: FixPipeline,
    store: Mutex<MetricStore>,
}

impl ConsistencyEngine {
    /// Build an engine from validated configuration
    pub fn new(config: EngineConfig) -> ConsistencyResult<Self> {
        config.validate()?;
        let catalog = RuleCatalog::builtin().with_rules(config.extra_rules())?;
        let policy = config.metric_policy()?;
        Ok(Self::assemble(config, catalog, policy))
    }

    fn assemble(config: EngineConfig, catalog: RuleCatalog, policy: MetricPolicy) -> Self {
        let options = DetectorOptions {
            first_party: config.imports.first_party.clone(),
        };
        let mut detectors = DetectorEngine::new();
        detectors.register_all(default_detectors(&catalog, &options));

        let context = ContextFilter::builtin().with_rules(config.context.clone());
        let fixer = FixPipeline::new(config.imports.first_party.clone());

        info!(
            "Consistency engine ready: catalog {} ({} rules), {} detectors, {} context rules",
            catalog.version(),
            catalog.len(),
            detectors.detector_count(),
            context.rules().len()
        );

        Self {
            config,
            catalog: Arc::new(catalog),
            detectors,
            context,
            fixer,
            store: Mutex::new(MetricStore::new(policy)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<RuleCatalog> {
        &self.catalog
    }

    pub fn context_filter(&self) -> &ContextFilter {
        &self.context
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.detector_names()
    }

    /// Lock the metric store. A poisoned lock is recovered: the store only
    /// holds append-only lists, so a panic mid-append leaves it usable.
    pub fn store(&self) -> MutexGuard<'_, MetricStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raw detector output, before context suppression
    pub fn detect(&self, source: &str, path: &str) -> Vec<InconsistencyIssue> {
        self.detectors.run(&SourceUnit::new(source, path))
    }

    /// Detect and apply context suppression
    pub fn scan_file(&self, source: &str, path: &str) -> FileScan {
        let issues = self.detect(source, path);
        let (kept, suppressed) = self.context.filter(issues, source, path);
        FileScan { kept, suppressed }
    }

    pub fn apply_fixes(&self, source: &str, issues: &[InconsistencyIssue]) -> FixOutcome {
        self.fixer.apply_fixes(source, issues)
    }

    /// Fix what can be fixed; returns the new source and the issues left over
    pub fn auto_fix(&self, source: &str, issues: &[InconsistencyIssue]) -> (String, Vec<InconsistencyIssue>) {
        crate::fixes::auto_fix(&self.fixer, source, issues)
    }

    /// Detect, suppress, fix, and record the outcome in the scan history
    pub fn validate(&self, source: &str, path: &str) -> ValidationReport {
        let FileScan { kept, suppressed } = self.scan_file(source, path);
        let mut outcome = self.apply_fixes(source, &kept);

        // A rename can turn a name into something another detector flags
        let introduced = if outcome.fixed.is_empty() {
            Vec::new()
        } else {
            self.introduced_by_fixes(&kept, &outcome.fixed_source, path)
        };
        if !introduced.is_empty() {
            debug!("Fixes in {} introduced {} new issue(s)", path, introduced.len());
        }
        outcome.remaining.extend(introduced);
        let total = outcome.fixed.len() + outcome.remaining.len();

        let severity_counts = SeverityCounts::from_issues(&outcome.remaining);
        let deliverable = severity_counts.is_deliverable();
        let consistency_score = if total == 0 {
            100.0
        } else {
            outcome.fixed.len() as f64 / total as f64 * 100.0
        };

        debug!(
            "Validated {}: {} issues, {} fixed, {} suppressed, deliverable={}",
            path,
            total,
            outcome.fixed.len(),
            suppressed,
            deliverable
        );

        self.store().record_scan(ScanRecord {
            timestamp: Utc::now(),
            file_path: path.to_string(),
            total_issues: total,
            remaining_issues: outcome.remaining.len(),
            suppressed,
            can_deliver: deliverable,
        });

        ValidationReport {
            file_path: path.to_string(),
            is_consistent: deliverable,
            consistency_score,
            total_issues: total,
            fixed_issues: outcome.fixed.len(),
            suppressed_issues: suppressed,
            remaining_issues: outcome.remaining,
            fixed_source: outcome.fixed_source,
            can_deliver: deliverable,
            severity_counts,
        }
    }

    /// Issues in the fixed source with no counterpart before fixing. A counterpart
    /// has the same category and either the same offending text (regrouping
    /// shifts lines) or the same line (renames rewrite text in place).
    fn introduced_by_fixes(
        &self,
        before: &[InconsistencyIssue],
        fixed_source: &str,
        path: &str,
    ) -> Vec<InconsistencyIssue> {
        let mut unmatched: Vec<(IssueCategory, &str, u32)> = before
            .iter()
            .map(|i| (i.category, i.actual.as_str(), i.line_number))
            .collect();

        self.scan_file(fixed_source, path)
            .kept
            .into_iter()
            .filter(|issue| {
                let counterpart = unmatched.iter().position(|(category, actual, line)| {
                    *category == issue.category && (*actual == issue.actual || *line == issue.line_number)
                });
                match counterpart {
                    Some(pos) => {
                        unmatched.swap_remove(pos);
                        false
                    }
                    None => true,
                }
            })
            .collect()
    }

    /// Detect and suppress, then score what is left without fixing anything
    pub fn check_with_context(&self, source: &str, path: &str) -> ContextReport {
        let FileScan { kept, suppressed } = self.scan_file(source, path);
        let reality_score = context::reality_score(&kept);
        let is_real = context::is_real(reality_score);
        let severity_counts = SeverityCounts::from_issues(&kept);

        let summary = if kept.is_empty() {
            format!(
                "No genuine inconsistencies ({} suppressed as intentional)",
                suppressed
            )
        } else {
            format!(
                "{} genuine issue(s) ({} critical, {} high, {} medium, {} low), {} suppressed; reality score {:.2}{}",
                severity_counts.total,
                severity_counts.critical,
                severity_counts.high,
                severity_counts.medium,
                severity_counts.low,
                suppressed,
                reality_score,
                if is_real { "" } else { " is below 0.95" }
            )
        };

        ContextReport {
            file_path: path.to_string(),
            is_real,
            reality_score,
            hallucinations: kept,
            severity_counts,
            suppressed_count: suppressed,
            summary,
        }
    }

    /// Mark an alert resolved; false if unknown or already resolved
    pub fn resolve_alert(&self, id: &str, notes: &str) -> bool {
        self.store().resolve_alert(id, notes, Utc::now())
    }

    pub fn get_dashboard(&self) -> Dashboard {
        let store = self.store();
        reporting::build_dashboard(&store, &self.catalog, Utc::now())
    }
}

impl Default for ConsistencyEngine {
    fn default() -> Self {
        Self::assemble(EngineConfig::default(), RuleCatalog::builtin(), MetricPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenameEntry;
    use crate::error::ConsistencyError;
    use crate::models::Severity;

    #[test]
    fn test_clean_source_is_consistent() {
        let engine = ConsistencyEngine::default();
        let report = engine.validate("import os\n\nvalue = os.getcwd()\n", "app/util.py");
        assert!(report.is_consistent);
        assert!(report.can_deliver);
        assert_eq!(report.consistency_score, 100.0);
        assert_eq!(report.total_issues, 0);
    }

    #[test]
    fn test_validate_fixes_jwt_secret() {
        let engine = ConsistencyEngine::default();
        let report = engine.validate("JWT_SECRET_KEY = \"x\"\n", "app/settings.py");
        assert_eq!(report.total_issues, 1);
        assert_eq!(report.fixed_issues, 1);
        assert_eq!(report.consistency_score, 100.0);
        assert!(report.fixed_source.contains("JWT_SECRET = \"x\""));
        assert!(report.can_deliver);
        assert_eq!(engine.store().history().len(), 1);
    }

    #[test]
    fn test_validate_blocks_unguarded_crud() {
        let engine = ConsistencyEngine::default();
        let report = engine.validate("def create_user(data):\n    return data\n", "app/users.py");
        assert!(!report.can_deliver);
        assert!(!report.is_consistent);
        assert_eq!(report.fixed_issues, 0);
        assert_eq!(report.consistency_score, 0.0);
        assert_eq!(report.severity_counts.high, 1);
    }

    #[test]
    fn test_check_with_context_suppresses_fixtures() {
        let engine = ConsistencyEngine::default();
        let report = engine.check_with_context("JWT_SECRET_KEY = 'x'\n", "tests/conftest.py");
        assert!(report.is_real);
        assert_eq!(report.suppressed_count, 1);
        assert!(report.hallucinations.is_empty());

        let report = engine.check_with_context("JWT_SECRET_KEY = 'x'\n", "app/settings.py");
        assert!(!report.is_real);
        assert_eq!(report.severity_counts.critical, 1);
        assert!(report.summary.contains("below 0.95"), "{}", report.summary);
    }

    #[test]
    fn test_config_renames_extend_catalog() {
        let mut config = EngineConfig::default();
        config.naming.renames.push(RenameEntry {
            deprecated: "AUTH_TOKEN_KEY".into(),
            canonical: "AUTH_TOKEN".into(),
            severity: Severity::High,
        });
        let engine = ConsistencyEngine::new(config).unwrap();
        assert!(engine.catalog().version().ends_with("+custom"));
        let issues = engine.detect("AUTH_TOKEN_KEY = 1\n", "a.py");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, IssueCategory::VariableNameMismatch);
    }

    #[test]
    fn test_duplicate_rename_rejected() {
        let mut config = EngineConfig::default();
        config.naming.renames.push(RenameEntry {
            deprecated: "DB_URL".into(),
            canonical: "DSN".into(),
            severity: Severity::Low,
        });
        assert!(matches!(ConsistencyEngine::new(config), Err(ConsistencyError::Config { .. })));
    }

    #[test]
    fn test_rename_into_crud_name_blocks_delivery() {
        let engine = ConsistencyEngine::default();
        let report = engine.validate("def getUser(uid):\n    return uid\n", "app/users.py");
        assert_eq!(report.fixed_source, "def get_user(uid):\n    return uid\n");
        assert_eq!(report.fixed_issues, 1);
        assert!(report
            .remaining_issues
            .iter()
            .any(|i| i.category == IssueCategory::ErrorHandlingMissing && i.severity == Severity::High));
        assert!(!report.can_deliver);
        assert!(!report.is_consistent);
        assert_eq!(report.total_issues, report.fixed_issues + report.remaining_issues.len());
    }

    #[test]
    fn test_regrouped_issues_not_reported_twice() {
        let engine = ConsistencyEngine::default();
        let source = "import requests\nimport os\n\n\ndef create_user(data):\n    return data\n";
        let report = engine.validate(source, "app/users.py");
        let guards = report
            .remaining_issues
            .iter()
            .filter(|i| i.category == IssueCategory::ErrorHandlingMissing)
            .count();
        assert_eq!(guards, 1, "{:?}", report.remaining_issues);
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConsistencyEngine>();
    }
}
