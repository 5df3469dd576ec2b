//! Library API tests
//!
//! Drive the public engine and monitor the way an embedding application
//! would: construct once, share by reference, inspect the reports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use consistency_sentinel::config::EngineConfig;
use consistency_sentinel::context::ContextRule;
use consistency_sentinel::models::{CheckCategory, IssueCategory, Severity};
use consistency_sentinel::monitor::metrics::AlertSeverity;
use consistency_sentinel::monitor::sources::MockSourceProvider;
use consistency_sentinel::{ConsistencyEngine, ConsistencyMonitor};

const MESSY: &str = r#"import app.models
import requests
import os

DB_URL = "postgres://localhost/db"
API_SECRET_KEY: int = 5


class User(Base):
    userName = Column(String)


def create_user(data):
    return data
"#;

#[test]
fn test_zero_issues_scores_full() {
    let engine = ConsistencyEngine::default();
    let report = engine.validate("import os\n\n\ndef helper():\n    return os.sep\n", "app/util.py");
    assert_eq!(report.total_issues, 0, "{:?}", report.remaining_issues);
    assert_eq!(report.consistency_score, 100.0);
    assert!(report.is_consistent);
}

#[test]
fn test_jwt_secret_scenario() {
    let engine = ConsistencyEngine::default();
    let source = "JWT_SECRET_KEY = \"x\"\n";
    let issues = engine.detect(source, "app/settings.py");
    assert_eq!(issues.len(), 1, "{:?}", issues);
    assert_eq!(issues[0].category, IssueCategory::VariableNameMismatch);
    assert_eq!(issues[0].severity, Severity::Critical);
    assert!(issues[0].auto_fixable);

    let (fixed, remaining) = engine.auto_fix(source, &issues);
    assert!(fixed.contains("JWT_SECRET = \"x\""), "{}", fixed);
    assert!(remaining
        .iter()
        .all(|i| i.category != IssueCategory::VariableNameMismatch));
    assert!(engine.detect(&fixed, "app/settings.py").is_empty());
}

#[test]
fn test_unguarded_crud_scenario() {
    let engine = ConsistencyEngine::default();
    let issues = engine.detect("def create_user(data):\n    return data\n", "app/users.py");
    let high: Vec<_> = issues.iter().filter(|i| i.severity == Severity::High).collect();
    assert_eq!(high.len(), 1, "{:?}", issues);
    assert_eq!(high[0].line_number, 1);
    assert!(!high[0].auto_fixable);
}

#[test]
fn test_fix_reaches_fixed_point() {
    let engine = ConsistencyEngine::default();
    let first = engine.validate(MESSY, "app/models.py");
    assert!(first.fixed_issues > 0, "{:?}", first);

    let second = engine.validate(&first.fixed_source, "app/models.py");
    assert_eq!(second.fixed_source, first.fixed_source);
    let fixable = [
        IssueCategory::VariableNameMismatch,
        IssueCategory::ImportOrder,
        IssueCategory::DatabaseFieldNaming,
    ];
    assert!(second
        .remaining_issues
        .iter()
        .all(|i| !fixable.contains(&i.category)), "{:?}", second.remaining_issues);
}

#[test]
fn test_unfixable_issues_are_kept() {
    let engine = ConsistencyEngine::default();
    let scan = engine.scan_file(MESSY, "app/models.py");
    let report = engine.validate(MESSY, "app/models.py");

    for issue in scan.kept.iter().filter(|i| !i.auto_fixable) {
        assert!(
            report.remaining_issues.iter().any(|r| r.id == issue.id),
            "{:?} was dropped",
            issue
        );
    }
    assert_eq!(report.total_issues, report.fixed_issues + report.remaining_issues.len());
    assert!(!report.can_deliver);
}

#[test]
fn test_context_never_adds_or_recategorises() {
    let engine = ConsistencyEngine::default();
    for path in ["app/models.py", "tests/test_models.py", "tests/conftest.py"] {
        let raw = engine.detect(MESSY, path);
        let scan = engine.scan_file(MESSY, path);
        assert!(scan.kept.len() <= raw.len());
        assert_eq!(scan.kept.len() + scan.suppressed, raw.len());
        for kept in &scan.kept {
            let original = raw.iter().find(|r| r.id == kept.id).expect("kept issue came from detection");
            assert_eq!(original.category, kept.category);
        }
    }
}

#[test]
fn test_configured_context_rule_suppresses() {
    let mut config = EngineConfig::default();
    config.context.push(ContextRule::new(
        IssueCategory::ConfigTypeMismatch,
        &["legacy_settings"],
        "Legacy settings module",
    ));
    let engine = ConsistencyEngine::new(config).unwrap();
    let source = "# legacy_settings\nAPI_SECRET_KEY: int = 5\n";
    let report = engine.check_with_context(source, "app/settings.py");
    assert!(report
        .hallucinations
        .iter()
        .all(|i| i.category != IssueCategory::ConfigTypeMismatch));
    assert!(report.suppressed_count >= 1);
}

#[test]
fn test_inline_ignore_comment() {
    let engine = ConsistencyEngine::default();
    let issues = engine.detect("JWT_SECRET_KEY = 'x'  # sentinel: ignore\n", "app/settings.py");
    assert!(issues.is_empty(), "{:?}", issues);
}

#[test]
fn test_syntax_error_is_one_critical_issue() {
    let engine = ConsistencyEngine::default();
    let report = engine.validate("def broken(:\n    pass\n", "app/broken.py");
    let syntax: Vec<_> = report
        .remaining_issues
        .iter()
        .filter(|i| i.category == IssueCategory::SyntaxError)
        .collect();
    assert_eq!(syntax.len(), 1);
    assert_eq!(syntax[0].severity, Severity::Critical);
    assert!(!report.can_deliver);
}

#[test]
fn test_metric_breach_every_cycle() {
    let mut files: Vec<(String, &str)> = (0..23).map(|i| (format!("app/m{}.py", i), "VALUE = 1\n")).collect();
    let route = "@app.get(\"/users\")\nasync def list_users():\n    return []\n";
    files.push(("app/routes_a.py".into(), route));
    files.push(("app/routes_b.py".into(), route));
    let provider = MockSourceProvider::new(files.iter().map(|(p, b)| (p.as_str(), *b)).collect());
    let monitor = ConsistencyMonitor::new(Arc::new(ConsistencyEngine::default()), Arc::new(provider));

    for cycle in 1..=2 {
        let report = monitor.run_cycle().unwrap();
        assert_eq!(report.scores[&CheckCategory::Api], 92.0);
        let api: Vec<_> = report
            .new_alerts
            .iter()
            .filter(|a| a.category == CheckCategory::Api)
            .collect();
        assert_eq!(api.len(), 1, "cycle {}", cycle);
        assert_eq!(api[0].severity, AlertSeverity::Warning);
    }
    assert_eq!(monitor.get_status().total_alerts, 2);

    let dashboard = monitor.get_dashboard();
    assert_eq!(dashboard.per_category_scores[&CheckCategory::Api], 92.0);
    assert_eq!(dashboard.recent_alerts.len(), 2);
    assert!(dashboard.recent_alerts[0].timestamp >= dashboard.recent_alerts[1].timestamp);
}

#[test]
fn test_resolve_alert_through_monitor() {
    let provider = MockSourceProvider::new(vec![("app/settings.py", "JWT_SECRET_KEY = 'x'\n")]);
    let monitor = ConsistencyMonitor::new(Arc::new(ConsistencyEngine::default()), Arc::new(provider));
    let report = monitor.run_cycle().unwrap();
    let critical = report
        .new_alerts
        .iter()
        .find(|a| a.severity == AlertSeverity::Critical)
        .expect("detection alert");

    assert!(monitor.resolve_alert(&critical.id, "renamed"));
    assert!(!monitor.resolve_alert(&critical.id, "renamed again"));
    let status = monitor.get_status();
    assert_eq!(status.unresolved_alerts, status.total_alerts - 1);
}

#[tokio::test]
async fn test_start_twice_runs_one_loop() {
    let provider = MockSourceProvider::new(vec![("a.py", "VALUE = 1\n")]);
    let monitor = ConsistencyMonitor::with_timing(
        Arc::new(ConsistencyEngine::default()),
        Arc::new(provider),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    );
    let alerts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&alerts);
    monitor.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    assert!(monitor.start());
    assert!(!monitor.start());
    assert!(monitor.get_status().is_monitoring);

    // One loop means exactly one cycle before the hour-long wait
    for _ in 0..500 {
        if monitor.get_status().cycles_completed >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(monitor.get_status().cycles_completed, 1);
    assert_eq!(alerts.load(Ordering::SeqCst), 0);

    // stop() interrupts the wait instead of sitting out the interval
    let stopped = tokio::time::timeout(Duration::from_secs(5), monitor.stop()).await;
    assert_eq!(stopped.ok(), Some(true));
    assert!(!monitor.get_status().is_monitoring);
    assert!(!monitor.stop().await);
}
