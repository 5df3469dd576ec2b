//! Monitoring scheduler
//!
//! A `ConsistencyMonitor` periodically scans every file a `SourceProvider`
//! lists, records one metric per check category and raises alerts.
//!
//! # Lifecycle
//!
//! ```text
//!            start()                      stop().await
//! Stopped ────────────► Running ─────────────────────► Stopped
//!                        │   ▲
//!              run_cycle │   │ sleep(interval | backoff), or cancelled
//!                        ▼   │
//!                     spawn_blocking
//! ```
//!
//! Cancellation is only observed while waiting between cycles; a cycle that
//! has started always finishes.

pub mod metrics;
pub mod sources;

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde_json::json;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::{ConsistencyEngine, FileScan};
use crate::error::{panic_message, ConsistencyError, ConsistencyResult};
use crate::models::{CheckCategory, Severity};
use crate::reporting::{Dashboard, MonitorStatus};

use metrics::{ConsistencyAlert, ScanRecord};
use sources::SourceProvider;

/// Alert subscriber. Errors and panics are logged and never stop other subscribers.
pub type AlertCallback = Arc<dyn Fn(&ConsistencyAlert) -> anyhow::Result<()> + Send + Sync>;

/// Summary of one monitoring cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub files_scanned: usize,
    pub total_issues: usize,
    pub suppressed: usize,
    pub scores: BTreeMap<CheckCategory, f64>,
    pub new_alerts: Vec<ConsistencyAlert>,
    pub duration_ms: u64,
}

struct MonitorInner {
    engine: Arc<ConsistencyEngine>,
    provider: Arc<dyn SourceProvider>,
    subscribers: RwLock<Vec<AlertCallback>>,
    cycles_completed: AtomicU64,
    last_cycle_at: Mutex<Option<DateTime<Utc>>>,
    interval: Duration,
    backoff: Duration,
}

struct RunningTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct ConsistencyMonitor {
    inner: Arc<MonitorInner>,
    task: Mutex<Option<RunningTask>>,
}

impl ConsistencyMonitor {
    /// Create a stopped monitor using the engine's configured interval and backoff
    pub fn new(engine: Arc<ConsistencyEngine>, provider: Arc<dyn SourceProvider>) -> Self {
        let monitor = &engine.config().monitor;
        let (interval, backoff) = (monitor.interval(), monitor.backoff());
        Self::with_timing(engine, provider, interval, backoff)
    }

    pub fn with_timing(
        engine: Arc<ConsistencyEngine>,
        provider: Arc<dyn SourceProvider>,
        interval: Duration,
        backoff: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                engine,
                provider,
                subscribers: RwLock::new(Vec::new()),
                cycles_completed: AtomicU64::new(0),
                last_cycle_at: Mutex::new(None),
                interval,
                backoff,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<ConsistencyEngine> {
        &self.inner.engine
    }

    /// Register a callback invoked once per new alert
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&ConsistencyAlert) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.push(Arc::new(callback));
    }

    /// Start the background loop. Returns false when already running or when
    /// called outside a tokio runtime.
    pub fn start(&self) -> bool {
        let mut task = self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            info!("Monitoring already running");
            return false;
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot start monitoring outside a tokio runtime: {}", e);
                return false;
            }
        };

        let token = CancellationToken::new();
        let handle = runtime.spawn(run_loop(Arc::clone(&self.inner), token.clone()));
        *task = Some(RunningTask { token, handle });
        info!(
            "Monitoring started (interval {:?}, backoff {:?})",
            self.inner.interval, self.inner.backoff
        );
        true
    }

    /// Cancel the loop and wait for it to exit. Returns false when not running.
    pub async fn stop(&self) -> bool {
        let running = {
            let mut task = self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            task.take()
        };
        let Some(RunningTask { token, handle }) = running else {
            return false;
        };

        token.cancel();
        if let Err(e) = handle.await {
            error!("Monitoring task ended abnormally: {}", e);
        }
        info!("Monitoring stopped");
        true
    }

    pub fn is_monitoring(&self) -> bool {
        let task = self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        task.as_ref().is_some_and(|t| !t.handle.is_finished())
    }

    /// Run one cycle on the calling thread
    pub fn run_cycle(&self) -> ConsistencyResult<CycleReport> {
        self.inner.run_cycle()
    }

    pub fn get_status(&self) -> MonitorStatus {
        let last_cycle_at = *self
            .inner
            .last_cycle_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let store = self.inner.engine.store();
        MonitorStatus {
            is_monitoring: self.is_monitoring(),
            total_alerts: store.alerts().len(),
            unresolved_alerts: store.unresolved_count(),
            thresholds: store.thresholds().clone(),
            cycles_completed: self.inner.cycles_completed.load(Ordering::SeqCst),
            last_cycle_at,
        }
    }

    pub fn resolve_alert(&self, id: &str, notes: &str) -> bool {
        self.inner.engine.resolve_alert(id, notes)
    }

    pub fn get_dashboard(&self) -> Dashboard {
        self.inner.engine.get_dashboard()
    }
}

async fn run_loop(inner: Arc<MonitorInner>, token: CancellationToken) {
    loop {
        let cycle = Arc::clone(&inner);
        let wait = match tokio::task::spawn_blocking(move || cycle.run_cycle()).await {
            Ok(Ok(report)) => {
                debug!(
                    "Cycle scanned {} files in {}ms, {} new alert(s)",
                    report.files_scanned,
                    report.duration_ms,
                    report.new_alerts.len()
                );
                inner.interval
            }
            Ok(Err(e)) => {
                error!("{}; retrying in {:?}", e, inner.backoff);
                inner.backoff
            }
            Err(join_error) => {
                let e = ConsistencyError::TransientScan {
                    message: format!("cycle task failed: {}", join_error),
                };
                error!("{}; retrying in {:?}", e, inner.backoff);
                inner.backoff
            }
        };

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }
    debug!("Monitoring loop exited");
}

impl MonitorInner {
    fn run_cycle(&self) -> ConsistencyResult<CycleReport> {
        let start = Instant::now();
        let files = self
            .provider
            .files()
            .map_err(|e| ConsistencyError::TransientScan {
                message: format!("{:#}", e),
            })?;

        let engine = &self.engine;
        let provider = &self.provider;
        let scans: Vec<FileScan> = files
            .par_iter()
            .filter_map(|path| {
                let Some(content) = provider.content(path) else {
                    debug!("Skipping unreadable file {}", path.display());
                    return None;
                };
                Some(engine.scan_file(&content, &provider.display_path(path)))
            })
            .collect();

        let tallies = tally_categories(&scans);
        let scores: BTreeMap<CheckCategory, f64> = tallies
            .iter()
            .map(|(c, t)| (*c, t.score(scans.len())))
            .collect();
        let total_issues: usize = scans.iter().map(|s| s.kept.len()).sum();
        let suppressed: usize = scans.iter().map(|s| s.suppressed).sum();

        let mut critical: BTreeMap<CheckCategory, Vec<String>> = BTreeMap::new();
        for issue in scans.iter().flat_map(|s| &s.kept) {
            if issue.severity == Severity::Critical {
                critical
                    .entry(issue.category.check_category())
                    .or_default()
                    .push(format!("{}:{}", issue.file_path, issue.line_number));
            }
        }

        let now = Utc::now();
        let mut new_alerts = Vec::new();
        {
            let mut store = engine.store();
            for (category, tally) in &tallies {
                let context = json!({
                    "files_scanned": scans.len(),
                    "issue_count": tally.issue_count,
                    "files_with_issues": tally.files_with_issues,
                });
                if let Some(alert) = store.record_metric(*category, scores[category], context, now) {
                    new_alerts.push(alert);
                }
            }
            for (category, locations) in &critical {
                let details = json!({ "locations": locations });
                new_alerts.push(store.raise_detection_alert(*category, locations.len(), details, now));
            }
            store.record_scan(ScanRecord {
                timestamp: now,
                file_path: self.provider.repo_path().display().to_string(),
                total_issues: total_issues + suppressed,
                remaining_issues: total_issues,
                suppressed,
                can_deliver: critical.is_empty(),
            });
            store.prune(now);
        }

        self.notify(&new_alerts);

        self.cycles_completed.fetch_add(1, Ordering::SeqCst);
        *self
            .last_cycle_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(now);

        let report = CycleReport {
            files_scanned: scans.len(),
            total_issues,
            suppressed,
            scores,
            new_alerts,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Monitoring cycle: {} files, {} issues, {} suppressed, {} alert(s)",
            report.files_scanned,
            report.total_issues,
            report.suppressed,
            report.new_alerts.len()
        );
        Ok(report)
    }

    fn notify(&self, alerts: &[ConsistencyAlert]) {
        if alerts.is_empty() {
            return;
        }
        let subscribers: Vec<AlertCallback> = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for alert in alerts {
            for callback in &subscribers {
                let message = match catch_unwind(AssertUnwindSafe(|| callback(alert))) {
                    Ok(Ok(())) => continue,
                    Ok(Err(e)) => format!("{:#}", e),
                    Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
                };
                let e = ConsistencyError::SubscriberCallback { message };
                warn!("{} (alert {})", e, alert.id);
            }
        }
    }
}

/// Per-category counts for one cycle
#[derive(Debug, Clone, Copy, Default)]
struct CategoryTally {
    issue_count: usize,
    files_with_issues: usize,
}

impl CategoryTally {
    /// Percentage of scanned files with no kept issue in this category
    fn score(&self, files_scanned: usize) -> f64 {
        if files_scanned == 0 {
            return 100.0;
        }
        (files_scanned - self.files_with_issues) as f64 / files_scanned as f64 * 100.0
    }
}

fn tally_categories(scans: &[FileScan]) -> BTreeMap<CheckCategory, CategoryTally> {
    let mut tallies: BTreeMap<CheckCategory, CategoryTally> =
        CheckCategory::ALL.iter().map(|c| (*c, CategoryTally::default())).collect();
    for scan in scans {
        for category in CheckCategory::ALL {
            let count = scan
                .kept
                .iter()
                .filter(|i| i.category.check_category() == category)
                .count();
            if count > 0 {
                let tally = tallies.entry(category).or_default();
                tally.issue_count += count;
                tally.files_with_issues += 1;
            }
        }
    }
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::metrics::AlertSeverity;
    use crate::monitor::sources::MockSourceProvider;
    use std::sync::atomic::AtomicUsize;

    const BAD_ROUTE: &str = "@app.get(\"/users\")\nasync def list_users():\n    return []\n";

    fn monitor_for(provider: MockSourceProvider, interval: Duration, backoff: Duration) -> ConsistencyMonitor {
        ConsistencyMonitor::with_timing(
            Arc::new(ConsistencyEngine::default()),
            Arc::new(provider),
            interval,
            backoff,
        )
    }

    async fn wait_for_cycles(monitor: &ConsistencyMonitor, n: u64) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while monitor.get_status().cycles_completed < n {
            assert!(Instant::now() < deadline, "timed out waiting for {} cycles", n);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[test]
    fn test_api_score_below_threshold_alerts() {
        let mut files: Vec<(String, &str)> = (0..23).map(|i| (format!("app/m{}.py", i), "VALUE = 1\n")).collect();
        files.push(("app/routes_a.py".into(), BAD_ROUTE));
        files.push(("app/routes_b.py".into(), BAD_ROUTE));
        let entries = files.iter().map(|(p, b)| (p.as_str(), *b)).collect();
        let monitor = monitor_for(MockSourceProvider::new(entries), Duration::from_secs(30), Duration::from_secs(5));

        let report = monitor.run_cycle().unwrap();
        assert_eq!(report.files_scanned, 25);
        assert_eq!(report.scores[&CheckCategory::Api], 92.0);
        assert_eq!(report.scores[&CheckCategory::Naming], 100.0);
        assert_eq!(report.new_alerts.len(), 1, "{:?}", report.new_alerts);
        assert_eq!(report.new_alerts[0].category, CheckCategory::Api);
        assert_eq!(report.new_alerts[0].severity, AlertSeverity::Warning);

        {
            let store = monitor.engine().store();
            let api = store.metrics().iter().find(|m| m.category == CheckCategory::Api).unwrap();
            assert_eq!(api.context["files_with_issues"], 2);
            assert_eq!(api.context["issue_count"], 2);
            assert_eq!(api.context["files_scanned"], 25);
        }

        let status = monitor.get_status();
        assert_eq!(status.total_alerts, 1);
        assert_eq!(status.cycles_completed, 1);
        assert!(status.last_cycle_at.is_some());
        assert!(!status.is_monitoring);
    }

    #[test]
    fn test_critical_issue_raises_detection_alert() {
        let provider = MockSourceProvider::new(vec![("app/settings.py", "JWT_SECRET_KEY = 'x'\n")]);
        let monitor = monitor_for(provider, Duration::from_secs(30), Duration::from_secs(5));
        let report = monitor.run_cycle().unwrap();

        let severities: Vec<_> = report.new_alerts.iter().map(|a| (a.category, a.severity)).collect();
        assert!(severities.contains(&(CheckCategory::Naming, AlertSeverity::Warning)), "{:?}", severities);
        assert!(severities.contains(&(CheckCategory::Naming, AlertSeverity::Critical)), "{:?}", severities);
        assert!(!monitor.engine().store().history().last().unwrap().can_deliver);
    }

    #[test]
    fn test_empty_repository_scores_full() {
        let monitor = monitor_for(MockSourceProvider::new(vec![]), Duration::from_secs(30), Duration::from_secs(5));
        let report = monitor.run_cycle().unwrap();
        assert!(report.scores.values().all(|s| *s == 100.0));
        assert!(report.new_alerts.is_empty());
    }

    #[test]
    fn test_failed_listing_is_transient() {
        let provider = MockSourceProvider::new(vec![("a.py", "")]).failing(1);
        let monitor = monitor_for(provider, Duration::from_secs(30), Duration::from_secs(5));
        assert!(matches!(monitor.run_cycle(), Err(ConsistencyError::TransientScan { .. })));
        assert_eq!(monitor.get_status().cycles_completed, 0);
        assert!(monitor.run_cycle().is_ok());
    }

    #[test]
    fn test_subscriber_failures_are_isolated() {
        let provider = MockSourceProvider::new(vec![("app/settings.py", "JWT_SECRET_KEY = 'x'\n")]);
        let monitor = monitor_for(provider, Duration::from_secs(30), Duration::from_secs(5));
        let seen = Arc::new(AtomicUsize::new(0));

        monitor.subscribe(|_| panic!("subscriber exploded"));
        monitor.subscribe(|_| anyhow::bail!("subscriber refused"));
        let counter = Arc::clone(&seen);
        monitor.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let report = monitor.run_cycle().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), report.new_alerts.len());
        assert!(report.new_alerts.len() >= 2);
    }

    #[tokio::test]
    async fn test_start_twice_and_stop() {
        let monitor = monitor_for(
            MockSourceProvider::new(vec![("a.py", "VALUE = 1\n")]),
            Duration::from_millis(20),
            Duration::from_millis(20),
        );
        assert!(!monitor.stop().await, "stop on a stopped monitor is a no-op");
        assert!(monitor.start());
        assert!(!monitor.start(), "second start must not spawn another loop");
        assert!(monitor.is_monitoring());

        wait_for_cycles(&monitor, 2).await;
        assert!(monitor.stop().await);
        assert!(!monitor.is_monitoring());

        let cycles = monitor.get_status().cycles_completed;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(monitor.get_status().cycles_completed, cycles, "no cycles after stop");
    }

    #[tokio::test]
    async fn test_backoff_after_failed_cycles() {
        let provider = MockSourceProvider::new(vec![("a.py", "VALUE = 1\n")]).failing(2);
        let monitor = monitor_for(provider, Duration::from_secs(3600), Duration::from_millis(10));
        assert!(monitor.start());

        // Two failures retried on the short backoff, then one success before the long wait
        wait_for_cycles(&monitor, 1).await;
        assert_eq!(monitor.get_status().cycles_completed, 1);
        assert!(monitor.stop().await);
    }

    #[test]
    fn test_start_outside_runtime_refused() {
        let monitor = monitor_for(MockSourceProvider::new(vec![]), Duration::from_secs(1), Duration::from_secs(1));
        assert!(!monitor.start());
        assert!(!monitor.is_monitoring());
    }
}
