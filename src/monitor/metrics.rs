//! Metric recorder and threshold evaluator
//!
//! Holds the only mutable state of the engine: the metric time series, the
//! alert list and the scan history. Callers serialise access through one
//! mutex; nothing in here locks.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::CheckCategory;

/// Per-category minimum scores
pub type Thresholds = BTreeMap<CheckCategory, f64>;

pub fn default_thresholds() -> Thresholds {
    CheckCategory::ALL
        .iter()
        .map(|c| (*c, c.default_threshold()))
        .collect()
}

/// One score for one category at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyMetricData {
    pub category: CheckCategory,
    /// Clamped to [0, 100]
    pub score: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
    pub context: Value,
}

impl ConsistencyMetricData {
    pub fn is_breach(&self) -> bool {
        self.score < self.threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Threshold breach
    Warning,
    /// Direct detection of Critical issues
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyAlert {
    pub id: String,
    pub category: CheckCategory,
    pub severity: AlertSeverity,
    pub message: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ConsistencyAlert {
    fn new(
        category: CheckCategory,
        severity: AlertSeverity,
        message: String,
        details: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category,
            severity,
            message,
            details,
            timestamp: now,
            resolved: false,
            resolution_notes: None,
            resolved_at: None,
        }
    }
}

/// History entry for one validated file or one monitoring cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub timestamp: DateTime<Utc>,
    pub file_path: String,
    pub total_issues: usize,
    pub remaining_issues: usize,
    pub suppressed: usize,
    pub can_deliver: bool,
}

/// Retention and alerting policy for a `MetricStore`
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPolicy {
    pub thresholds: Thresholds,
    pub metric_retention: Duration,
    pub alert_retention: Duration,
    pub dedupe_breach_alerts: bool,
}

impl Default for MetricPolicy {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            metric_retention: Duration::hours(24),
            alert_retention: Duration::hours(24),
            dedupe_breach_alerts: false,
        }
    }
}

/// What a `prune` pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub metrics: usize,
    pub alerts: usize,
    pub history: usize,
}

#[derive(Debug, Default)]
pub struct MetricStore {
    policy: MetricPolicy,
    metrics: Vec<ConsistencyMetricData>,
    alerts: Vec<ConsistencyAlert>,
    history: Vec<ScanRecord>,
}

impl MetricStore {
    pub fn new(policy: MetricPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> &MetricPolicy {
        &self.policy
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.policy.thresholds
    }

    pub fn threshold(&self, category: CheckCategory) -> f64 {
        self.policy
            .thresholds
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_threshold())
    }

    /// Append a metric and raise a Warning alert if it breaches its threshold.
    ///
    /// Returns the new alert, if any, for subscriber notification.
    pub fn record_metric(
        &mut self,
        category: CheckCategory,
        score: f64,
        context: Value,
        now: DateTime<Utc>,
    ) -> Option<ConsistencyAlert> {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 100.0) };
        let metric = ConsistencyMetricData {
            category,
            score,
            threshold: self.threshold(category),
            timestamp: now,
            context,
        };
        let breach = metric.is_breach();
        let threshold = metric.threshold;
        self.metrics.push(metric);

        if !breach {
            return None;
        }
        if self.policy.dedupe_breach_alerts && self.has_open_breach(category) {
            debug!("Breach alert for {} suppressed: an unresolved one exists", category);
            return None;
        }

        let alert = ConsistencyAlert::new(
            category,
            AlertSeverity::Warning,
            format!(
                "{} consistency score {:.1} is below threshold {:.1}",
                category, score, threshold
            ),
            serde_json::json!({ "score": score, "threshold": threshold }),
            now,
        );
        warn!("{}", alert.message);
        self.alerts.push(alert.clone());
        Some(alert)
    }

    /// Raise a Critical alert for Critical issues found directly by a scan
    pub fn raise_detection_alert(
        &mut self,
        category: CheckCategory,
        count: usize,
        details: Value,
        now: DateTime<Utc>,
    ) -> ConsistencyAlert {
        let alert = ConsistencyAlert::new(
            category,
            AlertSeverity::Critical,
            format!("{} critical {} issue(s) detected", count, category),
            details,
            now,
        );
        warn!("{}", alert.message);
        self.alerts.push(alert.clone());
        alert
    }

    /// Append a scan record, dropping history older than the metric retention.
    pub fn record_scan(&mut self, record: ScanRecord) {
        let cutoff = record.timestamp - self.policy.metric_retention;
        let before = self.history.len();
        self.history.retain(|h| h.timestamp >= cutoff);
        if self.history.len() < before {
            debug!("Dropped {} expired scan records", before - self.history.len());
        }
        self.history.push(record);
    }

    fn has_open_breach(&self, category: CheckCategory) -> bool {
        self.alerts
            .iter()
            .any(|a| a.category == category && a.severity == AlertSeverity::Warning && !a.resolved)
    }

    /// Drop old metrics and history, and alerts that are both old and resolved
    pub fn prune(&mut self, now: DateTime<Utc>) -> PruneStats {
        let metric_cutoff = now - self.policy.metric_retention;
        let alert_cutoff = now - self.policy.alert_retention;

        let before = (self.metrics.len(), self.alerts.len(), self.history.len());
        self.metrics.retain(|m| m.timestamp >= metric_cutoff);
        self.history.retain(|h| h.timestamp >= metric_cutoff);
        self.alerts.retain(|a| !a.resolved || a.timestamp >= alert_cutoff);

        let stats = PruneStats {
            metrics: before.0 - self.metrics.len(),
            alerts: before.1 - self.alerts.len(),
            history: before.2 - self.history.len(),
        };
        if stats != PruneStats::default() {
            debug!("Pruned {:?}", stats);
        }
        stats
    }

    /// Mark an alert resolved. False when the id is unknown or already resolved.
    pub fn resolve_alert(&mut self, id: &str, notes: &str, now: DateTime<Utc>) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) if !alert.resolved => {
                alert.resolved = true;
                alert.resolution_notes = Some(notes.to_string());
                alert.resolved_at = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn metrics(&self) -> &[ConsistencyMetricData] {
        &self.metrics
    }

    pub fn alerts(&self) -> &[ConsistencyAlert] {
        &self.alerts
    }

    pub fn history(&self) -> &[ScanRecord] {
        &self.history
    }

    pub fn unresolved_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.resolved).count()
    }

    /// Most recent score for `category` recorded at or after `since`
    pub fn latest_score(&self, category: CheckCategory, since: DateTime<Utc>) -> Option<f64> {
        self.metrics
            .iter()
            .filter(|m| m.category == category && m.timestamp >= since)
            .max_by_key(|m| m.timestamp)
            .map(|m| m.score)
    }

    /// Alerts raised at or after `since`, newest first
    pub fn recent_alerts(&self, since: DateTime<Utc>) -> Vec<ConsistencyAlert> {
        let mut alerts: Vec<ConsistencyAlert> = self
            .alerts
            .iter()
            .filter(|a| a.timestamp >= since)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts
    }
}
