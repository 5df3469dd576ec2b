//! Read-only views over the engine state
//!
//! Nothing here mutates the metric store; renderers in `reporters` turn these
//! structs into text or JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CheckCategory, IssueCategory, Severity};
use crate::monitor::metrics::{ConsistencyAlert, MetricStore, Thresholds};
use crate::rules::RuleCatalog;

/// Metrics older than this do not count toward the dashboard
const SCORE_WINDOW_HOURS: i64 = 1;
const ALERT_WINDOW_HOURS: i64 = 24;

/// One catalog rule, as shown to users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub name: String,
    pub description: String,
    pub category: IssueCategory,
    pub severity: Severity,
    pub fixable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub overall_score: f64,
    pub per_category_scores: BTreeMap<CheckCategory, f64>,
    pub recent_alerts: Vec<ConsistencyAlert>,
    pub rule_catalog_version: String,
    pub rules: Vec<CatalogSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub is_monitoring: bool,
    pub total_alerts: usize,
    pub unresolved_alerts: usize,
    pub thresholds: Thresholds,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// Summaries of every rule in catalog order
pub fn catalog_summary(catalog: &RuleCatalog) -> Vec<CatalogSummary> {
    catalog
        .rules()
        .map(|rule| CatalogSummary {
            name: rule.name.clone(),
            description: rule.description.clone(),
            category: rule.category,
            severity: rule.severity,
            fixable: rule.category.is_auto_fixable(),
        })
        .collect()
}

pub fn build_dashboard(store: &MetricStore, catalog: &RuleCatalog, now: DateTime<Utc>) -> Dashboard {
    let score_since = now - Duration::hours(SCORE_WINDOW_HOURS);
    let per_category_scores: BTreeMap<CheckCategory, f64> = CheckCategory::ALL
        .iter()
        .map(|c| (*c, store.latest_score(*c, score_since).unwrap_or(0.0)))
        .collect();
    let overall_score = per_category_scores.values().sum::<f64>() / CheckCategory::ALL.len() as f64;

    Dashboard {
        generated_at: now,
        overall_score,
        per_category_scores,
        recent_alerts: store.recent_alerts(now - Duration::hours(ALERT_WINDOW_HOURS)),
        rule_catalog_version: catalog.version().to_string(),
        rules: catalog_summary(catalog),
    }
}
