//! Text (terminal) reporter with colors and formatting

use console::{style, StyledObject};

use crate::models::{ContextReport, InconsistencyIssue, Severity, SeverityCounts, ValidationReport};
use crate::monitor::metrics::AlertSeverity;
use crate::reporting::{CatalogSummary, Dashboard, MonitorStatus};

const RULE: &str = "──────────────────────────────────────";

/// Severity tag, colored
fn severity_tag(severity: Severity) -> StyledObject<&'static str> {
    match severity {
        Severity::Critical => style("[C]").red().bold(),
        Severity::High => style("[H]").red(),
        Severity::Medium => style("[M]").yellow(),
        Severity::Low => style("[L]").blue(),
    }
}

fn format_score(score: f64) -> String {
    let text = format!("{:.1}", score);
    if score >= 95.0 {
        style(text).green().to_string()
    } else if score >= 80.0 {
        style(text).yellow().to_string()
    } else {
        style(text).red().to_string()
    }
}

fn format_counts(counts: &SeverityCounts) -> String {
    let mut parts = Vec::new();
    if counts.critical > 0 {
        parts.push(style(format!("{} critical", counts.critical)).red().bold().to_string());
    }
    if counts.high > 0 {
        parts.push(style(format!("{} high", counts.high)).red().to_string());
    }
    if counts.medium > 0 {
        parts.push(style(format!("{} medium", counts.medium)).yellow().to_string());
    }
    if counts.low > 0 {
        parts.push(style(format!("{} low", counts.low)).blue().to_string());
    }
    parts.join(" | ")
}

fn push_issues(out: &mut String, issues: &[InconsistencyIssue]) {
    for issue in issues {
        out.push_str(&format!(
            "  {}  {:>4}  {:<28}  {} -> {}\n",
            severity_tag(issue.severity),
            style(format!("L{}", issue.line_number)).dim(),
            issue.category.as_str(),
            issue.actual,
            style(&issue.expected).green()
        ));
        if let Some(reason) = &issue.fix_error {
            out.push_str(&format!("        {} {}\n", style("fix failed:").dim(), reason));
        } else if !issue.suggested_fix.is_empty() {
            out.push_str(&format!("        {}\n", style(&issue.suggested_fix).dim()));
        }
    }
}

fn header(out: &mut String, title: &str) {
    out.push_str(&format!("\n{}\n", style(title).bold()));
    out.push_str(&format!("{}\n", style(RULE).dim()));
}

pub fn render_validation(report: &ValidationReport) -> String {
    let mut out = String::new();
    header(&mut out, &format!("Consistency check: {}", report.file_path));

    let verdict = if report.can_deliver {
        style("DELIVERABLE").green().bold()
    } else {
        style("BLOCKED").red().bold()
    };
    out.push_str(&format!(
        "Score: {}  Issues: {}  Fixed: {}  Suppressed: {}  {}\n",
        format_score(report.consistency_score),
        report.total_issues,
        report.fixed_issues,
        report.suppressed_issues,
        verdict
    ));

    if report.remaining_issues.is_empty() {
        out.push_str(&format!("\n  {}\n", style("No remaining issues").green()));
    } else {
        out.push_str(&format!(
            "\n{} ({})\n",
            style("REMAINING").bold(),
            format_counts(&report.severity_counts)
        ));
        push_issues(&mut out, &report.remaining_issues);
    }
    out
}

pub fn render_context(report: &ContextReport) -> String {
    let mut out = String::new();
    header(&mut out, &format!("Context check: {}", report.file_path));
    out.push_str(&format!(
        "Reality score: {}  Suppressed: {}\n",
        if report.is_real {
            style(format!("{:.2}", report.reality_score)).green()
        } else {
            style(format!("{:.2}", report.reality_score)).red()
        },
        report.suppressed_count
    ));
    out.push_str(&format!("{}\n", report.summary));
    if !report.hallucinations.is_empty() {
        out.push('\n');
        push_issues(&mut out, &report.hallucinations);
    }
    out
}

pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    header(&mut out, "Consistency dashboard");
    out.push_str(&format!(
        "Overall: {}  Catalog: {} ({} rules)  {}\n\n",
        format_score(dashboard.overall_score),
        dashboard.rule_catalog_version,
        dashboard.rules.len(),
        style(dashboard.generated_at.format("%Y-%m-%d %H:%M:%S UTC")).dim()
    ));

    out.push_str(&format!("{}\n", style("SCORES").bold()));
    for (category, score) in &dashboard.per_category_scores {
        out.push_str(&format!("  {:<16} {}\n", category.as_str(), format_score(*score)));
    }

    out.push_str(&format!(
        "\n{} ({} in the last 24h)\n",
        style("ALERTS").bold(),
        dashboard.recent_alerts.len()
    ));
    for alert in dashboard.recent_alerts.iter().take(20) {
        let tag = match alert.severity {
            AlertSeverity::Critical => style("critical").red().bold(),
            AlertSeverity::Warning => style("warning ").yellow(),
        };
        let state = if alert.resolved { style("resolved").dim() } else { style("open").bold() };
        out.push_str(&format!(
            "  {}  {}  {}  {}\n",
            tag,
            state,
            alert.message,
            style(&alert.id).dim()
        ));
    }
    out
}

pub fn render_status(status: &MonitorStatus) -> String {
    let mut out = String::new();
    header(&mut out, "Monitor status");
    out.push_str(&format!(
        "Running: {}  Cycles: {}  Alerts: {} ({} unresolved)\n",
        status.is_monitoring, status.cycles_completed, status.total_alerts, status.unresolved_alerts
    ));
    if let Some(at) = status.last_cycle_at {
        out.push_str(&format!("Last cycle: {}\n", at.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    out.push_str(&format!("\n{}\n", style("THRESHOLDS").bold()));
    for (category, threshold) in &status.thresholds {
        out.push_str(&format!("  {:<16} {:.1}\n", category.as_str(), threshold));
    }
    out
}

pub fn render_catalog(version: &str, rules: &[CatalogSummary]) -> String {
    let mut out = String::new();
    header(&mut out, &format!("Rule catalog {}", version));
    for rule in rules {
        out.push_str(&format!(
            "  {}  {:<36}  {:<28}  {}\n",
            severity_tag(rule.severity),
            rule.name,
            rule.category.as_str(),
            if rule.fixable { style("auto-fix").green() } else { style("manual").dim() }
        ));
    }
    out
}
