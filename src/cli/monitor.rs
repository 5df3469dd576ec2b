//! `sentinel monitor` - scheduled consistency scans of a repository
//!
//! Walks the repository on every cycle, so new and deleted files are picked
//! up without a restart.

use anyhow::{Context, Result};
use console::style;
use ignore::WalkBuilder;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::{load_engine_config, EngineConfig};
use crate::engine::ConsistencyEngine;
use crate::monitor::metrics::AlertSeverity;
use crate::monitor::sources::SourceProvider;
use crate::monitor::ConsistencyMonitor;
use crate::reporters::{self, OutputFormat};

/// Source file extensions the monitor scans
const MONITOR_EXTENSIONS: &[&str] = &["py", "pyi"];

/// Disk-backed source provider honoring `.gitignore` and configured excludes
pub struct DiskSources {
    repo_path: PathBuf,
    exclude: Vec<String>,
}

impl DiskSources {
    pub fn new(repo_path: &Path, config: &EngineConfig) -> Result<Self> {
        let repo_path = std::fs::canonicalize(repo_path)
            .with_context(|| format!("Repository not found: {}", repo_path.display()))?;
        Ok(Self {
            repo_path,
            exclude: config.exclude.effective_patterns(),
        })
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let rel = self.display_path(path);
        self.exclude.iter().any(|p| crate::config::glob_match(p, &rel))
    }
}

impl SourceProvider for DiskSources {
    fn files(&self) -> anyhow::Result<Vec<PathBuf>> {
        if !self.repo_path.is_dir() {
            anyhow::bail!("{} is no longer a directory", self.repo_path.display());
        }

        let mut builder = WalkBuilder::new(&self.repo_path);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .add_custom_ignore_filename(".sentinelignore");

        let mut files = Vec::new();
        for entry in builder.build().flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !MONITOR_EXTENSIONS.contains(&ext) || self.is_excluded(path) {
                continue;
            }
            files.push(path.to_path_buf());
        }
        files.sort();
        debug!("Collected {} source files under {}", files.len(), self.repo_path.display());
        Ok(files)
    }

    fn content(&self, path: &Path) -> Option<Arc<String>> {
        std::fs::read_to_string(path).ok().map(Arc::new)
    }

    fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}

pub fn run(path: &Path, interval: Option<u64>, once: bool, format: OutputFormat) -> Result<()> {
    let mut config = load_engine_config(path);
    if let Some(secs) = interval {
        config.monitor.interval_secs = secs;
    }
    let sources = DiskSources::new(path, &config)?;
    let repo_display = sources.repo_path().display().to_string();
    let engine = Arc::new(ConsistencyEngine::new(config).context("Invalid sentinel configuration")?);
    let monitor = ConsistencyMonitor::new(engine, Arc::new(sources));

    if once {
        monitor.run_cycle()?;
        println!("{}", reporters::render_dashboard(&monitor.get_dashboard(), format)?);
        return Ok(());
    }

    monitor.subscribe(|alert| {
        let tag = match alert.severity {
            AlertSeverity::Critical => style("CRITICAL").red().bold(),
            AlertSeverity::Warning => style("WARNING").yellow().bold(),
        };
        eprintln!("{} {} {}", tag, alert.message, style(&alert.id).dim());
        Ok(())
    });

    eprintln!(
        "\nMonitoring {} for consistency...\n  {} Press Ctrl+C to stop\n",
        style(&repo_display).cyan(),
        style("→").dim()
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(watch_until(&monitor, async {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")
    }))?;

    println!("{}", reporters::render_status(&monitor.get_status(), format)?);
    println!("{}", reporters::render_dashboard(&monitor.get_dashboard(), format)?);
    Ok(())
}

/// Run the monitor loop until `shutdown` resolves, then stop it
async fn watch_until<F>(monitor: &ConsistencyMonitor, shutdown: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    if !monitor.start() {
        anyhow::bail!("Monitoring could not be started (already running or no runtime)");
    }
    let result = shutdown.await;
    monitor.stop().await;
    result
}
