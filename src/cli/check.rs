//! Single-file commands: validate, fix, context, rules

use anyhow::{Context, Result};
use console::style;
use std::fs;
use std::path::Path;

use crate::config::load_engine_config;
use crate::engine::ConsistencyEngine;
use crate::reporters::{self, OutputFormat};
use crate::reporting::catalog_summary;

fn build_engine(config_dir: &Path) -> Result<ConsistencyEngine> {
    let config = load_engine_config(config_dir);
    ConsistencyEngine::new(config).context("Invalid sentinel configuration")
}

fn read_source(file: &Path) -> Result<(String, String)> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let display = file.to_string_lossy().replace('\\', "/");
    Ok((source, display))
}

/// Run the validate command
pub fn validate(config_dir: &Path, file: &Path, format: OutputFormat) -> Result<()> {
    let engine = build_engine(config_dir)?;
    let (source, path) = read_source(file)?;
    let report = engine.validate(&source, &path);
    println!("{}", reporters::render_validation(&report, format)?);

    if !report.can_deliver {
        eprintln!(
            "Blocked: {} critical, {} high issue(s) remain",
            report.severity_counts.critical, report.severity_counts.high
        );
        std::process::exit(1);
    }
    Ok(())
}

/// Run the fix command
pub fn fix(config_dir: &Path, file: &Path, write: bool, format: OutputFormat) -> Result<()> {
    let engine = build_engine(config_dir)?;
    let (source, path) = read_source(file)?;
    let scan = engine.scan_file(&source, &path);
    let outcome = engine.apply_fixes(&source, &scan.kept);

    if write {
        if outcome.fixed_source != source {
            fs::write(file, &outcome.fixed_source)
                .with_context(|| format!("Failed to write {}", file.display()))?;
        }
        match format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "file_path": path,
                    "fixed": outcome.fixed.len(),
                    "remaining": outcome.remaining,
                }))?
            ),
            OutputFormat::Text => {
                eprintln!(
                    "{} {} fix(es) applied to {}, {} issue(s) remain",
                    style("✓").green(),
                    outcome.fixed.len(),
                    style(&path).cyan(),
                    outcome.remaining.len()
                );
            }
        }
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "file_path": path,
                "fixed_source": outcome.fixed_source,
                "fixed": outcome.fixed.len(),
                "remaining": outcome.remaining,
            }))?
        ),
        OutputFormat::Text => print!("{}", outcome.fixed_source),
    }
    Ok(())
}

/// Run the context command
pub fn context(config_dir: &Path, file: &Path, format: OutputFormat) -> Result<()> {
    let engine = build_engine(config_dir)?;
    let (source, path) = read_source(file)?;
    let report = engine.check_with_context(&source, &path);
    println!("{}", reporters::render_context(&report, format)?);
    Ok(())
}

/// Run the rules command
pub fn rules(config_dir: &Path, format: OutputFormat) -> Result<()> {
    let engine = build_engine(config_dir)?;
    let catalog = engine.catalog();
    println!(
        "{}",
        reporters::render_catalog(catalog.version(), &catalog_summary(catalog), format)?
    );
    Ok(())
}
