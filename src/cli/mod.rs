//! CLI command definitions and handlers

mod check;
mod monitor;

pub use monitor::DiskSources;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::reporters::OutputFormat;

/// Parse and validate a monitoring interval in seconds (1-86400)
fn parse_interval(s: &str) -> Result<u64, String> {
    let n: u64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("interval must be at least 1 second".to_string())
    } else if n > 86_400 {
        Err("interval cannot exceed one day".to_string())
    } else {
        Ok(n)
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

/// Sentinel - code-consistency checks with deterministic auto-fix
#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(
    version,
    about = "Detect and fix naming, import, signature, API, config and schema inconsistencies in Python code",
    after_help = "\
Examples:
  sentinel validate app/settings.py            Check one file, exit 1 if blocked
  sentinel fix app/settings.py --write         Apply safe fixes in place
  sentinel context tests/conftest.py           Check with context suppression only
  sentinel rules --format json                 Dump the rule catalog
  sentinel monitor . --once                    One monitoring cycle, then the dashboard"
)]
pub struct Cli {
    /// Directory holding sentinel.toml / .sentinelrc.json (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Output format: text or json
    #[arg(long, short = 'f', global = true, default_value = "text", value_parser = parse_format)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect, suppress and fix; exit code 1 when Critical or High issues remain
    Validate {
        /// Python file to check
        file: PathBuf,
    },

    /// Apply deterministic fixes and print (or write) the fixed source
    Fix {
        file: PathBuf,

        /// Overwrite the file instead of printing to stdout
        #[arg(long)]
        write: bool,
    },

    /// Detect with context suppression and report the reality score
    Context {
        file: PathBuf,
    },

    /// List the rule catalog
    Rules,

    /// Scan a repository on a schedule and raise alerts
    Monitor {
        /// Repository root (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Seconds between cycles (overrides the config file)
        #[arg(long, value_parser = parse_interval)]
        interval: Option<u64>,

        /// Run a single cycle and print the dashboard
        #[arg(long)]
        once: bool,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let format = cli.format;
    match cli.command {
        Commands::Validate { file } => check::validate(&cli.config_dir, &file, format),
        Commands::Fix { file, write } => check::fix(&cli.config_dir, &file, write, format),
        Commands::Context { file } => check::context(&cli.config_dir, &file, format),
        Commands::Rules => check::rules(&cli.config_dir, format),
        Commands::Monitor {
            path,
            interval,
            once,
        } => monitor::run(&path, interval, once, format),
    }
}
