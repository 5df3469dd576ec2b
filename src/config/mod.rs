//! Configuration module for consistency-sentinel
//!
//! This module handles:
//! - Project-level configuration (sentinel.toml / .sentinelrc.json)
//! - Threshold and retention overrides
//! - Extra naming rules, first-party packages and context rules
//! - Path exclusion for repository monitoring

mod project_config;

pub use project_config::{
    glob_match, load_engine_config, EngineConfig, ExcludeConfig, ImportsConfig, MonitorConfig,
    NamingConfig, RenameEntry, CONFIG_JSON, CONFIG_TOML, DEFAULT_EXCLUDE_PATTERNS,
};
