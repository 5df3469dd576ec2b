//! consistency-sentinel - code-consistency analysis and auto-remediation
//!
//! Detects naming, import-order, signature, API-shape, config-typing and
//! schema-naming drift in Python sources, fixes what can be fixed
//! deterministically, suppresses intentional violations by context, and
//! tracks per-category scores over time with threshold alerts.
//!
//! ```no_run
//! use consistency_sentinel::engine::ConsistencyEngine;
//!
//! let engine = ConsistencyEngine::default();
//! let report = engine.validate("JWT_SECRET_KEY = 'x'\n", "app/settings.py");
//! assert!(report.can_deliver);
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod fixes;
pub mod models;
pub mod monitor;
pub mod parsers;
pub mod reporters;
pub mod reporting;
pub mod rules;

pub use engine::ConsistencyEngine;
pub use error::{ConsistencyError, ConsistencyResult};
pub use monitor::ConsistencyMonitor;
