//! Consistency detectors
//!
//! This module provides the detector framework and the built-in checks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DetectorEngine                          │
//! │  - Registers detectors                                      │
//! │  - Runs each one isolated over a SourceUnit                 │
//! │  - Concatenates issues, ordered by line                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Detector Trait                         │
//! │  - name(): Unique identifier                                │
//! │  - categories(): Issue categories it can emit               │
//! │  - detect(unit): Run detection, return issues               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │ Line / regex based       │   │ AST based (SourceModel)      │
//! │ (Naming, ApiShape,       │   │ (Signature, Convention,      │
//! │  ConfigTyping, DbField)  │   │  ImportOrder w/ fallback)    │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use consistency_sentinel::detectors::{default_detectors, DetectorEngine, DetectorOptions};
//! use consistency_sentinel::rules::RuleCatalog;
//!
//! let mut engine = DetectorEngine::new();
//! engine.register_all(default_detectors(&RuleCatalog::builtin(), &DetectorOptions::default()));
//! let issues = engine.detect("JWT_SECRET_KEY = 'x'\n", "settings.py");
//! ```

pub mod api_shape;
pub mod base;
pub mod case;
pub mod config_typing;
pub mod convention;
pub mod db_fields;
pub mod engine;
pub mod import_order;
pub mod imports;
pub mod naming;
pub mod signature;

use std::sync::Arc;

pub use api_shape::ApiShapeDetector;
pub use base::{is_line_suppressed, Detector, DetectorOptions, SourceUnit};
pub use config_typing::ConfigTypingDetector;
pub use convention::ConventionDetector;
pub use db_fields::DbFieldDetector;
pub use engine::{DetectorEngine, DetectorResult};
pub use import_order::ImportOrderDetector;
pub use naming::NamingDetector;
pub use signature::SignatureDetector;

use crate::rules::RuleCatalog;

/// Create the default set of detectors
pub fn default_detectors(catalog: &RuleCatalog, options: &DetectorOptions) -> Vec<Arc<dyn Detector>> {
    vec![
        // Line based
        Arc::new(NamingDetector::new(catalog)),
        Arc::new(ApiShapeDetector::new()),
        Arc::new(ConfigTypingDetector::new()),
        Arc::new(DbFieldDetector::new()),
        // AST based
        Arc::new(ImportOrderDetector::new(options)),
        Arc::new(SignatureDetector::new()),
        Arc::new(ConventionDetector::new()),
    ]
}
