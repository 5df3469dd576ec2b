//! Detector execution engine
//!
//! The DetectorEngine runs every registered detector over one source unit:
//! - Each detector runs isolated under `catch_unwind`; a panicking detector
//!   contributes nothing and the others still run
//! - Results are concatenated and ordered by line
//!
//! Files are the unit of parallelism (see the monitor), so detectors for one
//! file run sequentially.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error};

use crate::detectors::base::{Detector, SourceUnit};
use crate::error::panic_message;
use crate::models::InconsistencyIssue;

/// Outcome of running one detector
#[derive(Debug, Clone)]
pub struct DetectorResult {
    pub detector_name: &'static str,
    pub issues: Vec<InconsistencyIssue>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl DetectorResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Orchestrates consistency detection across all registered detectors
#[derive(Default, Clone)]
pub struct DetectorEngine {
    detectors: Vec<Arc<dyn Detector>>,
}

impl DetectorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a detector
    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        debug!("Registering detector: {}", detector.name());
        self.detectors.push(detector);
    }

    /// Register multiple detectors at once
    pub fn register_all(&mut self, detectors: impl IntoIterator<Item = Arc<dyn Detector>>) {
        for detector in detectors {
            self.register(detector);
        }
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Run all detectors over one unit and collect their issues, ordered by line
    pub fn run(&self, unit: &SourceUnit) -> Vec<InconsistencyIssue> {
        let start = Instant::now();
        let mut issues = Vec::new();
        let mut failed = 0usize;

        for detector in &self.detectors {
            let result = self.run_single_detector(detector, unit);
            if result.success() {
                issues.extend(result.issues);
            } else {
                failed += 1;
            }
        }

        // Stable: detector order is kept within a line
        issues.sort_by_key(|i| i.line_number);

        debug!(
            "Detection complete for {}: {} issues from {}/{} detectors in {:?}",
            unit.path,
            issues.len(),
            self.detectors.len() - failed,
            self.detectors.len(),
            start.elapsed()
        );
        issues
    }

    /// Parse `source` once and run every detector over it
    pub fn detect(&self, source: &str, path: &str) -> Vec<InconsistencyIssue> {
        self.run(&SourceUnit::new(source, path))
    }

    /// Run a single detector with panic isolation and timing
    fn run_single_detector(&self, detector: &Arc<dyn Detector>, unit: &SourceUnit) -> DetectorResult {
        let name = detector.name();
        let start = Instant::now();

        let detect_result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| detector.detect(unit)));
        let duration_ms = start.elapsed().as_millis() as u64;

        match detect_result {
            Ok(issues) => DetectorResult {
                detector_name: name,
                issues,
                duration_ms,
                error: None,
            },
            Err(panic_info) => {
                let panic_msg = panic_message(panic_info.as_ref());
                error!("Detector {} panicked on {}: {}", name, unit.path, panic_msg);
                DetectorResult {
                    detector_name: name,
                    issues: Vec::new(),
                    duration_ms,
                    error: Some(format!("Panic: {}", panic_msg)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueCategory, Severity};

    struct MockDetector {
        name: &'static str,
        line: u32,
        panics: bool,
    }

    impl Detector for MockDetector {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "Mock detector for testing"
        }

        fn categories(&self) -> &'static [IssueCategory] {
            &[IssueCategory::ImportOrder]
        }

        fn detect(&self, unit: &SourceUnit) -> Vec<InconsistencyIssue> {
            if self.panics {
                panic!("detector blew up");
            }
            vec![InconsistencyIssue::new(
                IssueCategory::ImportOrder,
                Severity::Low,
                unit.path,
                self.line,
                self.name,
                "",
            )]
        }
    }

    #[test]
    fn test_register_detectors() {
        let mut engine = DetectorEngine::new();
        engine.register_all([
            Arc::new(MockDetector { name: "Detector1", line: 1, panics: false }) as Arc<dyn Detector>,
            Arc::new(MockDetector { name: "Detector2", line: 2, panics: false }),
        ]);
        assert_eq!(engine.detector_count(), 2);
        assert_eq!(engine.detector_names(), vec!["Detector1", "Detector2"]);
    }

    #[test]
    fn test_results_ordered_by_line() {
        let mut engine = DetectorEngine::new();
        engine.register(Arc::new(MockDetector { name: "late", line: 9, panics: false }));
        engine.register(Arc::new(MockDetector { name: "early", line: 2, panics: false }));
        let issues = engine.detect("x = 1\n", "a.py");
        let lines: Vec<u32> = issues.iter().map(|i| i.line_number).collect();
        assert_eq!(lines, vec![2, 9]);
    }

    #[test]
    fn test_panicking_detector_is_isolated() {
        let mut engine = DetectorEngine::new();
        engine.register(Arc::new(MockDetector { name: "boom", line: 1, panics: true }));
        engine.register(Arc::new(MockDetector { name: "ok", line: 3, panics: false }));
        let issues = engine.detect("x = 1\n", "a.py");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].actual, "ok");
    }
}
