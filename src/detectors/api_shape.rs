//! API Endpoint Shape Detector
//!
//! Matches route registrations (`@app.get("/users")`, `@router.get(...)`,
//! `@bp.route("/users", methods=["GET"])`) and flags GET routes that sit on a
//! bare top-level segment with no sub-resource path.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::detectors::base::{Detector, SourceUnit};
use crate::models::{InconsistencyIssue, IssueCategory, Severity};

pub const ROUTE_PATTERN: &str = r#"@\s*(?:\w+\.)*(?P<verb>get|post|put|patch|delete|route)\(\s*[rf]?["'](?P<path>[^"']*)["'](?P<rest>[^\n]*)"#;

static ROUTE: OnceLock<Regex> = OnceLock::new();
static METHODS: OnceLock<Regex> = OnceLock::new();

fn route() -> &'static Regex {
    ROUTE.get_or_init(|| Regex::new(ROUTE_PATTERN).expect("valid regex"))
}

fn methods() -> &'static Regex {
    METHODS.get_or_init(|| Regex::new(r"methods\s*=\s*[\[(](?P<list>[^\])]*)").expect("valid regex"))
}

pub struct ApiShapeDetector;

impl ApiShapeDetector {
    pub fn new() -> Self {
        Self
    }

    /// `route(...)` without `methods=` defaults to GET
    fn is_get(verb: &str, rest: &str) -> bool {
        match verb {
            "get" => true,
            "route" => match methods().captures(rest) {
                Some(caps) => caps["list"].to_uppercase().contains("GET"),
                None => true,
            },
            _ => false,
        }
    }

    fn segment_count(path: &str) -> usize {
        path.split('/').filter(|s| !s.is_empty()).count()
    }
}

impl Default for ApiShapeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for ApiShapeDetector {
    fn name(&self) -> &'static str {
        "api-endpoint-shape"
    }

    fn description(&self) -> &'static str {
        "Detects GET routes without a sub-resource path segment"
    }

    fn categories(&self) -> &'static [IssueCategory] {
        &[IssueCategory::ApiEndpointShape]
    }

    fn detect(&self, unit: &SourceUnit) -> Vec<InconsistencyIssue> {
        let mut issues = Vec::new();

        for (i, line) in unit.lines().iter().enumerate() {
            let line_number = i as u32 + 1;
            let Some(caps) = route().captures(line) else {
                continue;
            };
            let path = &caps["path"];
            if !Self::is_get(&caps["verb"], &caps["rest"]) {
                continue;
            }
            // The root route is an index, not a resource
            if path == "/" || Self::segment_count(path) >= 2 {
                continue;
            }
            if unit.is_line_suppressed(line_number) {
                continue;
            }

            let resource = path.trim_matches('/');
            issues.push(
                InconsistencyIssue::new(
                    IssueCategory::ApiEndpointShape,
                    Severity::Medium,
                    unit.path,
                    line_number,
                    path,
                    format!("/{}/{{id}}", resource),
                )
                .with_description(format!(
                    "GET route `{}` has no sub-resource path segment",
                    path
                ))
                .with_suggested_fix(format!(
                    "Address a sub-resource such as `/{r}/{{id}}` or namespace the collection under `/api/{r}`",
                    r = resource
                )),
            );
        }

        debug!("ApiShapeDetector found {} issues in {}", issues.len(), unit.path);
        issues
    }
}
