//! Import statement scanning and grouping heuristics
//!
//! Imports are partitioned by textual heuristics only: relative imports and
//! configured first-party roots are local, names on the stdlib list are
//! standard, everything else is third-party.

use regex::Regex;
use std::sync::OnceLock;

use crate::parsers::ImportInfo;

pub const IMPORT_LINE_PATTERN: &str = r"^(?:from\s+(\.*[\w.]*)\s+import\b|import\s+([\w.]+))";

static IMPORT_LINE: OnceLock<Regex> = OnceLock::new();

fn import_line() -> &'static Regex {
    IMPORT_LINE.get_or_init(|| Regex::new(IMPORT_LINE_PATTERN).expect("valid regex"))
}

/// Python standard library top-level modules
const STDLIB_MODULES: &[&str] = &[
    "__future__", "abc", "argparse", "array", "ast", "asyncio", "base64", "bisect", "builtins",
    "calendar", "collections", "concurrent", "configparser", "contextlib", "contextvars", "copy",
    "csv", "ctypes", "dataclasses", "datetime", "decimal", "difflib", "email", "enum", "errno",
    "fnmatch", "fractions", "functools", "gc", "getpass", "glob", "gzip", "hashlib", "heapq",
    "hmac", "html", "http", "importlib", "inspect", "io", "ipaddress", "itertools", "json",
    "logging", "math", "mimetypes", "multiprocessing", "numbers", "operator", "os", "pathlib",
    "pickle", "platform", "pprint", "queue", "random", "re", "secrets", "select", "shlex",
    "shutil", "signal", "socket", "sqlite3", "ssl", "stat", "statistics", "string", "struct",
    "subprocess", "sys", "tempfile", "textwrap", "threading", "time", "timeit", "traceback",
    "types", "typing", "unicodedata", "unittest", "urllib", "uuid", "warnings", "weakref",
    "xml", "zipfile", "zlib", "zoneinfo",
];

/// Import block, in required order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportGroup {
    Standard,
    ThirdParty,
    Local,
}

impl ImportGroup {
    pub fn label(&self) -> &'static str {
        match self {
            ImportGroup::Standard => "standard library",
            ImportGroup::ThirdParty => "third-party",
            ImportGroup::Local => "local",
        }
    }
}

/// Classify an import into its block
pub fn classify(import: &ImportInfo, first_party: &[String]) -> ImportGroup {
    if import.is_relative() {
        return ImportGroup::Local;
    }
    let root = import.root();
    if first_party.iter().any(|p| p == root) {
        ImportGroup::Local
    } else if STDLIB_MODULES.contains(&root) {
        ImportGroup::Standard
    } else {
        ImportGroup::ThirdParty
    }
}

/// Find module-level import statements without an AST.
///
/// Only column-0 statements count. Parenthesised and backslash-continued
/// imports span multiple lines. Lines inside triple-quoted strings are skipped.
pub fn scan_imports(source: &str) -> Vec<ImportInfo> {
    let lines: Vec<&str> = source.lines().collect();
    let mut imports = Vec::new();
    let mut in_string: Option<&str> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(delim) = in_string {
            if line.matches(delim).count() % 2 == 1 {
                in_string = None;
            }
            i += 1;
            continue;
        }

        if let Some(caps) = import_line().captures(line) {
            let module = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();

            let start = i;
            let mut end = i;
            if line.contains('(') && !line.contains(')') {
                while end + 1 < lines.len() && !lines[end].contains(')') {
                    end += 1;
                }
            } else {
                while lines[end].trim_end().ends_with('\\') && end + 1 < lines.len() {
                    end += 1;
                }
            }

            imports.push(ImportInfo {
                module,
                line_start: start as u32 + 1,
                line_end: end as u32 + 1,
            });
            i = end + 1;
            continue;
        }

        for delim in ["\"\"\"", "'''"] {
            if line.matches(delim).count() % 2 == 1 {
                in_string = Some(delim);
                break;
            }
        }
        i += 1;
    }

    imports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(module: &str) -> ImportInfo {
        ImportInfo {
            module: module.to_string(),
            line_start: 1,
            line_end: 1,
        }
    }

    #[test]
    fn test_classify() {
        let first_party = vec!["app".to_string()];
        assert_eq!(classify(&info("os.path"), &first_party), ImportGroup::Standard);
        assert_eq!(classify(&info("requests"), &first_party), ImportGroup::ThirdParty);
        assert_eq!(classify(&info(".models"), &first_party), ImportGroup::Local);
        assert_eq!(classify(&info("app.db"), &first_party), ImportGroup::Local);
        assert_eq!(classify(&info("__future__"), &first_party), ImportGroup::Standard);
    }

    #[test]
    fn test_scan_multiline_and_skips_docstrings() {
        let source = r#""""Module docs.

import fake_inside_docstring
"""
import os
from typing import (
    Any,
    Dict,
)
from app.db import \
    session

def f():
    import json
"#;
        let imports = scan_imports(source);
        let modules: Vec<&str> = imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["os", "typing", "app.db"]);
        assert_eq!((imports[1].line_start, imports[1].line_end), (6, 9));
        assert_eq!((imports[2].line_start, imports[2].line_end), (10, 11));
    }

    #[test]
    fn test_scan_relative_from() {
        let imports = scan_imports("from . import views\nfrom ..core.db import Session\n");
        assert_eq!(imports[0].module, ".");
        assert_eq!(imports[1].module, "..core.db");
        assert!(imports[0].is_relative());
    }
}
