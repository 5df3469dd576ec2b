//! Source models built on tree-sitter
//!
//! A `SourceModel` is the small structural view the AST-dependent detectors
//! need: functions, classes and top-level imports. There is one implementation
//! per supported language.

pub mod python;

use crate::error::ConsistencyResult;

/// Source languages the engine knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Unknown,
}

impl Language {
    /// Pick the language from a path's extension.
    ///
    /// Paths without an extension are treated as Python, since inline
    /// snippets are usually validated under a bare name.
    pub fn from_path(path: &str) -> Language {
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            None => Language::Python,
            Some((_, ext)) => match ext.to_lowercase().as_str() {
                "py" | "pyi" => Language::Python,
                _ => Language::Unknown,
            },
        }
    }
}

/// A function or method definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub line_start: u32,
    pub line_end: u32,
    pub is_async: bool,
    /// A `try` statement appears anywhere in the function's subtree
    pub has_try: bool,
    pub is_method: bool,
}

/// A class definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub line_start: u32,
    pub line_end: u32,
}

/// A module-level import statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    /// Imported module as written, including leading dots for relative imports
    pub module: String,
    pub line_start: u32,
    pub line_end: u32,
}

impl ImportInfo {
    pub fn is_relative(&self) -> bool {
        self.module.starts_with('.')
    }

    /// First dotted component (`os` for `os.path`)
    pub fn root(&self) -> &str {
        self.module
            .trim_start_matches('.')
            .split('.')
            .next()
            .unwrap_or("")
    }
}

/// Structural view over one parsed file
pub trait SourceModel: Send + Sync {
    fn language(&self) -> Language;

    /// All function and method definitions, in source order
    fn find_functions(&self) -> &[FunctionInfo];

    /// All class definitions, in source order
    fn find_classes(&self) -> &[ClassInfo];

    /// Module-level imports, in source order
    fn find_imports(&self) -> &[ImportInfo];
}

/// Parse `source` into a model for its language.
///
/// Returns `None` when no model exists for the language, and
/// `Some(Err(SourceSyntax))` when the source does not parse.
pub fn parse_source(source: &str, path: &str) -> Option<ConsistencyResult<Box<dyn SourceModel>>> {
    match Language::from_path(path) {
        Language::Python => Some(
            python::PythonModel::parse(source, path).map(|m| Box::new(m) as Box<dyn SourceModel>),
        ),
        Language::Unknown => None,
    }
}
