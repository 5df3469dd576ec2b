//! Python source model using tree-sitter
//!
//! Extracts functions, classes and module-level imports from Python source.

use tree_sitter::{Node, Parser};

use super::{ClassInfo, FunctionInfo, ImportInfo, Language, SourceModel};
use crate::error::{ConsistencyError, ConsistencyResult};

/// Parsed structure of one Python file
#[derive(Debug, Clone, Default)]
pub struct PythonModel {
    functions: Vec<FunctionInfo>,
    classes: Vec<ClassInfo>,
    imports: Vec<ImportInfo>,
}

impl PythonModel {
    /// Parse Python source. Any ERROR or MISSING node is a syntax error.
    pub fn parse(source: &str, path: &str) -> ConsistencyResult<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::LANGUAGE;
        parser
            .set_language(&language.into())
            .map_err(|e| syntax_error(path, 1, format!("failed to load Python grammar: {}", e)))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| syntax_error(path, 1, "parser produced no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, message) = first_error(&root, source.as_bytes())
                .unwrap_or((1, "invalid syntax".to_string()));
            return Err(syntax_error(path, line, message));
        }

        let bytes = source.as_bytes();
        let mut model = PythonModel::default();
        model.collect_imports(&root, bytes);
        model.walk(&root, bytes, false);
        Ok(model)
    }

    fn collect_imports(&mut self, root: &Node, source: &[u8]) {
        let mut cursor = root.walk();
        for node in root.children(&mut cursor) {
            let module = match node.kind() {
                "import_statement" => node
                    .child_by_field_name("name")
                    .map(|n| dotted_name_of(&n, source)),
                "import_from_statement" => node
                    .child_by_field_name("module_name")
                    .and_then(|n| n.utf8_text(source).ok())
                    .map(|s| s.to_string()),
                "future_import_statement" => Some("__future__".to_string()),
                _ => None,
            };
            if let Some(module) = module {
                self.imports.push(ImportInfo {
                    module,
                    line_start: node.start_position().row as u32 + 1,
                    line_end: node.end_position().row as u32 + 1,
                });
            }
        }
    }

    fn walk(&mut self, node: &Node, source: &[u8], in_class: bool) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "function_definition" | "async_function_definition" => {
                    if let Some(func) = parse_function_node(&child, source, in_class) {
                        self.functions.push(func);
                    }
                    // Nested definitions are not methods of the enclosing class
                    self.walk(&child, source, false);
                }
                "class_definition" => {
                    if let Some(name) = child
                        .child_by_field_name("name")
                        .and_then(|n| n.utf8_text(source).ok())
                    {
                        self.classes.push(ClassInfo {
                            name: name.to_string(),
                            line_start: child.start_position().row as u32 + 1,
                            line_end: child.end_position().row as u32 + 1,
                        });
                    }
                    self.walk(&child, source, true);
                }
                "block" | "decorated_definition" => self.walk(&child, source, in_class),
                _ => self.walk(&child, source, false),
            }
        }
    }
}

impl SourceModel for PythonModel {
    fn language(&self) -> Language {
        Language::Python
    }

    fn find_functions(&self) -> &[FunctionInfo] {
        &self.functions
    }

    fn find_classes(&self) -> &[ClassInfo] {
        &self.classes
    }

    fn find_imports(&self) -> &[ImportInfo] {
        &self.imports
    }
}

fn syntax_error(path: &str, line: u32, message: impl Into<String>) -> ConsistencyError {
    ConsistencyError::SourceSyntax {
        path: path.to_string(),
        line,
        message: message.into(),
    }
}

/// Parse a single function node into a FunctionInfo
fn parse_function_node(node: &Node, source: &[u8], is_method: bool) -> Option<FunctionInfo> {
    let name = node
        .child_by_field_name("name")?
        .utf8_text(source)
        .ok()?
        .to_string();

    // Older grammars use a dedicated node kind, newer ones an `async` keyword child
    let is_async = node.kind() == "async_function_definition"
        || node.child(0).map(|c| c.kind() == "async").unwrap_or(false);

    let has_try = node
        .child_by_field_name("body")
        .map(|body| contains_kind(&body, "try_statement"))
        .unwrap_or(false);

    Some(FunctionInfo {
        name,
        line_start: node.start_position().row as u32 + 1,
        line_end: node.end_position().row as u32 + 1,
        is_async,
        has_try,
        is_method,
    })
}

fn contains_kind(node: &Node, kind: &str) -> bool {
    if node.kind() == kind {
        return true;
    }
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| contains_kind(&child, kind));
    found
}

/// `import os.path as p` stores an aliased_import; we want the dotted name
fn dotted_name_of(node: &Node, source: &[u8]) -> String {
    let target = if node.kind() == "aliased_import" {
        node.child_by_field_name("name").unwrap_or(*node)
    } else {
        *node
    };
    target.utf8_text(source).unwrap_or("").to_string()
}

/// Locate the first ERROR or MISSING node, depth first
fn first_error(node: &Node, source: &[u8]) -> Option<(u32, String)> {
    if node.is_missing() {
        return Some((
            node.start_position().row as u32 + 1,
            format!("missing `{}`", node.kind()),
        ));
    }
    if node.is_error() {
        let snippet: String = node
            .utf8_text(source)
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(40)
            .collect();
        return Some((
            node.start_position().row as u32 + 1,
            format!("unexpected `{}`", snippet.trim()),
        ));
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.iter().find_map(|child| first_error(child, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_functions_and_classes() {
        let source = r#"
import os
from .models import User

class UserService:
    def create_user(self, data):
        try:
            return User(**data)
        except ValueError:
            raise

    async def get_user(self, user_id):
        return await User.get(user_id)

def helper():
    pass
"#;
        let model = PythonModel::parse(source, "service.py").unwrap();
        let names: Vec<&str> = model.find_functions().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["create_user", "get_user", "helper"]);

        let create = &model.find_functions()[0];
        assert!(create.has_try);
        assert!(!create.is_async);
        assert!(create.is_method);
        assert_eq!(create.line_start, 6);

        let get = &model.find_functions()[1];
        assert!(get.is_async);
        assert!(!get.has_try);

        assert!(!model.find_functions()[2].is_method);

        assert_eq!(model.find_classes().len(), 1);
        assert_eq!(model.find_classes()[0].name, "UserService");
    }

    #[test]
    fn test_parse_imports() {
        let source = "from __future__ import annotations\nimport os.path as p\nfrom ..core import db\n\ndef f():\n    import json\n";
        let model = PythonModel::parse(source, "m.py").unwrap();
        let modules: Vec<&str> = model.find_imports().iter().map(|i| i.module.as_str()).collect();
        // Function-local imports are not module-level
        assert_eq!(modules, vec!["__future__", "os.path", "..core"]);
        assert_eq!(model.find_imports()[2].line_start, 3);
    }

    #[test]
    fn test_multiline_import_span() {
        let source = "from typing import (\n    Any,\n    Dict,\n)\nimport os\n";
        let model = PythonModel::parse(source, "m.py").unwrap();
        let first = &model.find_imports()[0];
        assert_eq!(first.line_start, 1);
        assert_eq!(first.line_end, 4);
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let source = "def ok():\n    return 1\n\ndef broken(:\n    pass\n";
        let err = PythonModel::parse(source, "bad.py").unwrap_err();
        match err {
            ConsistencyError::SourceSyntax { line, path, .. } => {
                assert_eq!(path, "bad.py");
                assert_eq!(line, 4);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decorated_method_is_method() {
        let source = "class A:\n    @staticmethod\n    def build():\n        pass\n";
        let model = PythonModel::parse(source, "a.py").unwrap();
        assert!(model.find_functions()[0].is_method);
    }
}
