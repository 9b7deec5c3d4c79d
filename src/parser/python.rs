//! Python symbol parser (tree-sitter)

use std::path::Path;

use super::{ParserError, RawSymbols, SymbolParser};

/// File extensions handled by this parser
const EXTENSIONS: &[&str] = &["py", "pyi"];

/// Tree-sitter backed Python parser.
///
/// Reports top-level definitions only: methods and nested functions are
/// excluded by walking direct children of the module node. Imports and
/// control-flow counts come from a full-tree walk, so nested imports and
/// branches inside functions still count.
#[derive(Debug, Default)]
pub struct PythonParser;

impl PythonParser {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolParser for PythonParser {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| EXTENSIONS.contains(&ext))
    }

    fn parse(&self, path: &Path, content: &str) -> Result<RawSymbols, ParserError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ParserError::GrammarLoad(e.to_string()))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ParserError::ParseFailed(path.display().to_string()))?;
        let root = tree.root_node();
        let src = content.as_bytes();

        let mut raw = RawSymbols {
            loc_count: content.lines().count(),
            ..RawSymbols::default()
        };

        collect_top_level(root, src, &mut raw);
        walk_counts_and_imports(root, src, &mut raw);
        raw.doc_line = module_doc_line(root, src);

        Ok(raw)
    }
}

/// Collect top-level class/function names and the `__all__` declaration
fn collect_top_level(root: tree_sitter::Node, src: &[u8], raw: &mut RawSymbols) {
    for i in 0..root.named_child_count() {
        let Some(child) = root.named_child(i as u32) else {
            continue;
        };
        // Decorators wrap the definition node
        let node = if child.kind() == "decorated_definition" {
            match child.child_by_field_name("definition") {
                Some(inner) => inner,
                None => continue,
            }
        } else {
            child
        };

        match node.kind() {
            "function_definition" => {
                if let Some(name) = node_name(node, src) {
                    raw.functions.push(name);
                }
            }
            "class_definition" => {
                if let Some(name) = node_name(node, src) {
                    raw.classes.push(name);
                }
            }
            "expression_statement" => {
                if let Some(exports) = parse_all_assignment(node, src) {
                    raw.declared_exports = Some(exports);
                }
            }
            _ => {}
        }
    }
}

/// Full-tree walk for loop/conditional counts and import identifiers
fn walk_counts_and_imports(root: tree_sitter::Node, src: &[u8], raw: &mut RawSymbols) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "for_statement" | "while_statement" => raw.loop_count += 1,
            "if_statement" | "elif_clause" | "conditional_expression" => {
                raw.conditional_count += 1
            }
            "import_statement" => {
                for j in 0..node.named_child_count() {
                    let Some(item) = node.named_child(j as u32) else {
                        continue;
                    };
                    let target = if item.kind() == "aliased_import" {
                        item.child_by_field_name("name")
                    } else {
                        Some(item)
                    };
                    if let Some(module) = target.and_then(|n| node_text(n, src)) {
                        raw.imports.push(module);
                    }
                }
            }
            "import_from_statement" => {
                if let Some(module) = node
                    .child_by_field_name("module_name")
                    .and_then(|n| node_text(n, src))
                {
                    raw.imports.push(module);
                }
            }
            _ => {}
        }
        for j in 0..node.named_child_count() {
            if let Some(child) = node.named_child(j as u32) {
                stack.push(child);
            }
        }
    }
}

/// First line of the module docstring, if the file starts with one
fn module_doc_line(root: tree_sitter::Node, src: &[u8]) -> Option<String> {
    // Leading comments are extra nodes and do not displace the docstring
    let first = (0..root.named_child_count())
        .filter_map(|i| root.named_child(i as u32))
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let inner = first.named_child(0)?;
    if inner.kind() != "string" {
        return None;
    }
    let text = node_text(inner, src)?;
    let value = string_literal_value(&text);
    value
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Parse `__all__ = ["a", "b"]` (list or tuple of string literals)
fn parse_all_assignment(stmt: tree_sitter::Node, src: &[u8]) -> Option<Vec<String>> {
    let assignment = stmt.named_child(0)?;
    if assignment.kind() != "assignment" {
        return None;
    }
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "identifier" || node_text(left, src)? != "__all__" {
        return None;
    }
    let right = assignment.child_by_field_name("right")?;
    if right.kind() != "list" && right.kind() != "tuple" {
        return None;
    }

    let mut names = Vec::new();
    for i in 0..right.named_child_count() {
        let Some(item) = right.named_child(i as u32) else {
            continue;
        };
        if item.kind() == "string" {
            if let Some(text) = node_text(item, src) {
                names.push(string_literal_value(&text));
            }
        }
    }
    Some(names)
}

fn node_name(node: tree_sitter::Node, src: &[u8]) -> Option<String> {
    node.child_by_field_name("name").and_then(|n| node_text(n, src))
}

fn node_text(node: tree_sitter::Node, src: &[u8]) -> Option<String> {
    node.utf8_text(src).ok().map(str::to_string)
}

/// Strip string prefixes and quotes from a Python string literal
fn string_literal_value(text: &str) -> String {
    let t = text.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(stripped) = t.strip_prefix(quote) {
            return stripped.strip_suffix(quote).unwrap_or(stripped).to_string();
        }
    }
    t.to_string()
}
