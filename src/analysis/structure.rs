//! Structural analysis of Python source using tree-sitter
//!
//! Computes per-function cyclomatic complexity, function metadata, and loop
//! inventories. All operations return empty results on unparseable source:
//! structural analysis is advisory and must never abort a scan.

use std::collections::HashMap;
use tree_sitter::{Node, Parser, Tree};

/// Metadata for one function definition.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub line: u32,
    pub is_async: bool,
    pub num_args: usize,
    pub has_return: bool,
    pub decorators: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    For,
    While,
    Comprehension,
}

/// One loop construct, including comprehensions.
#[derive(Debug, Clone)]
pub struct LoopInfo {
    pub kind: LoopKind,
    pub line: u32,
    pub is_nested: bool,
    pub has_break: bool,
    pub has_continue: bool,
}

const COMPREHENSION_KINDS: &[&str] = &[
    "list_comprehension",
    "set_comprehension",
    "dictionary_comprehension",
    "generator_expression",
];

fn parse_python(source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .ok()?;
    let tree = parser.parse(source, None)?;
    if tree.root_node().has_error() {
        return None;
    }
    Some(tree)
}

/// Cyclomatic complexity per function.
///
/// Starts at 1 and adds one per `if`/`elif`, `for`, `while`, `except`
/// clause, short-circuit boolean operator, and comprehension clause.
/// Nesting is additive; nested function bodies count only toward the
/// nested function.
pub fn complexity(source: &str) -> HashMap<String, u32> {
    let mut scores = HashMap::new();
    let tree = match parse_python(source) {
        Some(t) => t,
        None => return scores,
    };

    collect_function_complexity(&tree.root_node(), source.as_bytes(), &mut scores);
    scores
}

fn collect_function_complexity(node: &Node, source: &[u8], scores: &mut HashMap<String, u32>) {
    if node.kind() == "function_definition" {
        if let Some(name) = node
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(source).ok())
        {
            let mut score = 1u32;
            count_branches(node, true, &mut score);
            scores.insert(name.to_string(), score);
        }
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_function_complexity(&child, source, scores);
        }
    }
}

/// Count branch points in a function body, stopping at nested functions.
fn count_branches(node: &Node, is_root: bool, score: &mut u32) {
    if !is_root && node.kind() == "function_definition" {
        return;
    }

    match node.kind() {
        "if_statement" | "elif_clause" | "for_statement" | "while_statement"
        | "except_clause" | "boolean_operator" | "for_in_clause" => {
            *score += 1;
        }
        _ => {}
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            count_branches(&child, false, score);
        }
    }
}

/// Extract metadata for every function definition, methods included.
pub fn functions(source: &str) -> Vec<FunctionInfo> {
    let mut infos = Vec::new();
    let tree = match parse_python(source) {
        Some(t) => t,
        None => return infos,
    };

    collect_functions(&tree.root_node(), source, &mut infos);
    infos
}

fn collect_functions(node: &Node, source: &str, infos: &mut Vec<FunctionInfo>) {
    if node.kind() == "function_definition" {
        if let Some(info) = function_info(node, source) {
            infos.push(info);
        }
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_functions(&child, source, infos);
        }
    }
}

fn function_info(node: &Node, source: &str) -> Option<FunctionInfo> {
    let bytes = source.as_bytes();
    let name = node
        .child_by_field_name("name")?
        .utf8_text(bytes)
        .ok()?
        .to_string();

    let is_async = source[node.start_byte()..]
        .trim_start()
        .starts_with("async");

    let num_args = node
        .child_by_field_name("parameters")
        .map(|params| count_parameters(&params))
        .unwrap_or(0);

    let mut has_return = false;
    contains_kind(node, "return_statement", &mut has_return);

    Some(FunctionInfo {
        name,
        line: node.start_position().row as u32 + 1,
        is_async,
        num_args,
        has_return,
        decorators: decorators_of(node, bytes),
    })
}

fn count_parameters(params: &Node) -> usize {
    let mut count = 0;
    for i in 0..params.child_count() {
        if let Some(child) = params.child(i) {
            if matches!(
                child.kind(),
                "identifier" | "typed_parameter" | "default_parameter" | "typed_default_parameter"
            ) {
                count += 1;
            }
        }
    }
    count
}

fn contains_kind(node: &Node, kind: &str, found: &mut bool) {
    if *found {
        return;
    }
    if node.kind() == kind {
        *found = true;
        return;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            contains_kind(&child, kind, found);
        }
    }
}

/// Decorator names for a function wrapped in a `decorated_definition`.
fn decorators_of(func: &Node, source: &[u8]) -> Vec<String> {
    let parent = match func.parent() {
        Some(p) if p.kind() == "decorated_definition" => p,
        _ => return Vec::new(),
    };

    let mut names = Vec::new();
    for i in 0..parent.child_count() {
        if let Some(child) = parent.child(i) {
            if child.kind() == "decorator" {
                if let Ok(text) = child.utf8_text(source) {
                    names.push(decorator_name(text));
                }
            }
        }
    }
    names
}

/// Reduce decorator text to its bare name: `@app.route("/x")` -> `route`.
fn decorator_name(text: &str) -> String {
    let stripped = text.trim_start_matches('@').trim();
    let callee = stripped.split('(').next().unwrap_or(stripped);
    let name = callee.rsplit('.').next().unwrap_or(callee).trim();
    if name.is_empty() {
        "unknown".to_string()
    } else {
        name.to_string()
    }
}

/// Enumerate loop constructs, including comprehensions.
pub fn loops(source: &str) -> Vec<LoopInfo> {
    let mut found = Vec::new();
    let tree = match parse_python(source) {
        Some(t) => t,
        None => return found,
    };

    collect_loops(&tree.root_node(), &mut found);
    found
}

fn collect_loops(node: &Node, found: &mut Vec<LoopInfo>) {
    let kind = node.kind();
    let line = node.start_position().row as u32 + 1;

    if kind == "for_statement" || kind == "while_statement" {
        let mut has_break = false;
        contains_kind(node, "break_statement", &mut has_break);
        let mut has_continue = false;
        contains_kind(node, "continue_statement", &mut has_continue);

        found.push(LoopInfo {
            kind: if kind == "for_statement" {
                LoopKind::For
            } else {
                LoopKind::While
            },
            line,
            is_nested: inside_loop(node),
            has_break,
            has_continue,
        });
    } else if COMPREHENSION_KINDS.contains(&kind) {
        let mut clauses = 0;
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                if child.kind() == "for_in_clause" {
                    clauses += 1;
                }
            }
        }

        found.push(LoopInfo {
            kind: LoopKind::Comprehension,
            line,
            is_nested: clauses > 1,
            has_break: false,
            has_continue: false,
        });
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_loops(&child, found);
        }
    }
}

/// Whether any ancestor of `node` is a for/while loop.
fn inside_loop(node: &Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if matches!(parent.kind(), "for_statement" | "while_statement") {
            return true;
        }
        current = parent.parent();
    }
    false
}
