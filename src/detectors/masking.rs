//! Comment and docstring masking
//!
//! Replaces comments and docstrings with spaces so regex rules never match
//! inside non-code regions. Preserves newlines so line numbers remain
//! stable. String literals other than docstrings are NOT masked: database
//! and cache rules intentionally match SQL and key patterns inside strings.
//!
//! Languages with a tree-sitter grammar (Python, JavaScript, TypeScript)
//! are masked from the parse tree. Everything else falls back to an
//! incremental line scanner that masks single-line comments and tracks
//! unterminated triple-quote regions across lines.

use std::ops::Range;
use tree_sitter::{Node, Parser};

/// Mask comment/docstring regions in `source` for the given file extension.
pub fn mask_comments(source: &str, extension: &str) -> String {
    if source.is_empty() {
        return String::new();
    }

    let ts_lang = match grammar_for(extension) {
        Some(lang) => lang,
        None => return mask_line_state(source),
    };

    let mut parser = Parser::new();
    if parser.set_language(&ts_lang).is_err() {
        return mask_line_state(source);
    }

    let tree = match parser.parse(source, None) {
        Some(t) => t,
        None => return mask_line_state(source),
    };

    let mut ranges = Vec::new();
    collect_masked_ranges(&tree.root_node(), extension, &mut ranges);
    if ranges.is_empty() {
        return source.to_string();
    }

    mask_ranges(source, &ranges)
}

/// Replace bytes in the given ranges with spaces, preserving `\n`.
fn mask_ranges(source: &str, ranges: &[Range<usize>]) -> String {
    let mut bytes = source.as_bytes().to_vec();
    for range in ranges {
        for i in range.start..range.end.min(bytes.len()) {
            if bytes[i] != b'\n' {
                bytes[i] = b' ';
            }
        }
    }
    // Only non-newline bytes were replaced with ASCII spaces
    String::from_utf8(bytes).unwrap_or_else(|_| source.to_string())
}

/// Walk the CST collecting byte ranges for comments and Python docstrings.
fn collect_masked_ranges(node: &Node, extension: &str, ranges: &mut Vec<Range<usize>>) {
    let kind = node.kind();

    if matches!(kind, "comment" | "line_comment" | "block_comment") {
        ranges.push(node.start_byte()..node.end_byte());
        return;
    }

    if kind == "string" && extension == "py" && is_python_docstring(node) {
        ranges.push(node.start_byte()..node.end_byte());
        return;
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_masked_ranges(&child, extension, ranges);
        }
    }
}

/// A docstring is an `expression_statement > string` appearing as the first
/// statement of a module or block (function/class body).
fn is_python_docstring(node: &Node) -> bool {
    let parent = match node.parent() {
        Some(p) => p,
        None => return false,
    };
    if parent.kind() != "expression_statement" {
        return false;
    }

    let container = match parent.parent() {
        Some(gp) => gp,
        None => return false,
    };
    if !matches!(container.kind(), "module" | "block") {
        return false;
    }

    for i in 0..container.child_count() {
        if let Some(child) = container.child(i) {
            let kind = child.kind();
            if matches!(kind, "comment" | "newline" | "\n") {
                continue;
            }
            return child.id() == parent.id();
        }
    }
    false
}

fn grammar_for(extension: &str) -> Option<tree_sitter::Language> {
    match extension {
        "py" => Some(tree_sitter_python::LANGUAGE.into()),
        "js" | "jsx" | "mjs" | "cjs" => Some(tree_sitter_javascript::LANGUAGE.into()),
        "ts" => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "tsx" => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
        _ => None,
    }
}

/// Fallback masking for extensions without a grammar.
///
/// Tracks multi-line state incrementally: lines whose trimmed start is a
/// comment marker are masked, as are lines inside an unterminated
/// triple-quote region or a `/* ... */` block comment.
fn mask_line_state(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut in_triple: Option<&str> = None;
    let mut in_block_comment = false;

    for (i, line) in source.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }

        if in_block_comment {
            out.push_str(&blank(line));
            if line.contains("*/") {
                in_block_comment = false;
            }
            continue;
        }

        if let Some(delim) = in_triple {
            out.push_str(&blank(line));
            if line.contains(delim) {
                in_triple = None;
            }
            continue;
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with('#')
            || trimmed.starts_with("//")
            || trimmed.starts_with("--")
            || trimmed.starts_with('*')
        {
            out.push_str(&blank(line));
            continue;
        }

        if trimmed.starts_with("/*") {
            out.push_str(&blank(line));
            if !trimmed[2..].contains("*/") {
                in_block_comment = true;
            }
            continue;
        }

        // Opening triple-quote left unterminated starts a docstring region.
        for delim in ["\"\"\"", "'''"] {
            if line.matches(delim).count() % 2 == 1 {
                in_triple = Some(delim);
                break;
            }
        }

        out.push_str(line);
    }

    out
}

fn blank(line: &str) -> String {
    " ".repeat(line.len())
}
