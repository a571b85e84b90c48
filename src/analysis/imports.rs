//! Python import-graph extraction and circular import detection
//!
//! Builds a module graph from the `import`/`from ... import` statements of
//! the Python files under a root and reports cycles through a `GraphEngine`.
//! Only imports that resolve to modules inside the tree become edges;
//! third-party imports are ignored.

use crate::graph::{GraphEngine, ModuleGraph};
use crate::models::{Finding, IssueType, Severity};
use crate::walker::{walk_source_files, PathFilter};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use tree_sitter::{Node, Parser};

/// One import statement: target module and the line it appears on.
#[derive(Debug, Clone)]
pub struct ImportSite {
    pub module: String,
    pub line: u32,
}

/// Extract imported module paths from Python source.
pub fn module_imports(source: &str) -> Vec<ImportSite> {
    let mut imports = Vec::new();

    let mut parser = Parser::new();
    if parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .is_err()
    {
        return imports;
    }
    let tree = match parser.parse(source, None) {
        Some(t) => t,
        None => return imports,
    };

    collect_imports(&tree.root_node(), source.as_bytes(), &mut imports);
    imports
}

fn collect_imports(node: &Node, source: &[u8], imports: &mut Vec<ImportSite>) {
    match node.kind() {
        "import_statement" => {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    if child.kind() == "dotted_name" {
                        push_import(&child, source, imports);
                    } else if child.kind() == "aliased_import" {
                        if let Some(name) = child.child_by_field_name("name") {
                            push_import(&name, source, imports);
                        }
                    }
                }
            }
        }
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                push_import(&module, source, imports);
            }
        }
        _ => {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    collect_imports(&child, source, imports);
                }
            }
        }
    }
}

fn push_import(node: &Node, source: &[u8], imports: &mut Vec<ImportSite>) {
    if let Ok(text) = node.utf8_text(source) {
        imports.push(ImportSite {
            module: text.to_string(),
            line: node.start_position().row as u32 + 1,
        });
    }
}

/// Module name for a tree-relative Python file path:
/// `pkg/sub/mod.py` -> `pkg.sub.mod`, `pkg/__init__.py` -> `pkg`.
pub fn module_name(relative: &Path) -> Option<String> {
    let without_ext = relative.with_extension("");
    let mut parts: Vec<String> = without_ext
        .components()
        .filter_map(|c| c.as_os_str().to_str().map(|s| s.to_string()))
        .collect();

    if parts.last().map(|s| s == "__init__").unwrap_or(false) {
        parts.pop();
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("."))
}

/// Analyzes intra-project imports for cycles.
pub struct ImportAnalyzer<'a> {
    engine: &'a dyn GraphEngine,
}

impl<'a> ImportAnalyzer<'a> {
    pub fn new(engine: &'a dyn GraphEngine) -> Self {
        Self { engine }
    }

    /// Build the import graph for the Python files under `root` and report
    /// each circular import chain as a finding anchored at the import site
    /// that closes the cycle.
    pub fn analyze(&self, root: &Path, exclude_patterns: &[String]) -> Vec<Finding> {
        let filter = PathFilter::new(exclude_patterns);
        let files = walk_source_files(root, &filter, Some(&["py".to_string()]));

        let mut graph = ModuleGraph::new();
        // (from_module, to_module) -> (file, line) of the import statement
        let mut sites: HashMap<(String, String), (String, u32)> = HashMap::new();
        let mut known: Vec<String> = Vec::new();

        for path in &files {
            let relative = path.strip_prefix(root).unwrap_or(path);
            if let Some(module) = module_name(relative) {
                known.push(module);
            }
        }

        for path in &files {
            let relative = path.strip_prefix(root).unwrap_or(path);
            let Some(from_module) = module_name(relative) else {
                continue;
            };
            let Ok(source) = std::fs::read_to_string(path) else {
                continue;
            };

            graph.add_node(&from_module);
            for import in module_imports(&source) {
                // Resolve to an in-tree module or skip (third-party import).
                let Some(target) = resolve(&import.module, &known) else {
                    continue;
                };
                if target == from_module {
                    continue;
                }
                graph.add_edge(&from_module, &target);
                sites
                    .entry((from_module.clone(), target.clone()))
                    .or_insert((relative.display().to_string(), import.line));
            }
        }

        debug!(
            "Import graph: {} modules, {} edges ({} engine)",
            graph.node_count(),
            graph.edge_count(),
            self.engine.name()
        );

        let mut findings = Vec::new();
        for cycle in self.engine.find_cycles(&graph) {
            if cycle.is_empty() {
                continue;
            }
            let first = &cycle[0];
            let second = cycle.get(1).unwrap_or(first);
            let (file_path, line) = sites
                .get(&(first.clone(), second.clone()))
                .cloned()
                .unwrap_or_else(|| (first.replace('.', "/") + ".py", 1));

            let chain = {
                let mut c = cycle.clone();
                c.push(first.clone());
                c.join(" -> ")
            };

            findings.push(Finding {
                file_path,
                line_number: line,
                issue_type: IssueType::CircularImport,
                severity: Severity::High,
                description: format!("Circular import chain: {chain}."),
                pattern_name: "circular_import".to_string(),
                function_name: None,
                complexity_score: None,
                estimated_impact: "Import order bugs and untestable module boundaries".to_string(),
                recommendation: "Break the cycle by extracting shared code into a new module."
                    .to_string(),
                code_snippet: String::new(),
            });
        }

        findings
    }
}

/// Match an imported dotted path against the known in-tree modules.
/// `from pkg.sub import thing` resolves to `pkg.sub` even when `thing` is a
/// symbol rather than a module.
fn resolve(imported: &str, known: &[String]) -> Option<String> {
    if known.iter().any(|m| m == imported) {
        return Some(imported.to_string());
    }
    // Longest known prefix of the dotted path
    let mut best: Option<&str> = None;
    for module in known {
        if imported.starts_with(module.as_str())
            && imported.as_bytes().get(module.len()) == Some(&b'.')
            && best.map(|b| module.len() > b.len()).unwrap_or(true)
        {
            best = Some(module);
        }
    }
    best.map(|m| m.to_string())
}
