//! File tree walking with exclusion semantics
//!
//! `PathFilter` decides whether a path is excluded from scanning. It is a
//! pure value over the built-in ignore names plus caller-supplied glob
//! patterns, so tests can exercise it without touching the filesystem.

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Extensions scanned by default across all domains.
pub const SCAN_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "java", "go", "rb", "php", "cs", "cpp", "c", "h",
];

/// Directory names always ignored, at any depth.
pub const DEFAULT_IGNORE_NAMES: &[&str] = &[
    "__pycache__",
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    ".venv",
    "venv",
    "env",
    "build",
    "dist",
    ".next",
    "out",
    "coverage",
    ".pytest_cache",
    ".mypy_cache",
    ".cache",
    ".idea",
    ".vscode",
    "vendor",
    "target",
];

/// Decides whether a file or directory is excluded from a scan.
pub struct PathFilter {
    globs: GlobSet,
}

impl PathFilter {
    /// Build a filter from caller-supplied glob patterns (`fnmatch` style,
    /// e.g. `test_*.py`, `*.tmp`). Invalid patterns are skipped with a
    /// warning rather than failing the scan.
    pub fn new(extra_patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in extra_patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!("Ignoring invalid exclude pattern {:?}: {}", pattern, e),
            }
        }
        let globs = builder.build().unwrap_or_else(|e| {
            warn!("Failed to compile exclude patterns: {}", e);
            GlobSet::empty()
        });
        Self { globs }
    }

    /// Check whether `path` should be excluded. Any path segment that is a
    /// dotfile, a default ignore name, or matches a caller glob excludes the
    /// whole path. The path `.` itself is never excluded.
    pub fn is_excluded(&self, path: &Path) -> bool {
        for component in path.components() {
            let name = match component.as_os_str().to_str() {
                Some(n) => n,
                None => continue,
            };

            if name == "." || name == ".." || name == "/" {
                continue;
            }

            if name.starts_with('.') {
                return true;
            }

            if DEFAULT_IGNORE_NAMES.contains(&name) {
                return true;
            }

            if self.globs.is_match(Path::new(name)) {
                return true;
            }
        }

        false
    }
}

/// Normalize an extension list to lowercase without leading dots.
fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect()
}

/// Walk `root` and collect scannable files in deterministic order.
///
/// The filter is applied to every directory and file relative to `root`, so
/// excluded directories are never descended. Only files whose extension is
/// in the scan-extension set (intersected with `include_extensions` when
/// given) survive.
pub fn walk_source_files(
    root: &Path,
    filter: &PathFilter,
    include_extensions: Option<&[String]>,
) -> Vec<PathBuf> {
    let allowed: Vec<String> = match include_extensions {
        Some(exts) => {
            let wanted = normalize_extensions(exts);
            SCAN_EXTENSIONS
                .iter()
                .filter(|e| wanted.iter().any(|w| w == *e))
                .map(|e| (*e).to_string())
                .collect()
        }
        None => SCAN_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
    };

    let root_owned = root.to_path_buf();
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let path = entry.path();

        let relative = path.strip_prefix(&root_owned).unwrap_or(path);
        if !relative.as_os_str().is_empty() && filter.is_excluded(relative) {
            continue;
        }

        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e.to_lowercase(),
            None => continue,
        };
        if allowed.iter().any(|a| *a == ext) {
            files.push(path.to_path_buf());
        }
    }

    files
}
