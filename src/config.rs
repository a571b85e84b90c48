//! Scan configuration
//!
//! `ScanConfig` is constructed in code (tests, library callers) or loaded
//! from a `vigil.toml` in the project root. Every field has a default so a
//! partial file, or none at all, still yields a working configuration.
//!
//! ```toml
//! # vigil.toml
//! scan_path = "."
//! enabled_domains = ["memory", "database"]
//! min_severity = "medium"
//! complexity_threshold = 12
//! exclude_patterns = ["generated", "*.min.js"]
//! ```

use crate::models::{Domain, Severity};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Upper bound on file size before a file is skipped as unreadable.
/// Generated bundles and lockfile blobs past this size are never worth
/// pattern-scanning and would dominate scan time.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

/// Configuration for a scan run. Immutable once handed to a scanner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Root path to scan.
    pub scan_path: PathBuf,
    /// Domains to run.
    pub enabled_domains: Vec<Domain>,
    /// Minimum severity to report; findings below this are dropped.
    pub min_severity: Severity,
    /// Cyclomatic complexity threshold for the cpu domain.
    pub complexity_threshold: u32,
    /// Allocation threshold in MB for memory heuristics.
    pub memory_threshold_mb: u64,
    /// Glob patterns excluded from scanning, on top of the built-in
    /// ignore names.
    pub exclude_patterns: Vec<String>,
    /// File extensions to include; `None` means all known scan extensions.
    pub include_extensions: Option<Vec<String>>,
    /// Per-file size cap in bytes; larger files are skipped.
    pub max_file_size_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_path: PathBuf::from("."),
            enabled_domains: Domain::ALL.to_vec(),
            min_severity: Severity::Low,
            complexity_threshold: 10,
            memory_threshold_mb: 100,
            exclude_patterns: default_exclude_patterns(),
            include_extensions: None,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

fn default_exclude_patterns() -> Vec<String> {
    [
        "__pycache__",
        "node_modules",
        ".git",
        ".venv",
        "venv",
        "build",
        "dist",
        "test",
        "tests",
        "*.test.*",
        "*.spec.*",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl ScanConfig {
    /// Load configuration from a `vigil.toml` file.
    ///
    /// A missing file yields defaults; a malformed file logs a warning and
    /// also yields defaults so a bad config never blocks a scan.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };

        match toml::from_str::<ScanConfig>(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load from `<root>/vigil.toml`, falling back to defaults.
    pub fn load_from_root(root: &Path) -> Self {
        let mut config = Self::load(&root.join("vigil.toml"));
        if config.scan_path == Path::new(".") {
            config.scan_path = root.to_path_buf();
        }
        config
    }

    pub fn with_scan_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scan_path = path.into();
        self
    }

    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    pub fn domain_enabled(&self, domain: Domain) -> bool {
        self.enabled_domains.contains(&domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.min_severity, Severity::Low);
        assert_eq!(config.complexity_threshold, 10);
        assert_eq!(config.enabled_domains.len(), 4);
        assert!(config.include_extensions.is_none());
        assert!(config.exclude_patterns.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: ScanConfig = toml::from_str(
            r#"
            min_severity = "medium"
            complexity_threshold = 15
            enabled_domains = ["database"]
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.min_severity, Severity::Medium);
        assert_eq!(config.complexity_threshold, 15);
        assert_eq!(config.enabled_domains, vec![Domain::Database]);
        // Untouched fields keep defaults
        assert_eq!(config.memory_threshold_mb, 100);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let config = ScanConfig::load(Path::new("/nonexistent/vigil.toml"));
        assert_eq!(config.min_severity, Severity::Low);
    }
}
