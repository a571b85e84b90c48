//! Scan orchestration
//!
//! A `Scanner` walks a directory tree for one domain, runs the text rules
//! (and, for the cpu domain, structural analysis) over every candidate
//! file, and assembles a severity-filtered, sorted `Report`.
//!
//! File-level detection has no cross-file dependencies, so files fan out
//! across a rayon worker pool; results are merged back in traversal order
//! to keep ORM/cache-system detection deterministic.

use crate::analysis::structure;
use crate::config::ScanConfig;
use crate::detectors::{extract_code_snippet, RuleSet, TextDetector, SNIPPET_CONTEXT_LINES};
use crate::models::{Domain, Finding, IssueType, Report, Severity};
use crate::scoring::AggregateReport;
use crate::walker::{walk_source_files, PathFilter};
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// How much of a file is inspected for framework detection.
const DETECTION_PREFIX_BYTES: usize = 5000;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),
}

/// Per-file detection output, merged sequentially after the parallel pass.
struct FileResult {
    read: bool,
    findings: Vec<Finding>,
    complexities: Vec<u32>,
    orm: Option<String>,
    cache_systems: Vec<String>,
}

impl FileResult {
    fn unreadable() -> Self {
        Self {
            read: false,
            findings: Vec::new(),
            complexities: Vec::new(),
            orm: None,
            cache_systems: Vec::new(),
        }
    }
}

/// Scans a directory tree for one analysis domain.
pub struct Scanner {
    domain: Domain,
    config: ScanConfig,
    rules: RuleSet,
}

impl Scanner {
    pub fn new(domain: Domain, config: ScanConfig) -> Self {
        let rules = RuleSet::for_domain(domain);
        Self {
            domain,
            config,
            rules,
        }
    }

    /// Scanner with a caller-built rule set, for tests and embedders.
    pub fn with_rules(domain: Domain, config: ScanConfig, rules: RuleSet) -> Self {
        Self {
            domain,
            config,
            rules,
        }
    }

    /// Scan `scan_path`, or the configured path when none is given.
    pub fn scan(&self, scan_path: Option<&Path>) -> Result<Report, ScanError> {
        let root = scan_path.unwrap_or(&self.config.scan_path);
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }

        let start = Instant::now();
        let filter = PathFilter::new(&self.config.exclude_patterns);
        let files = walk_source_files(root, &filter, self.config.include_extensions.as_deref());
        debug!("{}: {} candidate files under {}", self.domain, files.len(), root.display());

        let results: Vec<FileResult> = files
            .par_iter()
            .map(|path| self.scan_file(path, root))
            .collect();

        let mut report = Report::new(self.domain, root.display().to_string());
        let mut collected: Vec<Finding> = Vec::new();
        let mut complexities: Vec<u32> = Vec::new();
        let mut cache_systems: BTreeSet<String> = BTreeSet::new();

        for result in results {
            if !result.read {
                continue;
            }
            report.total_files_scanned += 1;
            collected.extend(result.findings);
            complexities.extend(result.complexities);

            // First match wins; never overwritten by later files.
            if report.orm_detected.is_none() {
                report.orm_detected = result.orm;
            }
            cache_systems.extend(result.cache_systems);
        }

        if self.domain == Domain::Cache {
            report.cache_systems_detected = cache_systems.into_iter().collect();
        }
        if self.domain == Domain::Cpu {
            report.total_functions_analyzed = complexities.len();
            if !complexities.is_empty() {
                let sum: u64 = complexities.iter().map(|&c| u64::from(c)).sum();
                report.average_complexity = sum as f64 / complexities.len() as f64;
                report.max_complexity =
                    f64::from(complexities.iter().copied().max().unwrap_or(0));
            }
        }

        let mut findings: Vec<Finding> = collected
            .into_iter()
            .filter(|f| f.severity >= self.config.min_severity)
            .collect();
        // Stable: discovery order is preserved within a severity tier.
        findings.sort_by_key(|f| Reverse(f.severity));
        report.set_findings(findings);

        report.scan_duration_seconds = start.elapsed().as_secs_f64();
        info!(
            "{} scan: {} files, {} findings in {:.2}s",
            self.domain, report.total_files_scanned, report.issues_found,
            report.scan_duration_seconds
        );
        Ok(report)
    }

    fn scan_file(&self, path: &Path, root: &Path) -> FileResult {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > self.config.max_file_size_bytes => {
                debug!("Skipping oversized file {}", path.display());
                return FileResult::unreadable();
            }
            Err(_) => return FileResult::unreadable(),
            _ => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return FileResult::unreadable(),
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string();

        let mut result = FileResult {
            read: true,
            findings: Vec::new(),
            complexities: Vec::new(),
            orm: None,
            cache_systems: Vec::new(),
        };

        if self.domain == Domain::Cpu && extension == "py" {
            self.analyze_complexity(&content, &relative, &mut result);
        }

        let detector = TextDetector::new(&self.rules);
        for hit in detector.scan(&content, &extension) {
            result.findings.push(Finding {
                file_path: relative.clone(),
                line_number: hit.line_number,
                issue_type: hit.rule.issue_type,
                severity: hit.rule.severity,
                description: hit.rule.description.to_string(),
                pattern_name: hit.rule.name.to_string(),
                function_name: None,
                complexity_score: None,
                estimated_impact: hit.rule.estimated_impact.to_string(),
                recommendation: hit.rule.recommendation.to_string(),
                code_snippet: hit.code_snippet,
            });
        }

        match self.domain {
            Domain::Database => result.orm = detect_orm(&content),
            Domain::Cache => result.cache_systems = detect_cache_systems(&content),
            _ => {}
        }

        result
    }

    fn analyze_complexity(&self, content: &str, relative: &str, result: &mut FileResult) {
        let scores = structure::complexity(content);
        if scores.is_empty() {
            return;
        }

        let lines: Vec<&str> = content.lines().collect();
        let function_lines: std::collections::HashMap<String, u32> = structure::functions(content)
            .into_iter()
            .map(|f| (f.name, f.line))
            .collect();

        let mut over_threshold: Vec<(String, u32)> = scores
            .iter()
            .filter(|(_, &score)| score > self.config.complexity_threshold)
            .map(|(name, &score)| (name.clone(), score))
            .collect();
        // HashMap iteration order is arbitrary; fix it by source line.
        over_threshold
            .sort_by_key(|(name, _)| function_lines.get(name).copied().unwrap_or(1));

        for (name, score) in over_threshold {
            let line = function_lines.get(&name).copied().unwrap_or(1);
            result.findings.push(Finding {
                file_path: relative.to_string(),
                line_number: line,
                issue_type: IssueType::HighComplexity,
                severity: complexity_severity(score),
                description: format!("Function has cyclomatic complexity of {score}."),
                pattern_name: "high_complexity".to_string(),
                function_name: Some(name),
                complexity_score: Some(score),
                estimated_impact: "Harder to test, maintain, and may indicate performance issues"
                    .to_string(),
                recommendation: "Break down into smaller functions, reduce branching.".to_string(),
                code_snippet: extract_code_snippet(&lines, line as usize, SNIPPET_CONTEXT_LINES),
            });
        }

        result.complexities = scores.into_values().collect();
    }
}

fn complexity_severity(score: u32) -> Severity {
    if score > 30 {
        Severity::Critical
    } else if score > 20 {
        Severity::High
    } else if score > 15 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Truncate to a char boundary at or below `limit` bytes.
fn prefix(content: &str, limit: usize) -> &str {
    if content.len() <= limit {
        return content;
    }
    let mut end = limit;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

fn detect_orm(content: &str) -> Option<String> {
    let head = prefix(content, DETECTION_PREFIX_BYTES);

    if head.contains("from django") || head.contains("django.db") {
        Some("Django ORM".to_string())
    } else if head.contains("from sqlalchemy") || head.contains("sqlalchemy") {
        Some("SQLAlchemy".to_string())
    } else if head.contains("from peewee") {
        Some("Peewee".to_string())
    } else if head.contains("from tortoise") {
        Some("Tortoise ORM".to_string())
    } else if head.contains("from prisma") {
        Some("Prisma".to_string())
    } else {
        None
    }
}

fn detect_cache_systems(content: &str) -> Vec<String> {
    let head = prefix(content, DETECTION_PREFIX_BYTES);
    let mut systems = Vec::new();

    if head.contains("import redis") || head.contains("from redis") {
        systems.push("Redis".to_string());
    }
    if head.to_lowercase().contains("memcache") {
        systems.push("Memcached".to_string());
    }
    if head.contains("@lru_cache") || head.contains("@cache") {
        systems.push("Python functools cache".to_string());
    }
    if head.contains("from django.core.cache") {
        systems.push("Django Cache".to_string());
    }
    if head.contains("Flask-Caching") || head.contains("flask_caching") {
        systems.push("Flask-Caching".to_string());
    }
    if head.contains("localStorage") || head.contains("sessionStorage") {
        systems.push("Browser Storage".to_string());
    }
    if head.contains("IndexedDB") || head.contains("indexedDB") {
        systems.push("IndexedDB".to_string());
    }

    systems
}

/// Run every enabled domain over the configured path and aggregate.
pub fn scan_all(config: &ScanConfig) -> Result<AggregateReport, ScanError> {
    let root = config.scan_path.clone();
    if !root.exists() {
        return Err(ScanError::PathNotFound(root));
    }

    let start = Instant::now();
    let mut aggregate = AggregateReport::new(root.display().to_string());

    for domain in Domain::ALL {
        if !config.domain_enabled(domain) {
            continue;
        }
        let report = Scanner::new(domain, config.clone()).scan(Some(&root))?;
        aggregate.set_report(report);
    }

    aggregate.scan_duration_seconds = start.elapsed().as_secs_f64();
    aggregate.calculate_totals();
    Ok(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, content).expect("write");
    }

    fn config_for(root: &Path) -> ScanConfig {
        ScanConfig::default().with_scan_path(root)
    }

    #[test]
    fn test_missing_path_is_fatal() {
        let scanner = Scanner::new(Domain::Memory, ScanConfig::default());
        let err = scanner
            .scan(Some(Path::new("/definitely/not/here")))
            .expect_err("missing path should fail");
        assert!(matches!(err, ScanError::PathNotFound(_)));
    }

    #[test]
    fn test_full_table_scan_scenario() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "views.py", "from app.models import User\n\n\ndef everyone():\n    return User.objects.all()\n");

        let report = Scanner::new(Domain::Database, config_for(root))
            .scan(None)
            .expect("scan succeeds");

        let hits: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.issue_type == IssueType::FullTableScan)
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line_number, 5);
        assert_eq!(hits[0].file_path, "views.py");
        assert_eq!(report.total_files_scanned, 1);
        assert_eq!(report.issues_found, report.findings.len());
    }

    #[test]
    fn test_paths_stored_relative() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "pkg/io_heavy.py", "data = open(path).readlines()\n");

        let report = Scanner::new(Domain::Memory, config_for(root))
            .scan(None)
            .expect("scan succeeds");

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].file_path, "pkg/io_heavy.py");
        assert!(!report.findings[0].file_path.starts_with('/'));
    }

    #[test]
    fn test_min_severity_filters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        // dataframe_copy is Low, readlines_call is Medium.
        write(root, "mixed.py", "frame = table.copy()\nrows = f.readlines()\n");

        let config = config_for(root).with_min_severity(Severity::Medium);
        let report = Scanner::new(Domain::Memory, config)
            .scan(None)
            .expect("scan succeeds");

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].pattern_name, "readlines_call");
    }

    #[test]
    fn test_findings_sorted_critical_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        // new_array_large (High) fires after event_listener (Low) in rule
        // order; the sort must put High first while keeping stability.
        write(
            root,
            "app.js",
            "window.addEventListener('load', init);\nlet big = new Array(9000000);\n",
        );

        let report = Scanner::new(Domain::Memory, config_for(root))
            .scan(None)
            .expect("scan succeeds");

        assert!(report.findings.len() >= 2);
        assert_eq!(report.findings[0].severity, Severity::High);
        for pair in report.findings.windows(2) {
            assert!(pair[0].severity >= pair[1].severity);
        }
    }

    #[test]
    fn test_excluded_directories_not_scanned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "node_modules/lib.js", "setInterval(tick, 100);\n");
        write(root, "app.js", "setInterval(tick, 100);\n");

        let report = Scanner::new(Domain::Memory, config_for(root))
            .scan(None)
            .expect("scan succeeds");

        assert_eq!(report.total_files_scanned, 1);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].file_path, "app.js");
    }

    #[test]
    fn test_orm_detection_first_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        // Traversal is sorted by file name: a.py before b.py.
        write(root, "a.py", "from django.db import models\n");
        write(root, "b.py", "import sqlalchemy\n");

        let report = Scanner::new(Domain::Database, config_for(root))
            .scan(None)
            .expect("scan succeeds");

        assert_eq!(report.orm_detected.as_deref(), Some("Django ORM"));
    }

    #[test]
    fn test_cache_systems_accumulate_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "a.py", "import redis\n");
        write(root, "b.js", "localStorage.setItem('k', v);\n");

        let report = Scanner::new(Domain::Cache, config_for(root))
            .scan(None)
            .expect("scan succeeds");

        assert_eq!(
            report.cache_systems_detected,
            vec!["Browser Storage".to_string(), "Redis".to_string()]
        );
    }

    #[test]
    fn test_cpu_complexity_finding() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        // Complexity 13: 1 + 12 ifs.
        let mut body = String::from("def tangled(x):\n");
        for i in 0..12 {
            body.push_str(&format!("    if x > {i}:\n        x += 1\n"));
        }
        body.push_str("    return x\n");
        write(root, "logic.py", &body);

        let report = Scanner::new(Domain::Cpu, config_for(root))
            .scan(None)
            .expect("scan succeeds");

        let finding = report
            .findings
            .iter()
            .find(|f| f.issue_type == IssueType::HighComplexity)
            .expect("complexity finding present");
        assert_eq!(finding.function_name.as_deref(), Some("tangled"));
        assert_eq!(finding.complexity_score, Some(13));
        assert_eq!(finding.severity, Severity::Low);
        assert_eq!(report.total_functions_analyzed, 1);
        assert!(report.max_complexity >= 13.0);
    }

    #[test]
    fn test_unreadable_files_not_counted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "ok.py", "x = 1\n");
        // Invalid UTF-8 forces a read failure.
        std::fs::write(root.join("bad.py"), [0xff, 0xfe, 0x20]).expect("write bytes");

        let report = Scanner::new(Domain::Memory, config_for(root))
            .scan(None)
            .expect("scan succeeds");
        assert_eq!(report.total_files_scanned, 1);
    }

    #[test]
    fn test_oversized_files_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "big.py", &"x = 1\n".repeat(10));

        let mut config = config_for(root);
        config.max_file_size_bytes = 8;
        let report = Scanner::new(Domain::Memory, config)
            .scan(None)
            .expect("scan succeeds");
        assert_eq!(report.total_files_scanned, 0);
    }

    #[test]
    fn test_scan_all_aggregates_enabled_domains() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write(root, "app.py", "rows = f.readlines()\nusers = User.objects.all()\n");

        let mut config = config_for(root);
        config.enabled_domains = vec![Domain::Memory, Domain::Database];
        let aggregate = scan_all(&config).expect("scan_all succeeds");

        assert!(aggregate.memory.is_some());
        assert!(aggregate.database.is_some());
        assert!(aggregate.cpu.is_none());
        assert!(aggregate.cache.is_none());
        assert!(aggregate.total_issues >= 2);
        assert!(aggregate.performance_score < 100.0);
    }
}
