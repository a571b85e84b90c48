//! End-to-end scans over a fixture tree
//!
//! Builds a small project in a temp directory, runs the full
//! detect -> aggregate pipeline, and checks findings, scoring, and the
//! rendered outputs. Each test uses its own isolated temp directory.

use std::path::Path;
use tempfile::TempDir;
use vigil::config::ScanConfig;
use vigil::models::{Domain, IssueType, Severity};
use vigil::reporters;
use vigil::scanner::{scan_all, ScanError, Scanner};

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture dirs");
    }
    std::fs::write(path, content).expect("write fixture");
}

/// A fixture project with one issue per domain.
fn fixture_project() -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    let root = dir.path();

    write(
        root,
        "loader.py",
        "import json\n\n\ndef load_settings(path):\n    with open(path) as f:\n        raw = f.readlines()\n    return raw\n",
    );
    write(
        root,
        "views.py",
        "from django.db import models\n\n\ndef everyone():\n    return User.objects.all()\n",
    );
    write(
        root,
        "worker.py",
        "import time\n\n\ndef poll():\n    time.sleep(5)\n",
    );
    write(
        root,
        "cache_layer.py",
        "import redis\n\nclient = redis.Redis()\n\n\ndef read_through(key):\n    cached = cache.get(\"user\")\n    return cached\n",
    );
    // Excluded directory, would otherwise add findings
    write(root, "node_modules/dep.js", "setInterval(tick, 50);\n");

    dir
}

#[test]
fn test_scan_all_finds_issues_in_every_domain() {
    let project = fixture_project();
    let config = ScanConfig::default().with_scan_path(project.path());

    let aggregate = scan_all(&config).expect("scan_all succeeds");

    for domain in Domain::ALL {
        let report = aggregate.report(domain).expect("domain report present");
        assert!(
            report.has_findings(),
            "{domain} should produce at least one finding"
        );
        assert_eq!(report.issues_found, report.findings.len());
        // node_modules content never counts
        assert!(report.findings.iter().all(|f| !f.file_path.contains("node_modules")));
    }

    assert!(aggregate.has_issues());
    assert!(aggregate.performance_score < 100.0);
    assert!(aggregate.scan_duration_seconds >= 0.0);
}

#[test]
fn test_domain_detection_side_effects() {
    let project = fixture_project();
    let config = ScanConfig::default().with_scan_path(project.path());

    let database = Scanner::new(Domain::Database, config.clone())
        .scan(None)
        .expect("database scan");
    assert_eq!(database.orm_detected.as_deref(), Some("Django ORM"));

    let cache = Scanner::new(Domain::Cache, config)
        .scan(None)
        .expect("cache scan");
    assert!(cache
        .cache_systems_detected
        .contains(&"Redis".to_string()));
}

#[test]
fn test_findings_are_tree_relative_and_sorted() {
    let project = fixture_project();
    let config = ScanConfig::default().with_scan_path(project.path());

    let aggregate = scan_all(&config).expect("scan_all succeeds");
    for finding in aggregate.all_findings() {
        assert!(
            !Path::new(&finding.file_path).is_absolute(),
            "{} should be tree-relative",
            finding.file_path
        );
        assert!(finding.line_number >= 1);
    }

    for domain in Domain::ALL {
        let report = aggregate.report(domain).expect("report present");
        for pair in report.findings.windows(2) {
            assert!(pair[0].severity >= pair[1].severity, "{domain} sorted by severity");
        }
    }
}

#[test]
fn test_min_severity_threshold_applies_everywhere() {
    let project = fixture_project();
    let config = ScanConfig::default()
        .with_scan_path(project.path())
        .with_min_severity(Severity::Medium);

    let aggregate = scan_all(&config).expect("scan_all succeeds");
    assert!(aggregate
        .all_findings()
        .all(|f| f.severity >= Severity::Medium));
}

#[test]
fn test_missing_path_surfaces_error() {
    let config = ScanConfig::default().with_scan_path("/no/such/tree");
    let err = scan_all(&config).expect_err("missing root must fail");
    assert!(matches!(err, ScanError::PathNotFound(_)));
    assert!(err.to_string().contains("/no/such/tree"));
}

#[test]
fn test_comment_only_project_is_clean() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write(
        dir.path(),
        "docs.py",
        "# rows = f.readlines()\n\"\"\"\nUser.objects.all() is discouraged.\ntime.sleep(1) too.\n\"\"\"\n",
    );

    let config = ScanConfig::default().with_scan_path(dir.path());
    let aggregate = scan_all(&config).expect("scan_all succeeds");
    assert!(!aggregate.has_issues());
    assert!(aggregate.is_healthy());
    assert_eq!(aggregate.performance_score, 100.0);
}

#[test]
fn test_reporters_render_full_pipeline_output() {
    let project = fixture_project();
    let config = ScanConfig::default().with_scan_path(project.path());
    let aggregate = scan_all(&config).expect("scan_all succeeds");

    let text = reporters::text::render(&aggregate);
    assert!(text.contains("Vigil Analysis"));
    assert!(text.contains("DATABASE"));

    let json = reporters::json::render(&aggregate).expect("json renders");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert!(parsed["total_issues"].as_u64().expect("total_issues") > 0);

    let markdown = reporters::markdown::render(&aggregate);
    assert!(markdown.contains("# Vigil Analysis Report"));
    assert!(markdown.contains("| Severity | Count |"));
}

#[test]
fn test_cpu_structure_analysis_in_pipeline() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut body = String::from("def dispatch(event):\n");
    for i in 0..20 {
        body.push_str(&format!("    if event.kind == {i}:\n        return {i}\n"));
    }
    body.push_str("    return -1\n");
    write(dir.path(), "dispatch.py", &body);

    let config = ScanConfig::default().with_scan_path(dir.path());
    let report = Scanner::new(Domain::Cpu, config)
        .scan(None)
        .expect("cpu scan");

    let finding = report
        .findings
        .iter()
        .find(|f| f.issue_type == IssueType::HighComplexity)
        .expect("complexity finding");
    // 1 + 20 ifs
    assert_eq!(finding.complexity_score, Some(21));
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(finding.function_name.as_deref(), Some("dispatch"));
    assert!(finding.code_snippet.contains(">>>"));
    assert_eq!(report.total_functions_analyzed, 1);
    assert!((report.max_complexity - 21.0).abs() < f64::EPSILON);
}
