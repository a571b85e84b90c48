//! Text (terminal) reporter

use crate::models::{Report, Severity};
use crate::scoring::AggregateReport;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Findings shown per domain section before truncating.
const MAX_FINDINGS_PER_DOMAIN: usize = 5;

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "\x1b[31m", // Red
        Severity::High => "\x1b[91m",     // Light red
        Severity::Medium => "\x1b[33m",   // Yellow
        Severity::Low => "\x1b[34m",      // Blue
        Severity::Info => "\x1b[90m",     // Gray
    }
}

fn score_color(score: f64) -> &'static str {
    if score >= 80.0 {
        "\x1b[32m"
    } else if score >= 60.0 {
        "\x1b[33m"
    } else {
        "\x1b[31m"
    }
}

/// Render report as formatted terminal output
pub fn render(report: &AggregateReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{BOLD}Vigil Analysis{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Path: {}  Duration: {:.2}s\n",
        report.scan_path, report.scan_duration_seconds
    ));
    let sc = score_color(report.performance_score);
    out.push_str(&format!(
        "Score: {sc}{BOLD}{:.1}/100{RESET}  Issues: {} ",
        report.performance_score, report.total_issues
    ));

    let mut parts = Vec::new();
    if report.critical_issues > 0 {
        parts.push(format!("\x1b[31m{} critical{RESET}", report.critical_issues));
    }
    if report.high_issues > 0 {
        parts.push(format!("\x1b[91m{} high{RESET}", report.high_issues));
    }
    if report.medium_issues > 0 {
        parts.push(format!("\x1b[33m{} medium{RESET}", report.medium_issues));
    }
    if report.low_issues > 0 {
        parts.push(format!("\x1b[34m{} low{RESET}", report.low_issues));
    }
    if !parts.is_empty() {
        out.push_str(&format!("({})", parts.join(" | ")));
    }
    out.push_str("\n\n");

    for domain_report in [&report.memory, &report.cpu, &report.database, &report.cache]
        .into_iter()
        .flatten()
    {
        out.push_str(&render_domain(domain_report));
    }

    let verdict = if report.is_healthy() {
        format!("\x1b[32m{BOLD}HEALTHY{RESET}")
    } else {
        format!("\x1b[31m{BOLD}NEEDS ATTENTION{RESET}")
    };
    out.push_str(&format!("Result: {verdict}\n"));

    out
}

fn render_domain(report: &Report) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{BOLD}{}{RESET} {DIM}({} files, {} issues){RESET}\n",
        report.domain.as_str().to_uppercase(),
        report.total_files_scanned,
        report.issues_found
    ));

    if let Some(orm) = &report.orm_detected {
        out.push_str(&format!("  ORM detected: {orm}\n"));
    }
    if !report.cache_systems_detected.is_empty() {
        out.push_str(&format!(
            "  Cache systems: {}\n",
            report.cache_systems_detected.join(", ")
        ));
    }
    if report.total_functions_analyzed > 0 {
        out.push_str(&format!(
            "  Functions analyzed: {}  Avg complexity: {:.1}  Max: {:.0}\n",
            report.total_functions_analyzed, report.average_complexity, report.max_complexity
        ));
    }

    for finding in report.findings.iter().take(MAX_FINDINGS_PER_DOMAIN) {
        let color = severity_color(finding.severity);
        out.push_str(&format!(
            "  {color}[{}]{RESET} {}:{} {DIM}{}{RESET}\n",
            finding.severity.to_string().to_uppercase(),
            finding.file_path,
            finding.line_number,
            finding.pattern_name,
        ));
        out.push_str(&format!("    {}\n", finding.description));
    }

    let remaining = report.findings.len().saturating_sub(MAX_FINDINGS_PER_DOMAIN);
    if remaining > 0 {
        out.push_str(&format!("  {DIM}...and {remaining} more{RESET}\n"));
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::sample_aggregate;

    #[test]
    fn test_render_contains_score_and_findings() {
        let out = render(&sample_aggregate());
        assert!(out.contains("Vigil Analysis"));
        assert!(out.contains("85.0/100"));
        assert!(out.contains("views.py:5"));
        assert!(out.contains("objects_all_no_filter"));
        assert!(out.contains("NEEDS ATTENTION"));
    }

    #[test]
    fn test_render_shows_orm() {
        let out = render(&sample_aggregate());
        assert!(out.contains("ORM detected: Django ORM"));
    }

    #[test]
    fn test_healthy_verdict() {
        let mut aggregate = sample_aggregate();
        aggregate
            .report_mut(crate::models::Domain::Database)
            .expect("database report")
            .set_findings(Vec::new());
        aggregate
            .report_mut(crate::models::Domain::Memory)
            .expect("memory report")
            .set_findings(Vec::new());
        aggregate.calculate_totals();

        let out = render(&aggregate);
        assert!(out.contains("HEALTHY"));
    }
}
