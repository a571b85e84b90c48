//! Markdown reporter for GitHub-flavored Markdown output
//!
//! Suitable for pull request comments and documentation.

use crate::models::Report;
use crate::scoring::AggregateReport;

/// Maximum findings listed per domain table.
const MAX_FINDINGS_PER_DOMAIN: usize = 25;

/// Render report as GitHub-flavored Markdown
pub fn render(report: &AggregateReport) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "# Vigil Analysis Report\n\n**Score: {:.1}/100** | **{}**\n\nScanned `{}` in {:.2}s on {}.\n\n",
        report.performance_score,
        if report.is_healthy() { "Healthy" } else { "Needs attention" },
        report.scan_path,
        report.scan_duration_seconds,
        report.scanned_at.format("%Y-%m-%d %H:%M:%S UTC"),
    ));

    md.push_str("## Summary\n\n");
    md.push_str("| Severity | Count |\n|----------|-------|\n");
    md.push_str(&format!("| Critical | {} |\n", report.critical_issues));
    md.push_str(&format!("| High | {} |\n", report.high_issues));
    md.push_str(&format!("| Medium | {} |\n", report.medium_issues));
    md.push_str(&format!("| Low | {} |\n", report.low_issues));
    md.push_str(&format!("| **Total** | **{}** |\n\n", report.total_issues));

    for domain_report in [&report.memory, &report.cpu, &report.database, &report.cache]
        .into_iter()
        .flatten()
    {
        md.push_str(&render_domain(domain_report));
    }

    md
}

fn render_domain(report: &Report) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "## {} ({} files scanned, {} issues)\n\n",
        capitalize(report.domain.as_str()),
        report.total_files_scanned,
        report.issues_found
    ));

    if let Some(orm) = &report.orm_detected {
        md.push_str(&format!("Detected ORM: **{orm}**\n\n"));
    }
    if !report.cache_systems_detected.is_empty() {
        md.push_str(&format!(
            "Detected cache systems: **{}**\n\n",
            report.cache_systems_detected.join("**, **")
        ));
    }

    if report.findings.is_empty() {
        md.push_str("No issues found.\n\n");
        return md;
    }

    md.push_str("| Severity | Location | Pattern | Recommendation |\n");
    md.push_str("|----------|----------|---------|----------------|\n");
    for finding in report.findings.iter().take(MAX_FINDINGS_PER_DOMAIN) {
        md.push_str(&format!(
            "| {} | `{}:{}` | {} | {} |\n",
            capitalize(&finding.severity.to_string()),
            finding.file_path,
            finding.line_number,
            finding.pattern_name,
            finding.recommendation.replace('|', "\\|"),
        ));
    }

    let remaining = report.findings.len().saturating_sub(MAX_FINDINGS_PER_DOMAIN);
    if remaining > 0 {
        md.push_str(&format!("\n_...and {remaining} more._\n"));
    }
    md.push('\n');

    md
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
