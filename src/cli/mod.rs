//! Command-line interface
//!
//! Thin shell over the library: commands parse arguments, assemble a
//! `ScanConfig`, and hand findings to the reporters. No detection logic
//! lives here.

use crate::baseline::{BaselineReportFormat, BaselineStore, DEFAULT_BASELINE_FILE};
use crate::config::ScanConfig;
use crate::graph::default_engine;
use crate::models::{Domain, Severity};
use crate::reporters::{self, OutputFormat};
use crate::scanner::Scanner;
use crate::scoring::AggregateReport;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "vigil",
    version,
    about = "Multi-domain static analysis with baseline suppression"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a source tree and report findings
    Scan {
        /// Root path to scan (defaults to the current directory)
        path: Option<PathBuf>,
        /// Domains to run; defaults to all
        #[arg(long, value_enum)]
        domain: Vec<Domain>,
        /// Minimum severity to report
        #[arg(long, value_enum)]
        min_severity: Option<Severity>,
        /// Additional glob patterns to exclude
        #[arg(long)]
        exclude: Vec<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Suppress findings accepted in the baseline
        #[arg(long)]
        baseline: bool,
        /// Use fuzzy baseline matching (tolerates line drift)
        #[arg(long, requires = "baseline")]
        fuzzy: bool,
        /// Baseline file name, relative to the scan root
        #[arg(long, default_value = DEFAULT_BASELINE_FILE)]
        baseline_file: String,
    },
    /// Manage the baseline of accepted findings
    Baseline {
        #[command(subcommand)]
        command: BaselineCommand,
    },
    /// Detect circular imports in the Python module graph
    Deps {
        /// Root path to analyze (defaults to the current directory)
        path: Option<PathBuf>,
        /// Additional glob patterns to exclude
        #[arg(long)]
        exclude: Vec<String>,
    },
}

#[derive(Subcommand)]
enum BaselineCommand {
    /// Scan and accept all current findings into the baseline
    Create {
        path: Option<PathBuf>,
        /// Reason recorded on every new entry
        #[arg(long, default_value = "Initial baseline")]
        reason: String,
        #[arg(long, default_value = DEFAULT_BASELINE_FILE)]
        baseline_file: String,
    },
    /// List baseline entries
    List {
        path: Option<PathBuf>,
        /// Filter by violation type
        #[arg(long = "type")]
        violation_type: Option<String>,
        /// Filter by file path
        #[arg(long)]
        file: Option<String>,
        #[arg(long, default_value = DEFAULT_BASELINE_FILE)]
        baseline_file: String,
    },
    /// Show a baseline summary report
    Stats {
        path: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[arg(long, default_value = DEFAULT_BASELINE_FILE)]
        baseline_file: String,
    },
    /// Remove expired baseline entries
    Clean {
        path: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_BASELINE_FILE)]
        baseline_file: String,
    },
    /// Remove a baseline entry by violation id
    Remove {
        violation_id: String,
        path: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_BASELINE_FILE)]
        baseline_file: String,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Scan {
            path,
            domain,
            min_severity,
            exclude,
            format,
            baseline,
            fuzzy,
            baseline_file,
        } => run_scan(
            path, domain, min_severity, exclude, format, baseline, fuzzy, &baseline_file,
        ),
        Command::Baseline { command } => run_baseline(command),
        Command::Deps { path, exclude } => run_deps(path, exclude),
    }
}

fn resolve_root(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| PathBuf::from("."))
}

fn build_config(
    root: &Path,
    domains: &[Domain],
    min_severity: Option<Severity>,
    exclude: &[String],
) -> ScanConfig {
    let mut config = ScanConfig::load_from_root(root);
    config.scan_path = root.to_path_buf();
    if !domains.is_empty() {
        config.enabled_domains = domains.to_vec();
    }
    if let Some(severity) = min_severity {
        config.min_severity = severity;
    }
    config.exclude_patterns.extend(exclude.iter().cloned());
    config
}

#[allow(clippy::too_many_arguments)]
fn run_scan(
    path: Option<PathBuf>,
    domains: Vec<Domain>,
    min_severity: Option<Severity>,
    exclude: Vec<String>,
    format: OutputFormat,
    use_baseline: bool,
    fuzzy: bool,
    baseline_file: &str,
) -> Result<()> {
    let root = resolve_root(path);
    let config = build_config(&root, &domains, min_severity, &exclude);

    let enabled: Vec<Domain> = Domain::ALL
        .into_iter()
        .filter(|d| config.domain_enabled(*d))
        .collect();

    let progress = ProgressBar::new(enabled.len() as u64).with_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut aggregate = AggregateReport::new(root.display().to_string());
    let started = std::time::Instant::now();
    for domain in &enabled {
        progress.set_message(format!("scanning {domain}"));
        let report = Scanner::new(*domain, config.clone())
            .scan(Some(&root))
            .with_context(|| format!("{domain} scan failed"))?;
        aggregate.set_report(report);
        progress.inc(1);
    }
    progress.finish_and_clear();
    aggregate.scan_duration_seconds = started.elapsed().as_secs_f64();

    if use_baseline {
        let mut store = BaselineStore::with_file(&root, baseline_file);
        for domain in &enabled {
            if let Some(report) = aggregate.report_mut(*domain) {
                let findings = std::mem::take(&mut report.findings);
                let remaining = store
                    .filter_violations(findings, domain.as_str(), fuzzy)
                    .context("baseline filtering failed")?;
                report.set_findings(remaining);
            }
        }
    }
    aggregate.calculate_totals();

    match format {
        OutputFormat::Text => print!("{}", reporters::text::render(&aggregate)),
        OutputFormat::Json => println!("{}", reporters::json::render(&aggregate)?),
        OutputFormat::Markdown => print!("{}", reporters::markdown::render(&aggregate)),
    }

    Ok(())
}

fn run_baseline(command: BaselineCommand) -> Result<()> {
    match command {
        BaselineCommand::Create {
            path,
            reason,
            baseline_file,
        } => {
            let root = resolve_root(path);
            let config = build_config(&root, &[], None, &[]);
            let mut store = BaselineStore::with_file(&root, &baseline_file);

            let mut total = 0;
            for domain in Domain::ALL {
                if !config.domain_enabled(domain) {
                    continue;
                }
                let report = Scanner::new(domain, config.clone())
                    .scan(Some(&root))
                    .with_context(|| format!("{domain} scan failed"))?;
                total += store
                    .create_from_violations(&report.findings, domain.as_str(), &reason, "vigil")
                    .context("baseline update failed")?;
            }
            println!(
                "Baselined {total} findings into {}",
                store.baseline_path().display()
            );
        }
        BaselineCommand::List {
            path,
            violation_type,
            file,
            baseline_file,
        } => {
            let root = resolve_root(path);
            let mut store = BaselineStore::with_file(&root, &baseline_file);
            let entries = store.list_entries(violation_type.as_deref(), file.as_deref())?;
            if entries.is_empty() {
                println!("No baseline entries.");
            }
            for entry in entries {
                let status = if entry.is_expired() { " [expired]" } else { "" };
                println!(
                    "{}  {}:{} [{}]{} - {}",
                    entry.violation_id,
                    entry.file_path,
                    entry.line_number,
                    entry.violation_type,
                    status,
                    entry.reason
                );
            }
        }
        BaselineCommand::Stats {
            path,
            format,
            baseline_file,
        } => {
            let root = resolve_root(path);
            let mut store = BaselineStore::with_file(&root, &baseline_file);
            let report_format = match format {
                OutputFormat::Text => BaselineReportFormat::Text,
                OutputFormat::Json => BaselineReportFormat::Json,
                OutputFormat::Markdown => BaselineReportFormat::Markdown,
            };
            println!("{}", store.generate_report(report_format)?);
        }
        BaselineCommand::Clean {
            path,
            baseline_file,
        } => {
            let root = resolve_root(path);
            let mut store = BaselineStore::with_file(&root, &baseline_file);
            let removed = store.clean_expired()?;
            println!("Removed {removed} expired entries.");
        }
        BaselineCommand::Remove {
            violation_id,
            path,
            baseline_file,
        } => {
            let root = resolve_root(path);
            let mut store = BaselineStore::with_file(&root, &baseline_file);
            if store.remove_entry(&violation_id)? {
                println!("Removed {violation_id}.");
            } else {
                println!("No entry with id {violation_id}.");
            }
        }
    }
    Ok(())
}

fn run_deps(path: Option<PathBuf>, exclude: Vec<String>) -> Result<()> {
    let root = resolve_root(path);
    let config = build_config(&root, &[], None, &exclude);
    let engine = default_engine();
    let findings =
        crate::analysis::ImportAnalyzer::new(engine.as_ref()).analyze(&root, &config.exclude_patterns);

    if findings.is_empty() {
        println!("No circular imports found.");
        return Ok(());
    }

    println!("{} circular import chain(s):", findings.len());
    for finding in findings {
        println!(
            "  [{}] {}:{} {}",
            finding.severity.to_string().to_uppercase(),
            finding.file_path,
            finding.line_number,
            finding.description
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_flags() {
        let cli = Cli::try_parse_from([
            "vigil",
            "scan",
            "src",
            "--domain",
            "database",
            "--min-severity",
            "medium",
            "--baseline",
            "--fuzzy",
            "--format",
            "json",
        ])
        .expect("flags parse");

        match cli.command {
            Command::Scan {
                path,
                domain,
                min_severity,
                baseline,
                fuzzy,
                format,
                ..
            } => {
                assert_eq!(path, Some(PathBuf::from("src")));
                assert_eq!(domain, vec![Domain::Database]);
                assert_eq!(min_severity, Some(Severity::Medium));
                assert!(baseline);
                assert!(fuzzy);
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected scan command"),
        }
    }

    #[test]
    fn test_fuzzy_requires_baseline() {
        let result = Cli::try_parse_from(["vigil", "scan", "--fuzzy"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_baseline_create_defaults() {
        let cli = Cli::try_parse_from(["vigil", "baseline", "create"]).expect("parse");
        match cli.command {
            Command::Baseline {
                command: BaselineCommand::Create { reason, baseline_file, .. },
            } => {
                assert_eq!(reason, "Initial baseline");
                assert_eq!(baseline_file, DEFAULT_BASELINE_FILE);
            }
            _ => panic!("expected baseline create"),
        }
    }
}
