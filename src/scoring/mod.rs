//! Report aggregation and health scoring
//!
//! Merges per-domain reports into an overall report with a 0-100 score
//! derived from weighted severity counts. Totals are always recomputed in
//! full so they stay correct after a domain report's findings change, e.g.
//! after baseline filtering.

use crate::models::{Domain, Finding, Report, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score deduction per finding, by severity.
const CRITICAL_WEIGHT: f64 = 20.0;
const HIGH_WEIGHT: f64 = 10.0;
const MEDIUM_WEIGHT: f64 = 5.0;
const LOW_WEIGHT: f64 = 2.0;

/// Combined report across all scanned domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub scan_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Report>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Report>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<Report>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<Report>,
    pub total_issues: usize,
    pub critical_issues: usize,
    pub high_issues: usize,
    pub medium_issues: usize,
    pub low_issues: usize,
    pub performance_score: f64,
    pub scan_duration_seconds: f64,
    pub scanned_at: DateTime<Utc>,
}

impl AggregateReport {
    pub fn new(scan_path: impl Into<String>) -> Self {
        Self {
            scan_path: scan_path.into(),
            memory: None,
            cpu: None,
            database: None,
            cache: None,
            total_issues: 0,
            critical_issues: 0,
            high_issues: 0,
            medium_issues: 0,
            low_issues: 0,
            performance_score: 100.0,
            scan_duration_seconds: 0.0,
            scanned_at: Utc::now(),
        }
    }

    /// Install a domain report into its slot.
    pub fn set_report(&mut self, report: Report) {
        match report.domain {
            Domain::Memory => self.memory = Some(report),
            Domain::Cpu => self.cpu = Some(report),
            Domain::Database => self.database = Some(report),
            Domain::Cache => self.cache = Some(report),
        }
    }

    pub fn report(&self, domain: Domain) -> Option<&Report> {
        match domain {
            Domain::Memory => self.memory.as_ref(),
            Domain::Cpu => self.cpu.as_ref(),
            Domain::Database => self.database.as_ref(),
            Domain::Cache => self.cache.as_ref(),
        }
    }

    pub fn report_mut(&mut self, domain: Domain) -> Option<&mut Report> {
        match domain {
            Domain::Memory => self.memory.as_mut(),
            Domain::Cpu => self.cpu.as_mut(),
            Domain::Database => self.database.as_mut(),
            Domain::Cache => self.cache.as_mut(),
        }
    }

    /// Every finding across all domain reports, in domain order.
    pub fn all_findings(&self) -> impl Iterator<Item = &Finding> {
        [&self.memory, &self.cpu, &self.database, &self.cache]
            .into_iter()
            .flatten()
            .flat_map(|r| r.findings.iter())
    }

    /// Recompute counters and the performance score from scratch.
    ///
    /// Never incremental: a domain report's findings may have been replaced
    /// since the last call (baseline filtering), so cached totals are
    /// untrustworthy by construction.
    pub fn calculate_totals(&mut self) {
        let mut total_issues = 0;
        let mut critical_issues = 0;
        let mut high_issues = 0;
        let mut medium_issues = 0;
        let mut low_issues = 0;

        for finding in self.all_findings() {
            total_issues += 1;
            match finding.severity {
                Severity::Critical => critical_issues += 1,
                Severity::High => high_issues += 1,
                Severity::Medium => medium_issues += 1,
                Severity::Low => low_issues += 1,
                Severity::Info => {}
            }
        }

        self.total_issues = total_issues;
        self.critical_issues = critical_issues;
        self.high_issues = high_issues;
        self.medium_issues = medium_issues;
        self.low_issues = low_issues;

        let deduction = self.critical_issues as f64 * CRITICAL_WEIGHT
            + self.high_issues as f64 * HIGH_WEIGHT
            + self.medium_issues as f64 * MEDIUM_WEIGHT
            + self.low_issues as f64 * LOW_WEIGHT;
        self.performance_score = (100.0 - deduction).max(0.0);
    }

    pub fn has_issues(&self) -> bool {
        self.total_issues > 0
    }

    /// Healthy means nothing at Medium severity or above; Low and Info
    /// findings alone do not make a report unhealthy.
    pub fn is_healthy(&self) -> bool {
        !self
            .all_findings()
            .any(|f| f.severity >= Severity::Medium)
    }
}
