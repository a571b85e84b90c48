//! Core data models for Vigil
//!
//! These models are used throughout the codebase for representing
//! analysis domains, findings, and per-domain scan reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity levels for findings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Analysis domains
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Memory,
    Cpu,
    Database,
    Cache,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Domain::Memory, Domain::Cpu, Domain::Database, Domain::Cache];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Memory => "memory",
            Domain::Cpu => "cpu",
            Domain::Database => "database",
            Domain::Cache => "cache",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue classifications across all domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    // Memory
    MemoryLeak,
    HighAllocation,
    CircularReference,
    LargeObject,
    UnboundedGrowth,
    InefficientStructure,
    // CPU
    HighComplexity,
    InefficientLoop,
    BlockingOperation,
    ExcessiveRecursion,
    RedundantComputation,
    SynchronousIo,
    // Database
    NPlusOne,
    MissingIndex,
    FullTableScan,
    ExcessiveQueries,
    UnoptimizedJoin,
    NoPagination,
    EagerLoading,
    // Cache
    MissingCache,
    CacheMiss,
    StaleCache,
    InefficientKey,
    CacheStampede,
    OverCaching,
    // Dependency analysis
    CircularImport,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::MemoryLeak => "memory_leak",
            IssueType::HighAllocation => "high_allocation",
            IssueType::CircularReference => "circular_reference",
            IssueType::LargeObject => "large_object",
            IssueType::UnboundedGrowth => "unbounded_growth",
            IssueType::InefficientStructure => "inefficient_structure",
            IssueType::HighComplexity => "high_complexity",
            IssueType::InefficientLoop => "inefficient_loop",
            IssueType::BlockingOperation => "blocking_operation",
            IssueType::ExcessiveRecursion => "excessive_recursion",
            IssueType::RedundantComputation => "redundant_computation",
            IssueType::SynchronousIo => "synchronous_io",
            IssueType::NPlusOne => "n_plus_one",
            IssueType::MissingIndex => "missing_index",
            IssueType::FullTableScan => "full_table_scan",
            IssueType::ExcessiveQueries => "excessive_queries",
            IssueType::UnoptimizedJoin => "unoptimized_join",
            IssueType::NoPagination => "no_pagination",
            IssueType::EagerLoading => "eager_loading",
            IssueType::MissingCache => "missing_cache",
            IssueType::CacheMiss => "cache_miss",
            IssueType::StaleCache => "stale_cache",
            IssueType::InefficientKey => "inefficient_key",
            IssueType::CacheStampede => "cache_stampede",
            IssueType::OverCaching => "over_caching",
            IssueType::CircularImport => "circular_import",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected issue at a specific file and line.
///
/// Paths are always stored relative to the scan root, never absolute,
/// so findings stay comparable across machines and baseline entries
/// survive checkouts at different locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub file_path: String,
    pub line_number: u32,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    pub pattern_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_score: Option<u32>,
    pub estimated_impact: String,
    pub recommendation: String,
    pub code_snippet: String,
}

/// Report for a single analysis domain.
///
/// `issues_found` always equals `findings.len()` after severity filtering;
/// findings are sorted Critical-first with discovery order preserved
/// within a severity tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub domain: Domain,
    pub scan_path: String,
    pub total_files_scanned: usize,
    pub issues_found: usize,
    pub findings: Vec<Finding>,
    pub scan_duration_seconds: f64,
    pub scanned_at: DateTime<Utc>,

    /// ORM framework detected while scanning (database domain only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orm_detected: Option<String>,
    /// Cache systems detected while scanning (cache domain only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cache_systems_detected: Vec<String>,
    /// Functions analyzed for complexity (cpu domain only).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub total_functions_analyzed: usize,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub average_complexity: f64,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub max_complexity: f64,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

fn is_zero_f64(n: &f64) -> bool {
    *n == 0.0
}

impl Report {
    pub fn new(domain: Domain, scan_path: impl Into<String>) -> Self {
        Self {
            domain,
            scan_path: scan_path.into(),
            total_files_scanned: 0,
            issues_found: 0,
            findings: Vec::new(),
            scan_duration_seconds: 0.0,
            scanned_at: Utc::now(),
            orm_detected: None,
            cache_systems_detected: Vec::new(),
            total_functions_analyzed: 0,
            average_complexity: 0.0,
            max_complexity: 0.0,
        }
    }

    pub fn add_finding(&mut self, finding: Finding) {
        self.issues_found += 1;
        self.findings.push(finding);
    }

    pub fn has_findings(&self) -> bool {
        self.issues_found > 0
    }

    /// Replace the finding list, keeping `issues_found` consistent.
    /// Used after baseline filtering.
    pub fn set_findings(&mut self, findings: Vec<Finding>) {
        self.issues_found = findings.len();
        self.findings = findings;
    }
}
