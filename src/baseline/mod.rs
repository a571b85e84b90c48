//! Baseline suppression
//!
//! A baseline is a persisted allow-list of previously-accepted findings.
//! `BaselineStore` owns the on-disk document and is the only way to mutate
//! it; matching supports exact (file, line, type) and fuzzy (file, type,
//! message) keys, and entries can carry an expiry evaluated at match time.

mod store;

pub use store::{BaselineError, BaselineReportFormat, BaselineStore, DEFAULT_BASELINE_FILE};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current baseline document format version.
pub const BASELINE_VERSION: &str = "1.0.0";

/// A single accepted violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub file_path: String,
    pub line_number: u32,
    pub violation_type: String,
    pub violation_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl BaselineEntry {
    /// Expiry is evaluated against the current clock on every call, never
    /// precomputed, so an entry lapses the moment its deadline passes.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Utc::now() > deadline,
            None => false,
        }
    }

    /// Exact match on file, line, and type; expired entries never match.
    pub fn matches(&self, file_path: &str, line_number: u32, violation_type: &str) -> bool {
        self.file_path == file_path
            && self.line_number == line_number
            && self.violation_type == violation_type
            && !self.is_expired()
    }

    /// Fuzzy match ignoring the line number, for findings whose lines have
    /// drifted due to unrelated edits upstream in the file.
    pub fn matches_fuzzy(&self, file_path: &str, violation_type: &str, message: &str) -> bool {
        self.file_path == file_path
            && self.violation_type == violation_type
            && self.message == message
            && !self.is_expired()
    }
}

/// Summary counters over a baseline document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselineStats {
    pub total_entries: usize,
    pub active_entries: usize,
    pub expired_entries: usize,
    pub entries_by_type: BTreeMap<String, usize>,
    pub entries_by_file: BTreeMap<String, usize>,
}

/// Root persisted document, one per project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineFile {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub project_path: String,
    #[serde(default)]
    pub entries: Vec<BaselineEntry>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl BaselineFile {
    pub fn new(project_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            version: BASELINE_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            project_path: project_path.into(),
            entries: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn add_entry(&mut self, entry: BaselineEntry) {
        self.entries.push(entry);
        self.updated_at = Utc::now();
    }

    /// Remove all entries with the given id. Returns whether any were
    /// removed; ids are unique in practice.
    pub fn remove_entry(&mut self, violation_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.violation_id != violation_id);
        if self.entries.len() < before {
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    pub fn find_match(
        &self,
        file_path: &str,
        line_number: u32,
        violation_type: &str,
    ) -> Option<&BaselineEntry> {
        self.entries
            .iter()
            .find(|e| e.matches(file_path, line_number, violation_type))
    }

    pub fn find_fuzzy_match(
        &self,
        file_path: &str,
        violation_type: &str,
        message: &str,
    ) -> Option<&BaselineEntry> {
        self.entries
            .iter()
            .find(|e| e.matches_fuzzy(file_path, violation_type, message))
    }

    pub fn stats(&self) -> BaselineStats {
        let mut stats = BaselineStats {
            total_entries: self.entries.len(),
            ..BaselineStats::default()
        };

        for entry in &self.entries {
            *stats
                .entries_by_type
                .entry(entry.violation_type.clone())
                .or_insert(0) += 1;
            *stats
                .entries_by_file
                .entry(entry.file_path.clone())
                .or_insert(0) += 1;
            if entry.is_expired() {
                stats.expired_entries += 1;
            } else {
                stats.active_entries += 1;
            }
        }

        stats
    }

    /// Drop expired entries; returns how many were removed.
    pub fn clean_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.is_expired());
        let removed = before - self.entries.len();
        if removed > 0 {
            self.updated_at = Utc::now();
        }
        removed
    }
}
