//! Baseline persistence and filtering
//!
//! `BaselineStore` owns one baseline document: lazily loaded on first
//! access, held for the store's lifetime, and flushed on every mutating
//! operation. Writes are atomic (temp file + rename) so an interrupted
//! save never leaves a corrupt document. A document that fails to decode
//! is a fatal error, not a silent reset: discarding baselined entries
//! would resurface previously-accepted findings.

use crate::baseline::{BaselineEntry, BaselineFile, BaselineStats};
use crate::models::Finding;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Default baseline document name, relative to the project root.
pub const DEFAULT_BASELINE_FILE: &str = ".vigil-baseline.json";

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("baseline I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("baseline document at {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Output formats for `generate_report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineReportFormat {
    Text,
    Json,
    Markdown,
}

/// Owns a baseline document and its path. Construct one per project; the
/// on-disk file is a single-writer resource and concurrent stores over the
/// same path are not supported.
pub struct BaselineStore {
    project_path: PathBuf,
    baseline_path: PathBuf,
    document: Option<BaselineFile>,
}

impl BaselineStore {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self::with_file(project_path, DEFAULT_BASELINE_FILE)
    }

    pub fn with_file(project_path: impl Into<PathBuf>, file_name: &str) -> Self {
        let project_path = project_path.into();
        let baseline_path = project_path.join(file_name);
        Self {
            project_path,
            baseline_path,
            document: None,
        }
    }

    pub fn baseline_path(&self) -> &Path {
        &self.baseline_path
    }

    /// Stable content-derived id: first 12 hex chars of
    /// SHA-256("{file}:{line}:{type}:{message}").
    pub fn violation_id(
        file_path: &str,
        line_number: u32,
        violation_type: &str,
        message: &str,
    ) -> String {
        let content = format!("{file_path}:{line_number}:{violation_type}:{message}");
        let digest = Sha256::digest(content.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        hex[..12].to_string()
    }

    /// Load the document, creating a fresh one when no file exists yet.
    fn load(&mut self) -> Result<&mut BaselineFile, BaselineError> {
        if self.document.is_none() {
            let document = if self.baseline_path.exists() {
                let content =
                    std::fs::read_to_string(&self.baseline_path).map_err(|source| {
                        BaselineError::Io {
                            path: self.baseline_path.clone(),
                            source,
                        }
                    })?;
                serde_json::from_str(&content).map_err(|source| BaselineError::Corrupt {
                    path: self.baseline_path.clone(),
                    source,
                })?
            } else {
                BaselineFile::new(self.project_path.display().to_string())
            };
            self.document = Some(document);
        }

        Ok(self.document.as_mut().expect("document just loaded"))
    }

    /// Persist the document. Always a full rewrite: serialize to a sibling
    /// temp file, then rename over the original.
    fn save(&mut self) -> Result<(), BaselineError> {
        let Some(document) = self.document.as_mut() else {
            return Ok(());
        };
        document.updated_at = Utc::now();

        let json = serde_json::to_string_pretty(document).map_err(|source| {
            BaselineError::Corrupt {
                path: self.baseline_path.clone(),
                source,
            }
        })?;

        let tmp_path = self.baseline_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|source| BaselineError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.baseline_path).map_err(|source| BaselineError::Io {
            path: self.baseline_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Baseline a batch of findings under one violation type. Findings with
    /// a live exact match are skipped; returns the number of entries
    /// actually added. Persists once at the end.
    pub fn create_from_violations(
        &mut self,
        findings: &[Finding],
        violation_type: &str,
        reason: &str,
        created_by: &str,
    ) -> Result<usize, BaselineError> {
        let project_path = self.project_path.clone();
        let document = self.load()?;
        let mut added = 0;

        for finding in findings {
            let file_path = relative_path(&project_path, &finding.file_path);
            if document
                .find_match(&file_path, finding.line_number, violation_type)
                .is_some()
            {
                continue;
            }

            let message = finding.description.clone();
            let violation_id = Self::violation_id(
                &file_path,
                finding.line_number,
                violation_type,
                &message,
            );
            document.add_entry(BaselineEntry {
                file_path,
                line_number: finding.line_number,
                violation_type: violation_type.to_string(),
                violation_id,
                message,
                reason: reason.to_string(),
                created_at: Utc::now(),
                created_by: created_by.to_string(),
                expires_at: None,
            });
            added += 1;
        }

        self.save()?;
        info!("Baselined {added} {violation_type} findings");
        Ok(added)
    }

    /// Return the findings with no matching baseline entry, preserving
    /// order. Exact matching keys on (file, line, type); fuzzy matching
    /// keys on (file, type, message) to survive line drift.
    pub fn filter_violations(
        &mut self,
        findings: Vec<Finding>,
        violation_type: &str,
        fuzzy: bool,
    ) -> Result<Vec<Finding>, BaselineError> {
        let project_path = self.project_path.clone();
        let document = self.load()?;

        Ok(findings
            .into_iter()
            .filter(|finding| {
                let file_path = relative_path(&project_path, &finding.file_path);
                let matched = if fuzzy {
                    document
                        .find_fuzzy_match(&file_path, violation_type, &finding.description)
                        .is_some()
                } else {
                    document
                        .find_match(&file_path, finding.line_number, violation_type)
                        .is_some()
                };
                !matched
            })
            .collect())
    }

    /// How many of `findings` are already baselined.
    pub fn baselined_count(
        &mut self,
        findings: &[Finding],
        violation_type: &str,
    ) -> Result<usize, BaselineError> {
        let total = findings.len();
        let new = self
            .filter_violations(findings.to_vec(), violation_type, false)?
            .len();
        Ok(total - new)
    }

    /// Manually add one entry; no-op returning false on a live exact
    /// duplicate.
    pub fn add_entry(
        &mut self,
        file_path: &str,
        line_number: u32,
        violation_type: &str,
        message: &str,
        reason: &str,
        created_by: &str,
    ) -> Result<bool, BaselineError> {
        let rel_path = relative_path(&self.project_path, file_path);
        let document = self.load()?;

        if document
            .find_match(&rel_path, line_number, violation_type)
            .is_some()
        {
            return Ok(false);
        }

        let violation_id = Self::violation_id(&rel_path, line_number, violation_type, message);
        document.add_entry(BaselineEntry {
            file_path: rel_path,
            line_number,
            violation_type: violation_type.to_string(),
            violation_id,
            message: message.to_string(),
            reason: reason.to_string(),
            created_at: Utc::now(),
            created_by: created_by.to_string(),
            expires_at: None,
        });

        self.save()?;
        Ok(true)
    }

    /// Remove entries by id; persists only when something was removed.
    pub fn remove_entry(&mut self, violation_id: &str) -> Result<bool, BaselineError> {
        let removed = self.load()?.remove_entry(violation_id);
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Drop expired entries; persists only when something was removed.
    pub fn clean_expired(&mut self) -> Result<usize, BaselineError> {
        let removed = self.load()?.clean_expired();
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn stats(&mut self) -> Result<BaselineStats, BaselineError> {
        Ok(self.load()?.stats())
    }

    /// Entries matching the optional type/file filters.
    pub fn list_entries(
        &mut self,
        violation_type: Option<&str>,
        file_path: Option<&str>,
    ) -> Result<Vec<BaselineEntry>, BaselineError> {
        let rel_path = file_path.map(|p| relative_path(&self.project_path, p));
        let document = self.load()?;

        Ok(document
            .entries
            .iter()
            .filter(|e| violation_type.map(|t| e.violation_type == t).unwrap_or(true))
            .filter(|e| rel_path.as_deref().map(|p| e.file_path == p).unwrap_or(true))
            .cloned()
            .collect())
    }

    /// Render a human-readable summary of the baseline document.
    pub fn generate_report(
        &mut self,
        format: BaselineReportFormat,
    ) -> Result<String, BaselineError> {
        let baseline_path = self.baseline_path.clone();
        let document = self.load()?;
        let stats = document.stats();

        Ok(match format {
            BaselineReportFormat::Json => serde_json::to_string_pretty(document)
                .map_err(|source| BaselineError::Corrupt {
                    path: baseline_path,
                    source,
                })?,
            BaselineReportFormat::Markdown => render_markdown(document, &stats),
            BaselineReportFormat::Text => render_text(document, &stats, &baseline_path),
        })
    }
}

/// Convert an absolute path to one relative to the project root; paths
/// already relative pass through unchanged.
fn relative_path(project_path: &Path, path: &str) -> String {
    let candidate = Path::new(path);
    match candidate.strip_prefix(project_path) {
        Ok(stripped) => stripped.display().to_string(),
        Err(_) => path.to_string(),
    }
}

fn render_text(document: &BaselineFile, stats: &BaselineStats, baseline_path: &Path) -> String {
    let mut lines = vec![
        "=".repeat(60),
        "BASELINE REPORT".to_string(),
        "=".repeat(60),
        String::new(),
        format!("Baseline File: {}", baseline_path.display()),
        format!("Created: {}", document.created_at.format("%Y-%m-%d %H:%M:%S")),
        format!("Updated: {}", document.updated_at.format("%Y-%m-%d %H:%M:%S")),
        String::new(),
        "SUMMARY".to_string(),
        "-".repeat(40),
        format!("Total Entries: {}", stats.total_entries),
        format!("Active: {}", stats.active_entries),
        format!("Expired: {}", stats.expired_entries),
        String::new(),
    ];

    if !stats.entries_by_type.is_empty() {
        lines.push("By Type:".to_string());
        lines.push("-".repeat(20));
        for (vtype, count) in &stats.entries_by_type {
            lines.push(format!("  {vtype}: {count}"));
        }
        lines.push(String::new());
    }

    if !stats.entries_by_file.is_empty() {
        lines.push("Top Files:".to_string());
        lines.push("-".repeat(20));
        let mut by_file: Vec<(&String, &usize)> = stats.entries_by_file.iter().collect();
        by_file.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (file, count) in by_file.into_iter().take(10) {
            lines.push(format!("  {file}: {count}"));
        }
        lines.push(String::new());
    }

    if !document.entries.is_empty() {
        lines.push("ENTRIES".to_string());
        lines.push("-".repeat(40));
        for entry in document.entries.iter().take(30) {
            let status = if entry.is_expired() { " [EXPIRED]" } else { "" };
            lines.push(format!(
                "  {}:{} [{}]{}",
                entry.file_path, entry.line_number, entry.violation_type, status
            ));
        }
        if document.entries.len() > 30 {
            lines.push(format!("  ... and {} more", document.entries.len() - 30));
        }
    }

    lines.push("=".repeat(60));
    lines.join("\n")
}

fn render_markdown(document: &BaselineFile, stats: &BaselineStats) -> String {
    let mut lines = vec![
        "# Baseline Report".to_string(),
        String::new(),
        format!("**Created:** {}", document.created_at.format("%Y-%m-%d %H:%M:%S")),
        format!("**Updated:** {}", document.updated_at.format("%Y-%m-%d %H:%M:%S")),
        String::new(),
        "## Summary".to_string(),
        String::new(),
        "| Metric | Value |".to_string(),
        "|--------|-------|".to_string(),
        format!("| Total Entries | {} |", stats.total_entries),
        format!("| Active | {} |", stats.active_entries),
        format!("| Expired | {} |", stats.expired_entries),
        String::new(),
    ];

    if !stats.entries_by_type.is_empty() {
        lines.push("## By Type".to_string());
        lines.push(String::new());
        lines.push("| Type | Count |".to_string());
        lines.push("|------|-------|".to_string());
        for (vtype, count) in &stats.entries_by_type {
            lines.push(format!("| {vtype} | {count} |"));
        }
        lines.push(String::new());
    }

    if !document.entries.is_empty() {
        lines.push("## Entries".to_string());
        lines.push(String::new());
        lines.push("| File | Line | Type | Status |".to_string());
        lines.push("|------|------|------|--------|".to_string());
        for entry in document.entries.iter().take(50) {
            let status = if entry.is_expired() { "Expired" } else { "Active" };
            lines.push(format!(
                "| `{}` | {} | {} | {} |",
                entry.file_path, entry.line_number, entry.violation_type, status
            ));
        }
    }

    lines.join("\n")
}
