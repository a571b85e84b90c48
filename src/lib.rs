//! Vigil - multi-domain static analysis with baseline suppression
//!
//! Walks a source tree, applies pattern-based and structure-based
//! detectors (memory, cpu, database, cache), aggregates severity-ranked
//! findings into a scored report, and suppresses previously-accepted
//! findings via a persisted baseline.

pub mod analysis;
pub mod baseline;
pub mod cli;
pub mod config;
pub mod detectors;
pub mod graph;
pub mod models;
pub mod reporters;
pub mod scanner;
pub mod scoring;
pub mod walker;
