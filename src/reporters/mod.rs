//! Report rendering
//!
//! Renders an `AggregateReport` for terminals (`text`), machines (`json`),
//! and pull requests or docs (`markdown`). Rendering consumes the report;
//! it never computes findings or scores itself.

pub mod json;
pub mod markdown;
pub mod text;

use clap::ValueEnum;

/// Output format selector shared by the CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
}
