//! Detection framework
//!
//! Rule-based text detection with comment awareness:
//! - `rules` defines the per-domain `RuleSet` values
//! - `masking` blanks comments/docstrings before matching
//! - `text` runs rules line-by-line and renders code snippets

mod masking;
mod rules;
mod text;

pub use masking::mask_comments;
pub use rules::{Rule, RuleSet};
pub use text::{extract_code_snippet, TextDetector, TextMatch, SNIPPET_CONTEXT_LINES};
