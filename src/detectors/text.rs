//! Line-oriented regex rule engine
//!
//! Scans file content against a `RuleSet`. A rule fires at most once per
//! line (first match only), but one line may fire several distinct rules.
//! Rules are matched against comment-masked content so matches inside
//! comments and docstrings never surface; snippets are always rendered
//! from the original lines.

use crate::detectors::masking::mask_comments;
use crate::detectors::rules::{Rule, RuleSet};

/// Number of context lines above and below a match in a snippet.
pub const SNIPPET_CONTEXT_LINES: usize = 2;

/// A raw rule hit, before it is turned into a `Finding` by the scanner.
pub struct TextMatch<'a> {
    pub rule: &'a Rule,
    pub line_number: u32,
    pub code_snippet: String,
}

pub struct TextDetector<'a> {
    rules: &'a RuleSet,
    context_lines: usize,
}

impl<'a> TextDetector<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            context_lines: SNIPPET_CONTEXT_LINES,
        }
    }

    /// Override the snippet context width (default 2 lines each side).
    pub fn with_context_lines(mut self, context: usize) -> Self {
        self.context_lines = context;
        self
    }

    /// Scan `content` as a file with the given extension.
    pub fn scan(&self, content: &str, extension: &str) -> Vec<TextMatch<'a>> {
        let mut matches = Vec::new();
        if content.is_empty() {
            return matches;
        }

        let rules = self.rules.applicable(extension);
        if rules.is_empty() {
            return matches;
        }

        let masked = mask_comments(content, extension);
        let masked_lines: Vec<&str> = masked.lines().collect();
        let source_lines: Vec<&str> = content.lines().collect();

        for rule in rules {
            for (i, line) in masked_lines.iter().enumerate() {
                if rule.regex.is_match(line) {
                    let line_number = (i + 1) as u32;
                    matches.push(TextMatch {
                        rule,
                        line_number,
                        code_snippet: extract_code_snippet(
                            &source_lines,
                            i + 1,
                            self.context_lines,
                        ),
                    });
                }
            }
        }

        matches
    }
}

/// Extract a code snippet around a 1-based line number.
///
/// Each line is prefixed with its line number; the target line carries a
/// `>>>` marker. Out-of-range context clamps to the file bounds.
pub fn extract_code_snippet(lines: &[&str], line_number: usize, context_lines: usize) -> String {
    if lines.is_empty() || line_number < 1 {
        return String::new();
    }

    let start_idx = line_number.saturating_sub(1).saturating_sub(context_lines);
    let end_idx = (line_number + context_lines).min(lines.len());

    let mut snippet = Vec::with_capacity(end_idx - start_idx);
    for (i, line) in lines.iter().enumerate().take(end_idx).skip(start_idx) {
        let n = i + 1;
        let marker = if n == line_number { ">>> " } else { "    " };
        snippet.push(format!("{marker}{n}: {}", line.trim_end()));
    }

    snippet.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::rules::RuleSet;
    use crate::models::IssueType;

    #[test]
    fn test_detects_pattern_on_line() {
        let rules = RuleSet::database();
        let detector = TextDetector::new(&rules);
        let content = "from app.models import User\n\nusers = User.objects.all()\n";

        let matches = detector.scan(content, "py");
        let hit = matches
            .iter()
            .find(|m| m.rule.name == "objects_all_no_filter")
            .expect("should detect objects.all()");
        assert_eq!(hit.line_number, 3);
        assert_eq!(hit.rule.issue_type, IssueType::FullTableScan);
    }

    #[test]
    fn test_rule_fires_once_per_line() {
        let rules = RuleSet::memory();
        let detector = TextDetector::new(&rules);
        // Two readlines() calls on one line still count once.
        let content = "data = f.readlines() + g.readlines()\n";

        let matches = detector.scan(content, "py");
        let hits: Vec<_> = matches
            .iter()
            .filter(|m| m.rule.name == "readlines_call")
            .collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_line_may_fire_multiple_rules() {
        let rules = RuleSet::database();
        let detector = TextDetector::new(&rules);
        let content = "cursor.execute(\"SELECT * FROM users\")\n";

        let matches = detector.scan(content, "py");
        let names: Vec<&str> = matches.iter().map(|m| m.rule.name).collect();
        assert!(names.contains(&"cursor_execute"));
        assert!(names.contains(&"select_star"));
    }

    #[test]
    fn test_match_in_comment_suppressed() {
        let rules = RuleSet::memory();
        let detector = TextDetector::new(&rules);
        let content = "# data = f.readlines()\nvalue = 1\n";

        let matches = detector.scan(content, "py");
        assert!(matches.is_empty());
    }

    #[test]
    fn test_match_in_docstring_suppressed() {
        let rules = RuleSet::database();
        let detector = TextDetector::new(&rules);
        let content = r#"def fetch():
    """
    Never use User.objects.all()
    or SELECT * FROM users in new code.
    """
    return fetch_page(0)
"#;

        let matches = detector.scan(content, "py");
        assert!(matches.is_empty());
    }

    #[test]
    fn test_extension_filtering() {
        let rules = RuleSet::memory();
        let detector = TextDetector::new(&rules);
        let content = "data = f.readlines()\n";

        // readlines_call is a Python-only rule.
        assert!(detector.scan(content, "js").is_empty());
        assert!(!detector.scan(content, "py").is_empty());
    }

    #[test]
    fn test_empty_content_yields_nothing() {
        let rules = RuleSet::cpu();
        let detector = TextDetector::new(&rules);
        assert!(detector.scan("", "py").is_empty());
    }

    #[test]
    fn test_snippet_three_lines_with_marker() {
        let snippet = extract_code_snippet(&["a", "b", "c"], 2, 1);
        let lines: Vec<&str> = snippet.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "    1: a");
        assert_eq!(lines[1], ">>> 2: b");
        assert_eq!(lines[2], "    3: c");
    }

    #[test]
    fn test_snippet_clamps_at_bounds() {
        let snippet = extract_code_snippet(&["only"], 1, 2);
        assert_eq!(snippet, ">>> 1: only");

        let snippet = extract_code_snippet(&["a", "b"], 1, 2);
        let lines: Vec<&str> = snippet.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], ">>> 1: a");
    }

    #[test]
    fn test_snippet_empty_input() {
        assert_eq!(extract_code_snippet(&[], 1, 2), "");
        assert_eq!(extract_code_snippet(&["a"], 0, 2), "");
    }

    #[test]
    fn test_snippet_default_context() {
        let lines = ["l1", "l2", "l3", "l4", "l5", "l6"];
        let snippet = extract_code_snippet(&lines, 3, SNIPPET_CONTEXT_LINES);
        let out: Vec<&str> = snippet.lines().collect();
        assert_eq!(out.len(), 5);
        assert!(out[2].starts_with(">>> 3:"));
    }
}
