//! Detection rules
//!
//! Each domain carries an explicit, immutable `RuleSet` constructed at
//! startup and handed to the detector. There is no global registry; tests
//! build isolated rule sets as needed.

use crate::models::{Domain, IssueType, Severity};
use regex::Regex;

/// A named detection pattern tagged with classification and remediation.
pub struct Rule {
    pub name: &'static str,
    pub regex: Regex,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub extensions: &'static [&'static str],
    pub description: &'static str,
    pub estimated_impact: &'static str,
    pub recommendation: &'static str,
}

impl Rule {
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: &'static str,
        pattern: &str,
        issue_type: IssueType,
        severity: Severity,
        extensions: &'static [&'static str],
        description: &'static str,
        estimated_impact: &'static str,
        recommendation: &'static str,
    ) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("valid rule regex"),
            issue_type,
            severity,
            extensions,
            description,
            estimated_impact,
            recommendation,
        }
    }

    pub fn applies_to(&self, extension: &str) -> bool {
        self.extensions.contains(&extension)
    }
}

/// An ordered, immutable collection of rules for one domain.
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Memory => Self::memory(),
            Domain::Cpu => Self::cpu(),
            Domain::Database => Self::database(),
            Domain::Cache => Self::cache(),
        }
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules applicable to a file extension, in declaration order.
    pub fn applicable<'r>(&'r self, extension: &str) -> Vec<&'r Rule> {
        self.rules.iter().filter(|r| r.applies_to(extension)).collect()
    }

    pub fn memory() -> Self {
        Self::from_rules(vec![
            Rule::new(
                "large_file_read",
                r"(?i)\.read\(\)\s*$",
                IssueType::HighAllocation,
                Severity::Medium,
                &["py"],
                "Reading entire file into memory at once.",
                "Memory usage proportional to file size",
                "Use line-by-line iteration or chunked reading for large files.",
            ),
            Rule::new(
                "readlines_call",
                r"(?i)\.readlines\(\)",
                IssueType::HighAllocation,
                Severity::Medium,
                &["py"],
                "readlines() loads entire file into memory as list.",
                "Memory usage proportional to file size",
                "Iterate over file object directly instead.",
            ),
            Rule::new(
                "dataframe_copy",
                r"(?i)\.copy\(\)\s*$",
                IssueType::HighAllocation,
                Severity::Low,
                &["py"],
                "DataFrame/object copy may not be necessary.",
                "Memory doubles for each copy operation",
                "Check if copy is truly needed.",
            ),
            Rule::new(
                "json_load_read",
                r"(?i)json\.load\s*\(",
                IssueType::HighAllocation,
                Severity::Medium,
                &["py"],
                "Loading JSON file into memory.",
                "Memory usage can be 2-10x the file size",
                "Use a streaming parser for large JSON files.",
            ),
            Rule::new(
                "lru_cache_unbounded",
                r"(?i)@lru_cache\s*\(\s*\)",
                IssueType::UnboundedGrowth,
                Severity::Medium,
                &["py"],
                "lru_cache without maxsize can grow indefinitely.",
                "Memory grows with unique inputs",
                "Use @lru_cache(maxsize=N) to limit cache size.",
            ),
            Rule::new(
                "event_listener",
                r"(?i)addEventListener\s*\(",
                IssueType::MemoryLeak,
                Severity::Low,
                &["js", "ts", "jsx", "tsx"],
                "Event listener - ensure corresponding removal exists.",
                "Memory retained until listener is removed",
                "Always remove event listeners in cleanup/dispose methods.",
            ),
            Rule::new(
                "setinterval_call",
                r"(?i)setInterval\s*\(",
                IssueType::MemoryLeak,
                Severity::Medium,
                &["js", "ts", "jsx", "tsx"],
                "setInterval - ensure clearInterval is called on cleanup.",
                "Callback and closure retained indefinitely",
                "Store interval ID and call clearInterval in cleanup.",
            ),
            Rule::new(
                "new_array_large",
                r"(?i)new\s+Array\(\s*\d{6,}\s*\)",
                IssueType::LargeObject,
                Severity::High,
                &["js", "ts"],
                "Creating very large pre-sized array.",
                "Immediate allocation of large memory block",
                "Consider lazy initialization or streaming approach.",
            ),
        ])
    }

    pub fn cpu() -> Self {
        Self::from_rules(vec![
            Rule::new(
                "synchronous_sleep",
                r"(?i)time\.sleep\s*\(",
                IssueType::BlockingOperation,
                Severity::Medium,
                &["py"],
                "Synchronous sleep blocks the thread.",
                "Thread blocked for sleep duration",
                "Use asyncio.sleep() in async code, or consider non-blocking alternatives.",
            ),
            Rule::new(
                "synchronous_http",
                r"(?i)requests\.(?:get|post|put|delete|patch)\s*\(",
                IssueType::SynchronousIo,
                Severity::Medium,
                &["py"],
                "Synchronous HTTP request blocks execution.",
                "Thread blocked during network I/O",
                "Use aiohttp, httpx with async, or run in thread pool.",
            ),
            Rule::new(
                "regex_greedy_star",
                r"(?i)re\.(?:match|search|findall|sub)\s*\([^)]*\.\*[^)]*\.\*",
                IssueType::HighComplexity,
                Severity::High,
                &["py"],
                "Regex with multiple greedy wildcards may cause backtracking.",
                "Exponential time on certain inputs",
                "Use non-greedy quantifiers or rewrite pattern.",
            ),
            Rule::new(
                "list_in_literal",
                r"(?i)if\s+\w+\s+in\s+\[[^\]]+\]",
                IssueType::InefficientLoop,
                Severity::Low,
                &["py"],
                "Using 'in' operator with literal list has O(n) lookup.",
                "Linear search on each check",
                "Use a set literal instead: {item1, item2} for O(1) lookup.",
            ),
            Rule::new(
                "for_loop_len_call",
                r"(?i)for\s+\w+\s+in\s+range\s*\(\s*len\s*\(",
                IssueType::InefficientLoop,
                Severity::Low,
                &["py"],
                "Using range(len()) is unpythonic.",
                "Less readable, potential off-by-one errors",
                "Use enumerate() or iterate directly over the collection.",
            ),
            Rule::new(
                "js_nested_for",
                r"(?i)for\s*\([^)]+\)\s*\{[^}]*for\s*\(",
                IssueType::HighComplexity,
                Severity::Medium,
                &["js", "ts", "jsx", "tsx"],
                "Nested loops detected in JavaScript.",
                "O(n^2) or higher complexity",
                "Consider using Map/Set for lookups, or Array methods.",
            ),
            Rule::new(
                "document_query_loop",
                r"(?i)(?:forEach|\.map)\s*\([^)]*document\.querySelector",
                IssueType::InefficientLoop,
                Severity::Medium,
                &["js", "ts", "jsx", "tsx"],
                "DOM query inside loop causes repeated DOM traversal.",
                "O(n * DOM size) for n iterations",
                "Cache DOM references before the loop.",
            ),
        ])
    }

    pub fn database() -> Self {
        Self::from_rules(vec![
            Rule::new(
                "objects_all_no_filter",
                r"(?i)\.objects\.all\(\)\s*$",
                IssueType::FullTableScan,
                Severity::Medium,
                &["py"],
                "Fetching all objects without filtering may load entire table.",
                "Memory and time proportional to table size",
                "Add filters, limits, or use pagination.",
            ),
            Rule::new(
                "cursor_execute",
                r"(?i)cursor\.execute\s*\(",
                IssueType::NPlusOne,
                Severity::Medium,
                &["py"],
                "Raw SQL cursor execute - check if inside loop.",
                "Potential N+1 if in loop",
                "Use batch queries or parameterized bulk operations.",
            ),
            Rule::new(
                "like_leading_wildcard",
                r#"(?i)LIKE\s*['"]%"#,
                IssueType::FullTableScan,
                Severity::Medium,
                &["py"],
                "LIKE with leading wildcard cannot use index.",
                "Full table scan required",
                "Use full-text search, trigram indexes, or reverse the pattern.",
            ),
            Rule::new(
                "select_star",
                r"(?i)SELECT\s+\*\s+FROM",
                IssueType::FullTableScan,
                Severity::Low,
                &["py"],
                "Selecting all columns when only some may be needed.",
                "Extra data transferred and processed",
                "Select only required columns.",
            ),
            Rule::new(
                "distinct_keyword",
                r"(?i)DISTINCT\s+",
                IssueType::MissingIndex,
                Severity::Low,
                &["py"],
                "DISTINCT may require sorting if not indexed.",
                "Full sort of result set",
                "Ensure columns have appropriate indexes or use GROUP BY.",
            ),
            Rule::new(
                "individual_save",
                r"(?i)\.save\(\)\s*$",
                IssueType::ExcessiveQueries,
                Severity::Low,
                &["py"],
                "Individual save() - consider bulk_create for batch inserts.",
                "One query per object",
                "Use bulk_create() for multiple objects.",
            ),
        ])
    }

    pub fn cache() -> Self {
        Self::from_rules(vec![
            Rule::new(
                "no_cache_decorator",
                r"(?i)def\s+(?:get|fetch|load|compute|calculate)_\w+\s*\([^)]*\)\s*:",
                IssueType::MissingCache,
                Severity::Low,
                &["py"],
                "Function with get/fetch/load/compute pattern may benefit from caching.",
                "Potentially repeated expensive operations",
                "Consider adding @lru_cache or external cache for frequently called functions.",
            ),
            Rule::new(
                "cache_no_ttl",
                r"(?i)(?:redis\.set|cache\.set|memcached\.set)\s*\([^)]+\)\s*$",
                IssueType::StaleCache,
                Severity::Medium,
                &["py", "js", "ts"],
                "Cache set without TTL may serve stale data indefinitely.",
                "Stale data returned after source changes",
                "Always set a TTL appropriate for your data freshness requirements.",
            ),
            Rule::new(
                "cache_get_simple",
                r#"(?i)(?:cache\.get|redis\.get|memcached\.get)\s*\(\s*["'][^"']{1,20}["']\s*\)"#,
                IssueType::InefficientKey,
                Severity::Low,
                &["py", "js", "ts"],
                "Simple cache key may lack version identifier.",
                "Difficult to invalidate cache on schema changes",
                "Include version prefix in cache keys (e.g., 'v1:user:123').",
            ),
            Rule::new(
                "query_in_template",
                r"(?i)(?:\{\{|\{%)[^}%]*(?:\.objects\.|\.query\(|\.filter\()",
                IssueType::MissingCache,
                Severity::High,
                &["html", "jinja", "jinja2"],
                "Database query in template - hard to cache and debug.",
                "Query executed on every render, N+1 issues hidden",
                "Move queries to view/controller, pass data to template.",
            ),
            Rule::new(
                "lru_cache_no_maxsize",
                r"(?i)@lru_cache\s*\(\s*\)",
                IssueType::OverCaching,
                Severity::Medium,
                &["py"],
                "lru_cache without maxsize can grow unbounded.",
                "Memory grows with unique inputs",
                "Use @lru_cache(maxsize=N) to limit cache size.",
            ),
            Rule::new(
                "localstorage_sync",
                r"(?i)localStorage\.(?:getItem|setItem)",
                IssueType::MissingCache,
                Severity::Low,
                &["js", "ts", "jsx", "tsx"],
                "localStorage is synchronous and blocks the main thread.",
                "UI blocking on read/write operations",
                "Consider IndexedDB for larger data, or batch localStorage access.",
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_rule_sets_nonempty() {
        for domain in Domain::ALL {
            assert!(
                !RuleSet::for_domain(domain).is_empty(),
                "{domain} rule set should not be empty"
            );
        }
    }

    #[test]
    fn test_rule_names_unique_within_set() {
        for domain in Domain::ALL {
            let set = RuleSet::for_domain(domain);
            let names: HashSet<&str> = set.rules().iter().map(|r| r.name).collect();
            assert_eq!(names.len(), set.rules().len(), "{domain} has duplicate rule names");
        }
    }

    #[test]
    fn test_applicable_filters_by_extension() {
        let set = RuleSet::memory();
        assert!(set.applicable("py").iter().any(|r| r.name == "readlines_call"));
        assert!(!set.applicable("js").iter().any(|r| r.name == "readlines_call"));
        assert!(set.applicable("js").iter().any(|r| r.name == "event_listener"));
        assert!(set.applicable("go").is_empty());
    }

    #[test]
    fn test_objects_all_matches_at_line_end() {
        let set = RuleSet::database();
        let rule = set
            .rules()
            .iter()
            .find(|r| r.name == "objects_all_no_filter")
            .expect("rule exists");
        assert!(rule.regex.is_match("users = User.objects.all()"));
        assert!(!rule.regex.is_match("users = User.objects.all().filter(active=True)"));
        assert_eq!(rule.issue_type, IssueType::FullTableScan);
    }

    #[test]
    fn test_new_array_large_requires_six_digits() {
        let set = RuleSet::memory();
        let rule = set
            .rules()
            .iter()
            .find(|r| r.name == "new_array_large")
            .expect("rule exists");
        assert!(rule.regex.is_match("let buf = new Array(1000000);"));
        assert!(!rule.regex.is_match("let buf = new Array(100);"));
    }
}
