//! Per-issue evidence matching: declared dependencies, PR linkage rules, and
//! live-session lookup.

use std::sync::LazyLock;

use regex::Regex;

static BLOCKED_BY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\*\*)?blocked\s+by:(?:\*\*)?\s*([^\n]+)").expect("blocked-by regex")
});

static ISSUE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").expect("issue ref regex"));

static CLOSING_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?)\s+#(\d+)\b")
        .expect("closing keyword regex")
});

/// Parse the single `**Blocked By:** #a, #b` field of an issue body.
///
/// Only the first such field counts. When the label ends its line, the next
/// non-empty line is read instead. Order is kept, repeats are dropped.
pub fn parse_dependencies(body: &str) -> Vec<u64> {
    let Some(line) = BLOCKED_BY_RE.captures(body).and_then(|caps| caps.get(1)) else {
        return Vec::new();
    };
    let mut deps: Vec<u64> = Vec::new();
    for caps in ISSUE_REF_RE.captures_iter(line.as_str()) {
        if let Ok(number) = caps[1].parse()
            && !deps.contains(&number)
        {
            deps.push(number);
        }
    }
    deps
}

/// Branch linkage: the PR branch follows the `issue-{N}` naming convention.
///
/// Plain substring match, so `issue-4` also matches a branch for `issue-42`.
pub fn branch_matches(branch: &str, issue: u64) -> bool {
    branch.contains(&format!("issue-{issue}"))
}

/// Body linkage: the PR body carries a closing keyword reference to `issue`.
pub fn closes_issue(body: &str, issue: u64) -> bool {
    CLOSING_REF_RE
        .captures_iter(body)
        .any(|caps| caps[1].parse::<u64>().is_ok_and(|n| n == issue))
}

/// First session window whose name contains the issue number.
///
/// This is a loose substring match: issue 12 also matches a window named
/// `issue-123-foo`. Kept as-is until session naming is pinned down.
pub fn find_session(windows: &[String], issue: u64) -> Option<String> {
    let needle = issue.to_string();
    windows
        .iter()
        .find(|window| window.contains(&needle))
        .cloned()
}
