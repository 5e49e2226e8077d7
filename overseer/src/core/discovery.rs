//! Sub-issue discovery strategies.
//!
//! Each strategy is an independent pure function from one kind of evidence to
//! a set of candidate issue numbers. [`discover_sub_issues`] runs them all and
//! unions the results; the full-text fallback only runs when every other
//! strategy came back empty.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::evidence::{IssueSummary, StateItem};

/// Hidden marker carrying an explicit id list: `<!-- overseer-sub-issues: 5, 7, 9 -->`.
pub const SUB_ISSUE_MARKER: &str = "overseer-sub-issues";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*overseer-sub-issues:\s*([\d,\s]*?)\s*-->").expect("marker regex")
});

// "Superseded by" up to the first run of `#N` references joined by commas or "and".
static SUPERSEDED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)superseded\s+by.*?(#\d+(?:\s*(?:,|\band\b)\s*#\d+)*)")
        .expect("superseded regex")
});

static ISSUE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").expect("issue ref regex"));

static TABLE_CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#(\d+)\s*$").expect("table cell regex"));

/// Ids listed in the structured marker comment.
pub fn marker_ids(text: &str) -> BTreeSet<u64> {
    MARKER_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .flat_map(|list| list.as_str().split(','))
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

/// Every `#N` in the reference run following a "superseded by" phrase.
pub fn superseded_ids(text: &str) -> BTreeSet<u64> {
    SUPERSEDED_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .flat_map(|run| issue_refs(run.as_str()))
        .collect()
}

/// Table cells whose only content is a bare `#N`.
pub fn table_row_ids(text: &str) -> BTreeSet<u64> {
    let mut found = BTreeSet::new();
    for line in text.lines() {
        let cells: Vec<&str> = line.split('|').collect();
        if cells.len() < 3 {
            continue;
        }
        // Segments before the first and after the last pipe are outside the row.
        for cell in &cells[1..cells.len() - 1] {
            if let Some(number) = TABLE_CELL_RE
                .captures(cell)
                .and_then(|caps| caps[1].parse().ok())
            {
                found.insert(number);
            }
        }
    }
    found
}

/// Local state records that name `parent` as their parent issue.
pub fn state_linked_ids(items: &[StateItem], parent: u64) -> BTreeSet<u64> {
    items
        .iter()
        .filter(|item| item.parent_issue == Some(parent))
        .filter_map(|item| item.number)
        .collect()
}

/// Recent issues whose body mentions `#parent` anywhere.
pub fn mentioning_ids(issues: &[IssueSummary], parent: u64) -> BTreeSet<u64> {
    let needle = format!("#{parent}");
    issues
        .iter()
        .filter(|issue| issue.number != parent && issue.body.contains(&needle))
        .map(|issue| issue.number)
        .collect()
}

/// Run all strategies over the evidence and return the sorted, deduplicated
/// union without the parent itself.
///
/// `fallback` supplies the recent-issue window for the full-text fallback and is
/// only invoked when every other strategy found nothing.
pub fn discover_sub_issues<F>(
    parent: u64,
    texts: &[&str],
    items: &[StateItem],
    fallback: F,
) -> Vec<u64>
where
    F: FnOnce() -> Vec<IssueSummary>,
{
    let mut found = BTreeSet::new();
    for text in texts {
        found.extend(marker_ids(text));
        found.extend(superseded_ids(text));
        found.extend(table_row_ids(text));
    }
    found.extend(state_linked_ids(items, parent));

    if found.is_empty() {
        found.extend(mentioning_ids(&fallback(), parent));
    }

    found.remove(&parent);
    found.into_iter().collect()
}

fn issue_refs(text: &str) -> impl Iterator<Item = u64> + '_ {
    ISSUE_REF_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
}
