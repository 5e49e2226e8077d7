//! Call-scoped memoization of evidence queries.
//!
//! A [`CachedSource`] lives exactly as long as one discovery call, so every
//! distinct query reaches the underlying source at most once and nothing is
//! shared between calls.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, trace};

use crate::core::evidence::{IssueRecord, IssueSummary, PullRecord};
use crate::io::github::EvidenceSource;

/// Single-threaded memo table keyed by query argument.
#[derive(Debug)]
pub struct Memo<K, V> {
    name: &'static str,
    entries: RefCell<HashMap<K, V>>,
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + Copy + Debug,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Return the stored value for `key`, or run `producer` once and store it.
    ///
    /// Absent results are stored too, so a failed query is not retried.
    pub fn get(&self, key: K, producer: impl FnOnce() -> V) -> V {
        if let Some(value) = self.entries.borrow().get(&key) {
            trace!(cache = self.name, ?key, "hit");
            return value.clone();
        }
        debug!(cache = self.name, ?key, "miss");
        let value = producer();
        self.entries.borrow_mut().insert(key, value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// [`EvidenceSource`] wrapper that memoizes every query for one call.
pub struct CachedSource<'a> {
    source: &'a dyn EvidenceSource,
    issues: Memo<u64, Option<IssueRecord>>,
    comments: Memo<u64, Option<Vec<String>>>,
    pull_requests: Memo<usize, Option<Vec<PullRecord>>>,
    pull_request_bodies: Memo<u64, Option<String>>,
    recent_issues: Memo<usize, Option<Vec<IssueSummary>>>,
}

impl<'a> CachedSource<'a> {
    pub fn new(source: &'a dyn EvidenceSource) -> Self {
        Self {
            source,
            issues: Memo::new("issue"),
            comments: Memo::new("comments"),
            pull_requests: Memo::new("pr_list"),
            pull_request_bodies: Memo::new("pr_body"),
            recent_issues: Memo::new("issue_list"),
        }
    }
}

impl EvidenceSource for CachedSource<'_> {
    fn issue(&self, number: u64) -> Option<IssueRecord> {
        self.issues.get(number, || self.source.issue(number))
    }

    fn comments(&self, number: u64) -> Option<Vec<String>> {
        self.comments.get(number, || self.source.comments(number))
    }

    fn pull_requests(&self, limit: usize) -> Option<Vec<PullRecord>> {
        self.pull_requests
            .get(limit, || self.source.pull_requests(limit))
    }

    fn pull_request_body(&self, number: u64) -> Option<String> {
        self.pull_request_bodies
            .get(number, || self.source.pull_request_body(number))
    }

    fn recent_issues(&self, limit: usize) -> Option<Vec<IssueSummary>> {
        self.recent_issues
            .get(limit, || self.source.recent_issues(limit))
    }
}
