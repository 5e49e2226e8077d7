//! Raw evidence records as delivered by external collaborators.
//!
//! These mirror the JSON payloads of the issue tracker CLI and the local state
//! files. Deserialization is lenient: nulls become defaults and loosely typed
//! numbers are accepted, so a single odd field never discards a whole record.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::types::{IssueState, PipelineStatus, PrState, PullRequest, ReviewDecision};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

/// `issue view --json number,title,state,labels,body`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub number: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    pub state: IssueState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<Label>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
}

impl IssueRecord {
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|label| label.name.as_str())
    }
}

/// `issue list --json number,body`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub number: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
}

/// `pr list --json number,title,state,headRefName,url,reviewDecision,mergeable,mergedAt`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRecord {
    pub number: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: PrState,
    #[serde(default, deserialize_with = "null_as_default")]
    pub head_ref_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub review_decision: ReviewDecision,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mergeable: String,
    #[serde(default)]
    pub merged_at: Option<String>,
}

impl PullRecord {
    /// Project the tracker payload onto the model. `merged` follows the merge
    /// timestamp because `state` can lag behind it.
    pub fn to_pull_request(&self) -> PullRequest {
        PullRequest {
            number: self.number,
            title: self.title.clone(),
            state: self.state,
            branch: self.head_ref_name.clone(),
            review_decision: self.review_decision,
            merged: self
                .merged_at
                .as_deref()
                .is_some_and(|at| !at.trim().is_empty()),
        }
    }
}

/// Per-item pipeline state file (`state/items/*.json`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateItem {
    #[serde(default, deserialize_with = "loose_number")]
    pub number: Option<u64>,
    #[serde(default, deserialize_with = "loose_text")]
    pub status: String,
    #[serde(default, deserialize_with = "loose_count")]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub parent_issue: Option<u64>,
}

impl StateItem {
    pub fn pipeline_status(&self) -> PipelineStatus {
        PipelineStatus {
            status: self.status.clone(),
            attempts: self.attempts,
            last_error: self
                .last_error
                .clone()
                .filter(|err| !err.trim().is_empty()),
        }
    }
}

/// One line of `data/metrics.jsonl`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub job: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration_s: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `42`, `"42"`, or null; anything else reads as absent.
fn loose_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(u64),
        Text(String),
        #[allow(dead_code)]
        Other(IgnoredAny),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Number(n)) => Some(n),
        Some(Loose::Text(text)) => text.trim().parse().ok(),
        Some(Loose::Other(_)) | None => None,
    })
}

/// Counts read like [`loose_number`]; absent or odd values count as zero.
fn loose_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_number(deserializer)?
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or_default())
}

/// Strings pass through; any other JSON value reads as empty.
fn loose_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        #[allow(dead_code)]
        Other(IgnoredAny),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(text)) => text,
        Some(Loose::Other(_)) | None => String::new(),
    })
}
