//! Shared data model for a reconstructed program.
//!
//! Every value here is built fresh per discovery call from external reads and
//! never persisted. Types are plain data: the aggregation rules that derive
//! them live in sibling `core` modules.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue lifecycle state as reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

/// The issue representing the whole program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentIssue {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
}

/// Local pipeline bookkeeping for a sub-issue (from `state/items/*.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub status: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl PipelineStatus {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }

    /// True for terminal failure states (`failed` or `abandoned`).
    pub fn is_failed(&self) -> bool {
        matches!(self.status.as_str(), "failed" | "abandoned")
    }
}

/// Pull request state as reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrState {
    Open,
    Closed,
    Merged,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PrState {
    pub fn as_str(self) -> &'static str {
        match self {
            PrState::Open => "OPEN",
            PrState::Closed => "CLOSED",
            PrState::Merged => "MERGED",
            PrState::Unknown => "UNKNOWN",
        }
    }
}

/// Aggregate review decision on a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
    /// No decision yet (the tracker reports an empty string or null).
    #[default]
    #[serde(other)]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: PrState,
    pub branch: String,
    pub review_decision: ReviewDecision,
    /// Derived from the presence of a merge timestamp, not from `state`.
    pub merged: bool,
}

impl PullRequest {
    pub fn is_open(&self) -> bool {
        self.state == PrState::Open
    }

    pub fn changes_requested(&self) -> bool {
        self.review_decision == ReviewDecision::ChangesRequested
    }

    /// Open, unmerged, and not sent back for rework.
    pub fn awaiting_merge(&self) -> bool {
        self.is_open() && !self.merged && !self.changes_requested()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubIssue {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub labels: BTreeSet<String>,
    /// Declared dependencies in the order they appear in the issue body.
    pub dependencies: Vec<u64>,
    pub linked_prs: Vec<PullRequest>,
    pub pipeline_status: Option<PipelineStatus>,
    /// Name of a live agent session window, if one matched.
    pub session: Option<String>,
}

impl SubIssue {
    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Running right now: a live session or a local `running` status.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
            || self
                .pipeline_status
                .as_ref()
                .is_some_and(PipelineStatus::is_running)
    }
}

/// Dependency edge: `to` declares `from` as a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: u64,
    pub to: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<u64>,
    pub edges: Vec<Edge>,
    /// Longest chain of dependency-linked open sub-issues.
    pub critical_path: Vec<u64>,
    /// Genuine dependency cycles, each closing back on its first node.
    pub cycles: Vec<Vec<u64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IssueProgress {
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrProgress {
    pub merged: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub issues: IssueProgress,
    pub prs: PrProgress,
    /// Integer percentage in `0..=100`.
    pub percent: u8,
}

/// Coarse lifecycle classification of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Unknown,
    Done,
    Research,
    Rework,
    Review,
    Implementation,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Unknown => "unknown",
            Phase::Done => "done",
            Phase::Research => "research",
            Phase::Rework => "rework",
            Phase::Review => "review",
            Phase::Implementation => "implementation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that currently stops progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Blocker {
    Dependency {
        issue: u64,
        blocked_by: u64,
    },
    HumanDecision {
        issue: u64,
    },
    PipelineFailure {
        issue: u64,
        status: String,
        last_error: Option<String>,
    },
    ReworkNeeded {
        pr: u64,
    },
}

impl Blocker {
    pub fn kind(&self) -> &'static str {
        match self {
            Blocker::Dependency { .. } => "dependency",
            Blocker::HumanDecision { .. } => "human_decision",
            Blocker::PipelineFailure { .. } => "pipeline_failure",
            Blocker::ReworkNeeded { .. } => "rework_needed",
        }
    }
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::Dependency { issue, blocked_by } => {
                write!(f, "#{issue} blocked by open #{blocked_by}")
            }
            Blocker::HumanDecision { issue } => write!(f, "#{issue} requires human decision"),
            Blocker::PipelineFailure {
                issue,
                status,
                last_error,
            } => write!(
                f,
                "#{issue} pipeline {status}: {}",
                last_error.as_deref().unwrap_or("unknown error")
            ),
            Blocker::ReworkNeeded { pr } => write!(f, "PR #{pr} needs rework"),
        }
    }
}

/// Something that threatens progress without stopping it yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Risk {
    RepeatedFailures { issue: u64, attempts: u32 },
    HumanOnly { issue: u64 },
    ChangesRequested { pr: u64 },
    Capacity { active: usize, max: usize },
    DependencyCycle { path: Vec<u64> },
}

impl Risk {
    pub fn kind(&self) -> &'static str {
        match self {
            Risk::RepeatedFailures { .. } => "repeated_failures",
            Risk::HumanOnly { .. } => "human_only",
            Risk::ChangesRequested { .. } => "changes_requested",
            Risk::Capacity { .. } => "capacity",
            Risk::DependencyCycle { .. } => "dependency_cycle",
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Risk::RepeatedFailures { issue, attempts } => {
                write!(f, "#{issue} has {attempts} attempts")
            }
            Risk::HumanOnly { issue } => write!(f, "#{issue} requires human input"),
            Risk::ChangesRequested { pr } => write!(f, "PR #{pr} has changes requested"),
            Risk::Capacity { active, max } => {
                let percent = (*active as f64 / *max as f64 * 100.0).round();
                write!(f, "Slot usage at {active}/{max} ({percent}%)")
            }
            Risk::DependencyCycle { path } => {
                write!(f, "dependency cycle {}", join_refs(path, " -> "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWork {
    pub issue: u64,
    pub title: String,
    pub session: Option<String>,
}

/// Qualitative trust in an ETA, driven by historical sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eta {
    pub avg_implementation_minutes: Option<u64>,
    pub avg_review_minutes: Option<u64>,
    pub implementation_samples: usize,
    pub review_samples: usize,
    pub remaining_issues: usize,
    pub open_prs: usize,
    pub estimated_minutes: Option<u64>,
    pub confidence: Confidence,
}

/// A recommended action, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextStep {
    AwaitingMerge { pr: u64 },
    Ready { issue: u64 },
    Unblocks { issue: u64, unblocks: Vec<u64> },
    HumanDecision { issue: u64 },
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStep::AwaitingMerge { pr } => write!(f, "PR #{pr} awaiting review/merge"),
            NextStep::Ready { issue } => write!(f, "#{issue} is unblocked and ready for work"),
            NextStep::Unblocks { issue, unblocks } => write!(
                f,
                "When #{issue} completes, it will unblock {}",
                join_refs(unblocks, ", ")
            ),
            NextStep::HumanDecision { issue } => write!(f, "Human decision needed on #{issue}"),
        }
    }
}

/// Aggregate root of one discovery call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramGraph {
    pub parent: ParentIssue,
    pub sub_issues: Vec<SubIssue>,
    pub prs: Vec<PullRequest>,
    pub progress: Progress,
    pub phase: Phase,
    /// Absent when no sub-issues were discovered.
    pub graph: Option<DependencyGraph>,
    pub blockers: Vec<Blocker>,
    pub risks: Vec<Risk>,
    pub active_work: Vec<ActiveWork>,
    pub eta: Option<Eta>,
    pub next_steps: Vec<NextStep>,
    pub generated_at: DateTime<Utc>,
}

impl ProgramGraph {
    /// The defined "no evidence" terminal state: a known parent, nothing under it.
    pub fn empty(parent: ParentIssue, generated_at: DateTime<Utc>) -> Self {
        Self {
            parent,
            sub_issues: Vec::new(),
            prs: Vec::new(),
            progress: Progress::default(),
            phase: Phase::Unknown,
            graph: None,
            blockers: Vec::new(),
            risks: Vec::new(),
            active_work: Vec::new(),
            eta: None,
            next_steps: Vec::new(),
            generated_at,
        }
    }
}

/// Result of one discovery call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProgramOutcome {
    Resolved(Box<ProgramGraph>),
    /// The parent issue itself could not be fetched.
    Unresolved { repo: String, parent: u64 },
}

impl ProgramOutcome {
    pub fn error_message(&self) -> Option<String> {
        match self {
            ProgramOutcome::Resolved(_) => None,
            ProgramOutcome::Unresolved { repo, parent } => {
                Some(format!("Could not fetch issue #{parent} from {repo}"))
            }
        }
    }
}

/// Render numbers as `#a<sep>#b`.
pub fn join_refs(numbers: &[u64], sep: &str) -> String {
    numbers
        .iter()
        .map(|n| format!("#{n}"))
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocker_messages_are_stable() {
        let blocker = Blocker::PipelineFailure {
            issue: 7,
            status: "failed".to_string(),
            last_error: None,
        };
        assert_eq!(blocker.kind(), "pipeline_failure");
        assert_eq!(blocker.to_string(), "#7 pipeline failed: unknown error");
    }

    #[test]
    fn next_step_lists_unblocked_issues() {
        let step = NextStep::Unblocks {
            issue: 3,
            unblocks: vec![4, 5],
        };
        assert_eq!(step.to_string(), "When #3 completes, it will unblock #4, #5");
    }

    #[test]
    fn review_decision_tolerates_unknown_values() {
        let decision: ReviewDecision = serde_json::from_str("\"\"").expect("parse");
        assert_eq!(decision, ReviewDecision::None);
        let decision: ReviewDecision =
            serde_json::from_str("\"CHANGES_REQUESTED\"").expect("parse");
        assert_eq!(decision, ReviewDecision::ChangesRequested);
    }

    #[test]
    fn capacity_risk_reports_percentage() {
        let risk = Risk::Capacity { active: 8, max: 10 };
        assert_eq!(risk.to_string(), "Slot usage at 8/10 (80%)");
    }
}
