//! Test-only fixtures and scripted collaborators.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::core::evidence::{IssueRecord, IssueSummary, Label, MetricRecord, PullRecord};
use crate::core::graph::build_graph;
use crate::core::status::{
    LabelRules, compute_next_steps, compute_phase, compute_progress, find_active_work,
    find_blockers, find_risks,
};
use crate::core::types::{
    IssueState, ParentIssue, PipelineStatus, PrState, ProgramGraph, PullRequest, ReviewDecision,
    SubIssue,
};
use crate::io::github::EvidenceSource;
use crate::io::layout::OverseerPaths;
use crate::io::post::{Comment, CommentStore};
use crate::io::sessions::SessionSource;

fn sub_issue(number: u64, state: IssueState) -> SubIssue {
    SubIssue {
        number,
        title: format!("Issue {number}"),
        state,
        labels: BTreeSet::new(),
        dependencies: Vec::new(),
        linked_prs: Vec::new(),
        pipeline_status: None,
        session: None,
    }
}

/// Open sub-issue with no labels, dependencies, or linked work.
pub fn open_issue(number: u64) -> SubIssue {
    sub_issue(number, IssueState::Open)
}

pub fn closed_issue(number: u64) -> SubIssue {
    sub_issue(number, IssueState::Closed)
}

impl SubIssue {
    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|label| (*label).to_string()).collect();
        self
    }

    pub fn with_dependencies(mut self, dependencies: &[u64]) -> Self {
        self.dependencies = dependencies.to_vec();
        self
    }

    pub fn with_status(mut self, status: PipelineStatus) -> Self {
        self.pipeline_status = Some(status);
        self
    }

    pub fn with_session(mut self, session: &str) -> Self {
        self.session = Some(session.to_string());
        self
    }

    pub fn with_prs(mut self, prs: Vec<PullRequest>) -> Self {
        self.linked_prs = prs;
        self
    }
}

/// Open, unmerged PR without a review decision.
pub fn open_pr(number: u64, branch: &str) -> PullRequest {
    PullRequest {
        number,
        title: format!("PR {number}"),
        state: PrState::Open,
        branch: branch.to_string(),
        review_decision: ReviewDecision::None,
        merged: false,
    }
}

pub fn merged_pr(number: u64, branch: &str) -> PullRequest {
    PullRequest {
        state: PrState::Merged,
        merged: true,
        ..open_pr(number, branch)
    }
}

impl PullRequest {
    pub fn with_review(mut self, decision: ReviewDecision) -> Self {
        self.review_decision = decision;
        self
    }
}

pub fn metric(job: &str, status: &str, duration_s: f64, timestamp: &str) -> MetricRecord {
    MetricRecord {
        job: job.to_string(),
        status: status.to_string(),
        duration_s,
        timestamp: timestamp.to_string(),
    }
}

/// Tracker issue payload with a deterministic title.
pub fn issue_record(number: u64, state: IssueState, body: &str) -> IssueRecord {
    IssueRecord {
        number,
        title: format!("Issue {number}"),
        state,
        labels: Vec::new(),
        body: body.to_string(),
    }
}

pub fn labeled_record(number: u64, labels: &[&str], body: &str) -> IssueRecord {
    IssueRecord {
        labels: labels
            .iter()
            .map(|name| Label {
                name: (*name).to_string(),
            })
            .collect(),
        ..issue_record(number, IssueState::Open, body)
    }
}

/// Tracker PR payload for an open PR on `branch`.
pub fn pull_record(number: u64, branch: &str) -> PullRecord {
    PullRecord {
        number,
        title: format!("PR {number}"),
        state: PrState::Open,
        head_ref_name: branch.to_string(),
        ..PullRecord::default()
    }
}

pub fn merged_pull_record(number: u64, branch: &str) -> PullRecord {
    PullRecord {
        state: PrState::Merged,
        merged_at: Some("2024-06-01T00:00:00Z".to_string()),
        ..pull_record(number, branch)
    }
}

/// One recorded [`EvidenceSource`] query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Issue(u64),
    Comments(u64),
    PullRequests(usize),
    PullRequestBody(u64),
    RecentIssues(usize),
}

/// [`EvidenceSource`] returning canned records and recording every query.
///
/// Unscripted issues and PR bodies read as absent; unscripted lists read as
/// empty.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    issues: HashMap<u64, IssueRecord>,
    comments: HashMap<u64, Vec<String>>,
    pull_requests: Vec<PullRecord>,
    pull_request_bodies: HashMap<u64, String>,
    recent_issues: Vec<IssueSummary>,
    calls: Mutex<Vec<SourceCall>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(mut self, record: IssueRecord) -> Self {
        self.issues.insert(record.number, record);
        self
    }

    pub fn with_comments(mut self, number: u64, bodies: &[&str]) -> Self {
        self.comments.insert(
            number,
            bodies.iter().map(|body| (*body).to_string()).collect(),
        );
        self
    }

    pub fn with_pull_request(mut self, record: PullRecord, body: &str) -> Self {
        self.pull_request_bodies
            .insert(record.number, body.to_string());
        self.pull_requests.push(record);
        self
    }

    pub fn with_recent_issue(mut self, number: u64, body: &str) -> Self {
        self.recent_issues.push(IssueSummary {
            number,
            body: body.to_string(),
        });
        self
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: SourceCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl EvidenceSource for ScriptedSource {
    fn issue(&self, number: u64) -> Option<IssueRecord> {
        self.record(SourceCall::Issue(number));
        self.issues.get(&number).cloned()
    }

    fn comments(&self, number: u64) -> Option<Vec<String>> {
        self.record(SourceCall::Comments(number));
        Some(self.comments.get(&number).cloned().unwrap_or_default())
    }

    fn pull_requests(&self, limit: usize) -> Option<Vec<PullRecord>> {
        self.record(SourceCall::PullRequests(limit));
        Some(self.pull_requests.iter().take(limit).cloned().collect())
    }

    fn pull_request_body(&self, number: u64) -> Option<String> {
        self.record(SourceCall::PullRequestBody(number));
        self.pull_request_bodies.get(&number).cloned()
    }

    fn recent_issues(&self, limit: usize) -> Option<Vec<IssueSummary>> {
        self.record(SourceCall::RecentIssues(limit));
        Some(self.recent_issues.iter().take(limit).cloned().collect())
    }
}

/// [`SessionSource`] with a fixed window list.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSessions {
    windows: Option<Vec<String>>,
}

impl ScriptedSessions {
    pub fn new(windows: &[&str]) -> Self {
        Self {
            windows: Some(windows.iter().map(|w| (*w).to_string()).collect()),
        }
    }

    /// Session listing fails (e.g. the multiplexer is not running).
    pub fn unavailable() -> Self {
        Self { windows: None }
    }
}

impl SessionSource for ScriptedSessions {
    fn window_names(&self) -> Option<Vec<String>> {
        self.windows.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentCall {
    List(u64),
    Update(u64, String),
    Create(u64, String),
}

/// In-memory [`CommentStore`] recording every call.
#[derive(Debug, Default)]
pub struct ScriptedComments {
    comments: Vec<Comment>,
    fail: bool,
    calls: Mutex<Vec<CommentCall>>,
}

impl ScriptedComments {
    pub fn new(comments: Vec<Comment>) -> Self {
        Self {
            comments,
            ..Self::default()
        }
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<CommentCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: CommentCall) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.fail {
            return Err(anyhow!("scripted comment store failure"));
        }
        Ok(())
    }
}

impl CommentStore for ScriptedComments {
    fn list_comments(&self, issue: u64) -> Result<Vec<Comment>> {
        self.record(CommentCall::List(issue))?;
        Ok(self.comments.clone())
    }

    fn update_comment(&self, comment_id: u64, body: &str) -> Result<()> {
        self.record(CommentCall::Update(comment_id, body.to_string()))
    }

    fn create_comment(&self, issue: u64, body: &str) -> Result<()> {
        self.record(CommentCall::Create(issue, body.to_string()))
    }
}

/// Temporary automation root with helpers for writing local state.
pub struct LocalFixture {
    _temp: TempDir,
    pub paths: OverseerPaths,
}

impl LocalFixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = OverseerPaths::new(temp.path());
        Self { _temp: temp, paths }
    }

    pub fn write_item(&self, file_name: &str, json: &str) {
        fs::create_dir_all(&self.paths.items_dir).expect("create items dir");
        fs::write(self.paths.items_dir.join(file_name), json).expect("write state item");
    }

    pub fn write_slots(&self, count: usize) {
        fs::create_dir_all(&self.paths.slots_dir).expect("create slots dir");
        for slot in 0..count {
            fs::write(self.paths.slots_dir.join(format!("{slot}.pid")), "1")
                .expect("write slot");
        }
    }

    pub fn write_metrics(&self, lines: &[&str]) {
        let parent = self
            .paths
            .metrics_path
            .parent()
            .expect("metrics path parent");
        fs::create_dir_all(parent).expect("create data dir");
        fs::write(&self.paths.metrics_path, lines.join("\n")).expect("write metrics");
    }
}

impl Default for LocalFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed reconstruction time used by fixtures.
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-30T12:00:00Z")
        .map(|at| at.with_timezone(&Utc))
        .expect("fixed timestamp")
}

/// Aggregate `sub_issues` and their linked PRs the way discovery does, with
/// default label rules, no slot pressure, and no ETA.
pub fn program_from(parent: u64, sub_issues: Vec<SubIssue>) -> ProgramGraph {
    let labels = LabelRules::default();
    let mut prs: Vec<PullRequest> = Vec::new();
    for pr in sub_issues.iter().flat_map(|issue| &issue.linked_prs) {
        if !prs.iter().any(|seen| seen.number == pr.number) {
            prs.push(pr.clone());
        }
    }
    let graph = (!sub_issues.is_empty()).then(|| build_graph(&sub_issues));
    let cycles = graph.as_ref().map(|g| g.cycles.clone()).unwrap_or_default();
    ProgramGraph {
        parent: ParentIssue {
            number: parent,
            title: "Program".to_string(),
            state: IssueState::Open,
        },
        progress: compute_progress(&sub_issues, &prs),
        phase: compute_phase(&sub_issues, &prs, &labels),
        blockers: find_blockers(&sub_issues, &prs, &labels),
        risks: find_risks(&sub_issues, &prs, &labels, None, &cycles),
        active_work: find_active_work(&sub_issues),
        next_steps: compute_next_steps(&sub_issues, &prs, &labels),
        graph,
        eta: None,
        generated_at: fixed_now(),
        sub_issues,
        prs,
    }
}
