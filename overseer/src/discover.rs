//! Program reconstruction for one parent issue.
//!
//! [`discover_program`] is a single synchronous call: it owns the evidence
//! cache, gathers every input once, and hands plain data to the pure `core`
//! rules. Collaborator failures degrade to absent evidence; only a parent
//! that cannot be fetched makes the outcome unresolved.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::core::discovery::discover_sub_issues;
use crate::core::eta::estimate;
use crate::core::evidence::{IssueRecord, PullRecord};
use crate::core::graph::build_graph;
use crate::core::linkage::{branch_matches, closes_issue, find_session, parse_dependencies};
use crate::core::status::{
    SlotUsage, compute_next_steps, compute_phase, compute_progress, find_active_work,
    find_blockers, find_risks,
};
use crate::core::types::{ParentIssue, ProgramGraph, ProgramOutcome, PullRequest, SubIssue};
use crate::io::cache::CachedSource;
use crate::io::config::OverseerConfig;
use crate::io::github::EvidenceSource;
use crate::io::layout::OverseerPaths;
use crate::io::metrics::load_metrics;
use crate::io::sessions::SessionSource;
use crate::io::state_items::{LoadedItem, count_active_slots, find_item_for_issue, load_state_items};

/// External collaborators for one discovery call.
pub struct Collaborators<'a> {
    pub evidence: &'a dyn EvidenceSource,
    pub sessions: &'a dyn SessionSource,
    pub paths: &'a OverseerPaths,
}

/// Which program to reconstruct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRequest {
    pub repo: String,
    pub parent: u64,
}

/// Reconstruct the program graph rooted at `request.parent`.
#[instrument(skip_all, fields(repo = %request.repo, parent = request.parent))]
pub fn discover_program(
    collaborators: &Collaborators<'_>,
    config: &OverseerConfig,
    request: &ProgramRequest,
    now: DateTime<Utc>,
) -> ProgramOutcome {
    let cache = CachedSource::new(collaborators.evidence);
    let parent_number = request.parent;

    let Some(parent_record) = cache.issue(parent_number) else {
        warn!("parent issue could not be fetched");
        return ProgramOutcome::Unresolved {
            repo: request.repo.clone(),
            parent: parent_number,
        };
    };
    let parent = ParentIssue {
        number: parent_number,
        title: parent_record.title.clone(),
        state: parent_record.state,
    };

    let comments = cache.comments(parent_number).unwrap_or_default();
    let mut texts: Vec<&str> = vec![parent_record.body.as_str()];
    texts.extend(comments.iter().map(String::as_str));

    let items = load_state_items(&collaborators.paths.items_dir).unwrap_or_else(|err| {
        warn!(error = %format!("{err:#}"), "could not load local state items");
        Vec::new()
    });
    let state_records: Vec<_> = items.iter().map(|loaded| loaded.item.clone()).collect();

    let ids = discover_sub_issues(parent_number, &texts, &state_records, || {
        cache
            .recent_issues(config.fallback_issue_limit)
            .unwrap_or_default()
    });
    info!(count = ids.len(), "discovered sub-issues");
    if ids.is_empty() {
        return ProgramOutcome::Resolved(Box::new(ProgramGraph::empty(parent, now)));
    }

    let windows = collaborators.sessions.window_names().unwrap_or_default();
    let pr_records = cache.pull_requests(config.pr_list_limit).unwrap_or_default();

    let mut sub_issues = Vec::new();
    for id in ids {
        let Some(record) = cache.issue(id) else {
            debug!(issue = id, "dropping sub-issue without details");
            continue;
        };
        sub_issues.push(resolve_sub_issue(
            &cache,
            id,
            &record,
            &pr_records,
            &items,
            &windows,
        ));
    }

    let prs = union_prs(&sub_issues);
    let labels = config.label_rules();

    let progress = compute_progress(&sub_issues, &prs);
    let phase = compute_phase(&sub_issues, &prs, &labels);
    let graph = (!sub_issues.is_empty()).then(|| build_graph(&sub_issues));
    let cycles = graph
        .as_ref()
        .map(|graph| graph.cycles.clone())
        .unwrap_or_default();

    let slots = match count_active_slots(&collaborators.paths.slots_dir) {
        Ok(active) => Some(SlotUsage {
            active,
            max: config.max_concurrent_work,
        }),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "could not count work slots");
            None
        }
    };

    let eta = match load_metrics(&collaborators.paths.metrics_path) {
        Ok(records) => estimate(&records, now, config.eta_settings(), &sub_issues, &prs),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "could not load metrics; skipping ETA");
            None
        }
    };

    let graph_out = ProgramGraph {
        blockers: find_blockers(&sub_issues, &prs, &labels),
        risks: find_risks(&sub_issues, &prs, &labels, slots, &cycles),
        active_work: find_active_work(&sub_issues),
        next_steps: compute_next_steps(&sub_issues, &prs, &labels),
        parent,
        progress,
        phase,
        graph,
        eta,
        generated_at: now,
        sub_issues,
        prs,
    };
    ProgramOutcome::Resolved(Box::new(graph_out))
}

fn resolve_sub_issue(
    cache: &CachedSource<'_>,
    number: u64,
    record: &IssueRecord,
    pr_records: &[PullRecord],
    items: &[LoadedItem],
    windows: &[String],
) -> SubIssue {
    SubIssue {
        number,
        title: record.title.clone(),
        state: record.state,
        labels: record.label_names().map(str::to_string).collect(),
        dependencies: parse_dependencies(&record.body),
        linked_prs: link_prs(cache, pr_records, number),
        pipeline_status: find_item_for_issue(items, number).map(|item| item.pipeline_status()),
        session: find_session(windows, number),
    }
}

/// PRs linked to `issue`: branch name matches first, then closing references
/// in the bodies of the remaining PRs.
fn link_prs(cache: &CachedSource<'_>, pr_records: &[PullRecord], issue: u64) -> Vec<PullRequest> {
    let mut linked: Vec<PullRequest> = pr_records
        .iter()
        .filter(|record| branch_matches(&record.head_ref_name, issue))
        .map(PullRecord::to_pull_request)
        .collect();

    for record in pr_records {
        if linked.iter().any(|pr| pr.number == record.number) {
            continue;
        }
        if let Some(body) = cache.pull_request_body(record.number)
            && closes_issue(&body, issue)
        {
            linked.push(record.to_pull_request());
        }
    }
    linked
}

/// Program-level PR list: first occurrence wins, in sub-issue order.
fn union_prs(sub_issues: &[SubIssue]) -> Vec<PullRequest> {
    let mut prs: Vec<PullRequest> = Vec::new();
    for pr in sub_issues.iter().flat_map(|issue| &issue.linked_prs) {
        if !prs.iter().any(|seen| seen.number == pr.number) {
            prs.push(pr.clone());
        }
    }
    prs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{IssueState, Phase};
    use crate::test_support::{
        LocalFixture, ScriptedSessions, ScriptedSource, SourceCall, issue_record,
        merged_pull_record, pull_record,
    };

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-30T12:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    fn request(parent: u64) -> ProgramRequest {
        ProgramRequest {
            repo: "acme/widgets".to_string(),
            parent,
        }
    }

    fn run(source: &ScriptedSource, fixture: &LocalFixture) -> ProgramOutcome {
        let sessions = ScriptedSessions::new(&[]);
        let collaborators = Collaborators {
            evidence: source,
            sessions: &sessions,
            paths: &fixture.paths,
        };
        discover_program(&collaborators, &OverseerConfig::default(), &request(100), now())
    }

    fn resolved(outcome: ProgramOutcome) -> ProgramGraph {
        match outcome {
            ProgramOutcome::Resolved(graph) => *graph,
            ProgramOutcome::Unresolved { .. } => panic!("expected a resolved program"),
        }
    }

    #[test]
    fn missing_parent_is_unresolved() {
        let fixture = LocalFixture::new();
        let outcome = run(&ScriptedSource::new(), &fixture);
        assert_eq!(
            outcome,
            ProgramOutcome::Unresolved {
                repo: "acme/widgets".to_string(),
                parent: 100
            }
        );
    }

    #[test]
    fn no_evidence_is_an_empty_program() {
        let fixture = LocalFixture::new();
        let source = ScriptedSource::new()
            .with_issue(issue_record(100, IssueState::Open, "nothing here"))
            .with_recent_issue(100, "mentions #100 itself");
        let program = resolved(run(&source, &fixture));
        assert!(program.sub_issues.is_empty());
        assert_eq!(program.phase, Phase::Unknown);
        assert!(program.graph.is_none());
        assert!(source.calls().contains(&SourceCall::RecentIssues(50)));
    }

    #[test]
    fn undetailed_sub_issues_are_dropped() {
        let fixture = LocalFixture::new();
        let source = ScriptedSource::new()
            .with_issue(issue_record(
                100,
                IssueState::Open,
                "<!-- overseer-sub-issues: 101, 102 -->",
            ))
            .with_issue(issue_record(101, IssueState::Open, ""));
        let program = resolved(run(&source, &fixture));
        let numbers: Vec<u64> = program.sub_issues.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![101]);
    }

    #[test]
    fn comments_and_state_items_feed_discovery() {
        let fixture = LocalFixture::new();
        fixture.write_item(
            "acme_105.json",
            r#"{"number":105,"status":"failed","attempts":2,"last_error":"boom","parent_issue":"100"}"#,
        );
        let source = ScriptedSource::new()
            .with_issue(issue_record(100, IssueState::Open, ""))
            .with_comments(100, &["Superseded by #103 and #104"])
            .with_issue(issue_record(103, IssueState::Closed, ""))
            .with_issue(issue_record(104, IssueState::Open, ""))
            .with_issue(issue_record(105, IssueState::Open, ""));
        let program = resolved(run(&source, &fixture));
        let numbers: Vec<u64> = program.sub_issues.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![103, 104, 105]);
        let status = program.sub_issues[2]
            .pipeline_status
            .as_ref()
            .expect("pipeline status");
        assert_eq!(status.attempts, 2);
        assert_eq!(program.blockers.len(), 1);
        assert!(!source.calls().contains(&SourceCall::RecentIssues(50)));
    }

    #[test]
    fn pr_linked_by_branch_and_body_appears_once() {
        let fixture = LocalFixture::new();
        let source = ScriptedSource::new()
            .with_issue(issue_record(
                100,
                IssueState::Open,
                "<!-- overseer-sub-issues: 42 -->",
            ))
            .with_issue(issue_record(42, IssueState::Open, ""))
            .with_pull_request(pull_record(7, "agent/issue-42"), "Closes #42")
            .with_pull_request(merged_pull_record(8, "other"), "fixes #42.");
        let program = resolved(run(&source, &fixture));
        let linked: Vec<u64> = program.sub_issues[0]
            .linked_prs
            .iter()
            .map(|pr| pr.number)
            .collect();
        assert_eq!(linked, vec![7, 8]);
        assert_eq!(program.prs.len(), 2);
        // Branch-matched PR 7 never needs its body.
        assert!(!source.calls().contains(&SourceCall::PullRequestBody(7)));
    }
}
