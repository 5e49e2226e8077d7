//! End-to-end discovery scenarios over scripted evidence and a temp
//! automation root.
//!
//! These tests drive `discover_program` the way the CLI does and check the
//! aggregate that comes back, plus how often each external query ran.

use overseer::core::types::{
    Blocker, Confidence, IssueState, NextStep, Phase, ProgramGraph, ProgramOutcome, Risk,
};
use overseer::discover::{Collaborators, ProgramRequest, discover_program};
use overseer::format::{Format, render};
use overseer::io::config::OverseerConfig;
use overseer::test_support::{
    LocalFixture, ScriptedSessions, ScriptedSource, SourceCall, fixed_now, issue_record,
    labeled_record, merged_pull_record, pull_record,
};

fn discover(
    source: &ScriptedSource,
    sessions: &ScriptedSessions,
    fixture: &LocalFixture,
    config: &OverseerConfig,
) -> ProgramOutcome {
    let collaborators = Collaborators {
        evidence: source,
        sessions,
        paths: &fixture.paths,
    };
    let request = ProgramRequest {
        repo: "acme/widgets".to_string(),
        parent: 100,
    };
    discover_program(&collaborators, config, &request, fixed_now())
}

fn resolved(outcome: ProgramOutcome) -> ProgramGraph {
    match outcome {
        ProgramOutcome::Resolved(program) => *program,
        ProgramOutcome::Unresolved { .. } => panic!("expected a resolved program"),
    }
}

/// Parent #100 lists #101 (closed, merged PR) and #102 (open, blocked by #101).
#[test]
fn two_issue_program_reports_progress_and_ready_work() {
    let fixture = LocalFixture::new();
    let source = ScriptedSource::new()
        .with_issue(issue_record(
            100,
            IssueState::Open,
            "Program\n<!-- overseer-sub-issues: 101, 102 -->",
        ))
        .with_issue(issue_record(101, IssueState::Closed, "First part"))
        .with_issue(issue_record(
            102,
            IssueState::Open,
            "Second part\n**Blocked By:** #101",
        ))
        .with_pull_request(merged_pull_record(201, "agent/issue-101"), "Closes #101");

    let program = resolved(discover(
        &source,
        &ScriptedSessions::new(&[]),
        &fixture,
        &OverseerConfig::default(),
    ));

    assert_eq!(program.progress.issues.done, 1);
    assert_eq!(program.progress.issues.total, 2);
    assert_eq!(program.progress.prs.merged, 1);
    assert_eq!(program.progress.prs.total, 1);
    assert_eq!(program.progress.percent, 67);
    assert_ne!(program.phase, Phase::Done);
    assert!(program.blockers.is_empty());
    assert!(
        program
            .next_steps
            .iter()
            .any(|step| step.to_string() == "#102 is unblocked and ready for work")
    );

    let graph = program.graph.as_ref().expect("graph");
    assert_eq!(graph.nodes, vec![101, 102]);
    assert_eq!(graph.critical_path, vec![102]);

    let text = render(
        &ProgramOutcome::Resolved(Box::new(program)),
        Format::Text,
        &OverseerConfig::default().label_rules(),
    )
    .expect("render");
    assert!(text.contains("(67%)"));
}

#[test]
fn marker_ids_are_discovered_exactly() {
    let fixture = LocalFixture::new();
    let source = ScriptedSource::new()
        .with_issue(issue_record(
            100,
            IssueState::Open,
            "<!-- overseer-sub-issues: 5, 7, 9 -->\nsee #100",
        ))
        .with_issue(issue_record(5, IssueState::Open, ""))
        .with_issue(issue_record(7, IssueState::Open, ""))
        .with_issue(issue_record(9, IssueState::Open, ""));
    let program = resolved(discover(
        &source,
        &ScriptedSessions::new(&[]),
        &fixture,
        &OverseerConfig::default(),
    ));
    let numbers: Vec<u64> = program.sub_issues.iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![5, 7, 9]);
}

#[test]
fn every_query_runs_at_most_once() {
    let fixture = LocalFixture::new();
    let source = ScriptedSource::new()
        .with_issue(issue_record(
            100,
            IssueState::Open,
            "| # | Title |\n|---|---|\n| #1 | a |\n| #2 | b |\n| #3 | c |",
        ))
        .with_comments(100, &["Superseded by #2, #3"])
        .with_issue(issue_record(1, IssueState::Open, ""))
        .with_issue(issue_record(2, IssueState::Open, "**Blocked By:** #1"))
        .with_issue(issue_record(3, IssueState::Open, "**Blocked By:** #1, #2"))
        .with_pull_request(pull_record(10, "feature/a"), "Fixes #1")
        .with_pull_request(pull_record(11, "feature/b"), "Refactor")
        .with_pull_request(pull_record(12, "agent/issue-3"), "Closes #3");

    let program = resolved(discover(
        &source,
        &ScriptedSessions::new(&[]),
        &fixture,
        &OverseerConfig::default(),
    ));
    assert_eq!(program.sub_issues.len(), 3);

    let calls = source.calls();
    let mut unique = calls.clone();
    unique.sort_by_key(|call| format!("{call:?}"));
    unique.dedup();
    assert_eq!(calls.len(), unique.len(), "repeated query in {calls:?}");
    assert_eq!(
        calls
            .iter()
            .filter(|call| matches!(call, SourceCall::PullRequests(_)))
            .count(),
        1
    );
    assert!(!calls.contains(&SourceCall::RecentIssues(50)));
}

#[test]
fn branch_and_body_match_link_the_pr_once() {
    let fixture = LocalFixture::new();
    let source = ScriptedSource::new()
        .with_issue(issue_record(
            100,
            IssueState::Open,
            "<!-- overseer-sub-issues: 42 -->",
        ))
        .with_issue(issue_record(42, IssueState::Open, ""))
        .with_pull_request(pull_record(300, "agent/issue-42"), "Closes #42");
    let program = resolved(discover(
        &source,
        &ScriptedSessions::new(&[]),
        &fixture,
        &OverseerConfig::default(),
    ));
    assert_eq!(program.sub_issues[0].linked_prs.len(), 1);
    assert_eq!(program.prs.len(), 1);
    assert_eq!(program.phase, Phase::Review);
}

#[test]
fn fallback_search_finds_mentions_when_nothing_else_does() {
    let fixture = LocalFixture::new();
    let source = ScriptedSource::new()
        .with_issue(issue_record(100, IssueState::Open, "Big plan"))
        .with_recent_issue(150, "Part of #100")
        .with_recent_issue(151, "Unrelated, see #99")
        .with_issue(issue_record(150, IssueState::Open, ""));
    let program = resolved(discover(
        &source,
        &ScriptedSessions::new(&[]),
        &fixture,
        &OverseerConfig::default(),
    ));
    let numbers: Vec<u64> = program.sub_issues.iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![150]);
}

#[test]
fn local_state_sessions_and_metrics_shape_the_status() {
    let fixture = LocalFixture::new();
    fixture.write_item(
        "acme-widgets_11.json",
        r#"{"number":11,"status":"failed","attempts":3,"last_error":"tests failed"}"#,
    );
    fixture.write_item(
        "acme-widgets_12.json",
        r#"{"number":12,"status":"running","attempts":1}"#,
    );
    fixture.write_slots(8);
    fixture.write_metrics(&[
        r#"{"job":"agent-work","status":"success","duration_s":1800,"timestamp":"2024-06-29T00:00:00Z"}"#,
        r#"{"job":"agent-work","status":"success","duration_s":1800,"timestamp":"2024-06-28T00:00:00Z"}"#,
        r#"{"job":"pr-review","status":"success","duration_s":600,"timestamp":"2024-06-28T00:00:00Z"}"#,
        "garbage",
    ]);

    let source = ScriptedSource::new()
        .with_issue(issue_record(
            100,
            IssueState::Open,
            "<!-- overseer-sub-issues: 11, 12, 13, 14 -->",
        ))
        .with_issue(issue_record(11, IssueState::Open, ""))
        .with_issue(issue_record(12, IssueState::Open, ""))
        .with_issue(issue_record(13, IssueState::Open, "**Blocked By:** #14"))
        .with_issue(labeled_record(14, &["human-only"], ""));
    let sessions = ScriptedSessions::new(&["issue-13-work"]);

    let program = resolved(discover(
        &source,
        &sessions,
        &fixture,
        &OverseerConfig::default(),
    ));

    assert!(program.blockers.contains(&Blocker::PipelineFailure {
        issue: 11,
        status: "failed".to_string(),
        last_error: Some("tests failed".to_string()),
    }));
    assert!(program.blockers.contains(&Blocker::Dependency {
        issue: 13,
        blocked_by: 14
    }));
    assert!(program.risks.contains(&Risk::RepeatedFailures {
        issue: 11,
        attempts: 3
    }));
    assert!(program.risks.contains(&Risk::Capacity { active: 8, max: 10 }));

    let active: Vec<u64> = program.active_work.iter().map(|w| w.issue).collect();
    assert_eq!(active, vec![12, 13]);
    assert_eq!(program.sub_issues[2].session.as_deref(), Some("issue-13-work"));

    assert_eq!(
        program.next_steps,
        vec![
            NextStep::Ready { issue: 11 },
            NextStep::HumanDecision { issue: 14 },
        ]
    );

    let eta = program.eta.as_ref().expect("eta");
    assert_eq!(eta.avg_implementation_minutes, Some(30));
    assert_eq!(eta.remaining_issues, 4);
    assert_eq!(eta.estimated_minutes, Some(30));
    assert_eq!(eta.confidence, Confidence::Medium);
}

#[test]
fn unavailable_sessions_and_missing_state_still_resolve() {
    let fixture = LocalFixture::new();
    let source = ScriptedSource::new()
        .with_issue(issue_record(
            100,
            IssueState::Open,
            "<!-- overseer-sub-issues: 1 -->",
        ))
        .with_issue(issue_record(1, IssueState::Open, ""));
    let program = resolved(discover(
        &source,
        &ScriptedSessions::unavailable(),
        &fixture,
        &OverseerConfig::default(),
    ));
    assert!(program.eta.is_none());
    assert!(program.active_work.is_empty());
    assert_eq!(program.next_steps, vec![NextStep::Ready { issue: 1 }]);
}
