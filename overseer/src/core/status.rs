//! Status aggregation over discovered sub-issues and their PRs.
//!
//! All functions are pure and deterministic: they walk `sub_issues` in
//! discovery order (ascending issue number) and `prs` in link order.

use std::collections::HashSet;

use crate::core::types::{
    ActiveWork, Blocker, IssueProgress, NextStep, Phase, PrProgress, Progress, PullRequest, Risk,
    SubIssue,
};

/// Share of active work slots at which capacity becomes a risk.
pub const CAPACITY_RISK_RATIO: f64 = 0.8;

/// Label names that drive phase, blocker and next-step rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRules {
    /// Marks work that is still being researched.
    pub research: String,
    /// Marks work that needs a human decision before agents can proceed.
    pub human: String,
}

impl Default for LabelRules {
    fn default() -> Self {
        Self {
            research: "agent-research".to_string(),
            human: "human-only".to_string(),
        }
    }
}

/// Occupied vs. configured agent work slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotUsage {
    pub active: usize,
    pub max: usize,
}

pub fn compute_progress(sub_issues: &[SubIssue], prs: &[PullRequest]) -> Progress {
    let issues = IssueProgress {
        done: sub_issues.iter().filter(|issue| issue.is_closed()).count(),
        total: sub_issues.len(),
    };
    let prs = PrProgress {
        merged: prs.iter().filter(|pr| pr.merged).count(),
        total: prs.len(),
    };

    let total = issues.total + prs.total;
    let done = issues.done + prs.merged;
    let percent = if total == 0 {
        0
    } else {
        (100.0 * done as f64 / total as f64).round().clamp(0.0, 100.0) as u8
    };

    Progress {
        issues,
        prs,
        percent,
    }
}

/// Classify the program; the first matching rule wins.
pub fn compute_phase(sub_issues: &[SubIssue], prs: &[PullRequest], labels: &LabelRules) -> Phase {
    if sub_issues.is_empty() {
        return Phase::Unknown;
    }
    if sub_issues.iter().all(SubIssue::is_closed) && prs.iter().all(|pr| pr.merged) {
        return Phase::Done;
    }
    let researching = sub_issues
        .iter()
        .any(|issue| issue.is_open() && issue.has_label(&labels.research));
    if researching && prs.is_empty() {
        return Phase::Research;
    }
    if prs.iter().any(|pr| pr.is_open() && pr.changes_requested()) {
        return Phase::Rework;
    }
    if prs.iter().any(PullRequest::awaiting_merge) {
        return Phase::Review;
    }
    Phase::Implementation
}

pub fn find_blockers(
    sub_issues: &[SubIssue],
    prs: &[PullRequest],
    labels: &LabelRules,
) -> Vec<Blocker> {
    let open: HashSet<u64> = open_numbers(sub_issues);
    let mut blockers = Vec::new();

    for issue in sub_issues {
        for &dep in &issue.dependencies {
            if open.contains(&dep) {
                blockers.push(Blocker::Dependency {
                    issue: issue.number,
                    blocked_by: dep,
                });
            }
        }

        if issue.has_label(&labels.human) {
            blockers.push(Blocker::HumanDecision {
                issue: issue.number,
            });
        }

        if let Some(status) = &issue.pipeline_status
            && status.is_failed()
        {
            blockers.push(Blocker::PipelineFailure {
                issue: issue.number,
                status: status.status.clone(),
                last_error: status.last_error.clone(),
            });
        }
    }

    for pr in prs {
        if pr.is_open() && pr.changes_requested() {
            blockers.push(Blocker::ReworkNeeded { pr: pr.number });
        }
    }

    blockers
}

pub fn find_risks(
    sub_issues: &[SubIssue],
    prs: &[PullRequest],
    labels: &LabelRules,
    slots: Option<SlotUsage>,
    cycles: &[Vec<u64>],
) -> Vec<Risk> {
    let mut risks = Vec::new();

    for issue in sub_issues {
        if let Some(status) = &issue.pipeline_status
            && status.attempts >= 2
        {
            risks.push(Risk::RepeatedFailures {
                issue: issue.number,
                attempts: status.attempts,
            });
        }
        if issue.has_label(&labels.human) {
            risks.push(Risk::HumanOnly {
                issue: issue.number,
            });
        }
    }

    for pr in prs {
        if pr.changes_requested() {
            risks.push(Risk::ChangesRequested { pr: pr.number });
        }
    }

    if let Some(SlotUsage { active, max }) = slots
        && max > 0
        && active as f64 / max as f64 >= CAPACITY_RISK_RATIO
    {
        risks.push(Risk::Capacity { active, max });
    }

    for cycle in cycles {
        risks.push(Risk::DependencyCycle {
            path: cycle.clone(),
        });
    }

    risks
}

pub fn find_active_work(sub_issues: &[SubIssue]) -> Vec<ActiveWork> {
    sub_issues
        .iter()
        .filter(|issue| issue.is_active())
        .map(|issue| ActiveWork {
            issue: issue.number,
            title: issue.title.clone(),
            session: issue.session.clone(),
        })
        .collect()
}

/// Recommended actions: merges first, then ready work, then cascades, then
/// human decisions.
pub fn compute_next_steps(
    sub_issues: &[SubIssue],
    prs: &[PullRequest],
    labels: &LabelRules,
) -> Vec<NextStep> {
    let mut steps: Vec<NextStep> = prs
        .iter()
        .filter(|pr| pr.awaiting_merge())
        .map(|pr| NextStep::AwaitingMerge { pr: pr.number })
        .collect();

    // Dependencies outside the discovered set count as unresolved.
    let closed: HashSet<u64> = sub_issues
        .iter()
        .filter(|issue| issue.is_closed())
        .map(|issue| issue.number)
        .collect();
    for issue in sub_issues {
        if !issue.is_open() || issue.has_label(&labels.human) || issue.is_active() {
            continue;
        }
        if issue.dependencies.iter().all(|dep| closed.contains(dep)) {
            steps.push(NextStep::Ready {
                issue: issue.number,
            });
        }
    }

    for issue in sub_issues {
        if !issue.is_open() || !issue.is_active() {
            continue;
        }
        let unblocks: Vec<u64> = sub_issues
            .iter()
            .filter(|other| other.is_open() && other.dependencies.contains(&issue.number))
            .map(|other| other.number)
            .collect();
        if !unblocks.is_empty() {
            steps.push(NextStep::Unblocks {
                issue: issue.number,
                unblocks,
            });
        }
    }

    for issue in sub_issues {
        if issue.is_open() && issue.has_label(&labels.human) {
            steps.push(NextStep::HumanDecision {
                issue: issue.number,
            });
        }
    }

    steps
}

fn open_numbers(sub_issues: &[SubIssue]) -> HashSet<u64> {
    sub_issues
        .iter()
        .filter(|issue| issue.is_open())
        .map(|issue| issue.number)
        .collect()
}
