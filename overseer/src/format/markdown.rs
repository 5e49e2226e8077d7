//! Issue-comment markdown.
//!
//! The first line is a hidden sentinel naming the parent, which lets a
//! re-post find and replace the previous report.

use crate::core::status::LabelRules;
use crate::core::types::{
    ProgramGraph, ProgramOutcome, PullRequest, ReviewDecision, SubIssue, join_refs,
};
use crate::format::progress_bar;

/// Hidden marker identifying an overseer status comment.
pub const STATUS_SENTINEL_PREFIX: &str = "overseer-program-status";

const BAR_WIDTH: usize = 20;

/// Sentinel line for the status comment on `parent`.
pub fn status_sentinel(parent: u64) -> String {
    format!("<!-- {STATUS_SENTINEL_PREFIX}: {parent} -->")
}

pub fn render(outcome: &ProgramOutcome, labels: &LabelRules) -> String {
    match outcome {
        ProgramOutcome::Unresolved { .. } => format!(
            "<!-- {STATUS_SENTINEL_PREFIX}: error -->\n**Error:** {}",
            outcome.error_message().unwrap_or_default()
        ),
        ProgramOutcome::Resolved(program) => render_program(program, labels),
    }
}

fn render_program(program: &ProgramGraph, labels: &LabelRules) -> String {
    let sentinel = status_sentinel(program.parent.number);
    if program.sub_issues.is_empty() {
        return format!("{sentinel}\n## Program Status\n\nNo sub-issues found for this issue.");
    }

    let p = &program.progress;
    let mut lines = vec![
        sentinel,
        "## Program Status".to_string(),
        String::new(),
        format!(
            "**Phase:** {} | **Progress:** {}%",
            program.phase.as_str().to_uppercase(),
            p.percent
        ),
        format!(
            "`{}` {}/{} issues done, {}/{} PRs merged",
            progress_bar(p.percent, BAR_WIDTH, '\u{2588}', '\u{2591}'),
            p.issues.done,
            p.issues.total,
            p.prs.merged,
            p.prs.total
        ),
        String::new(),
        "| Issue | Title | Status | PR | Blocked By |".to_string(),
        "|-------|-------|--------|-----|------------|".to_string(),
    ];

    for issue in &program.sub_issues {
        let prs = if issue.linked_prs.is_empty() {
            "-".to_string()
        } else {
            issue
                .linked_prs
                .iter()
                .map(|pr| format!("#{} ({})", pr.number, pr_status(pr)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let deps = if issue.dependencies.is_empty() {
            "-".to_string()
        } else {
            format!("after {}", join_refs(&issue.dependencies, ", "))
        };
        lines.push(format!(
            "| #{} | {} | {} | {prs} | {deps} |",
            issue.number,
            escape_cell(&issue.title),
            issue_status(issue, labels)
        ));
    }
    lines.push(String::new());

    if !program.blockers.is_empty() {
        lines.push("### Blockers".to_string());
        for blocker in &program.blockers {
            lines.push(format!("- :warning: **{}**: {blocker}", blocker.kind()));
        }
        lines.push(String::new());
    }

    if !program.active_work.is_empty() {
        lines.push("### Active Work".to_string());
        for work in &program.active_work {
            lines.push(format!("- :gear: #{}: {}", work.issue, work.title));
        }
        lines.push(String::new());
    }

    if let Some(eta) = &program.eta
        && let Some(minutes) = eta.estimated_minutes
    {
        lines.push("### ETAs".to_string());
        lines.push(format!(
            "- Estimated: ~{minutes} min remaining ({} confidence)",
            eta.confidence.as_str()
        ));
        lines.push(format!(
            "- Remaining: {} issues, {} open PRs",
            eta.remaining_issues, eta.open_prs
        ));
        lines.push(String::new());
    }

    if !program.next_steps.is_empty() {
        lines.push("### Next Steps".to_string());
        for (i, step) in program.next_steps.iter().enumerate() {
            lines.push(format!("{}. {step}", i + 1));
        }
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(format!(
        "*Updated: {} by overseer*",
        program.generated_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    ));

    lines.join("\n")
}

fn issue_status(issue: &SubIssue, labels: &LabelRules) -> &'static str {
    if issue.is_closed() {
        ":white_check_mark: Done"
    } else if issue.session.is_some() {
        ":arrows_counterclockwise: Active"
    } else if issue.has_label(&labels.human) {
        ":bust_in_silhouette: Human"
    } else if issue
        .pipeline_status
        .as_ref()
        .is_some_and(|status| status.is_running())
    {
        ":gear: Running"
    } else {
        ":radio_button: Open"
    }
}

fn pr_status(pr: &PullRequest) -> &'static str {
    if pr.merged {
        return ":purple_circle: Merged";
    }
    match pr.review_decision {
        ReviewDecision::ChangesRequested => ":red_circle: Rework",
        ReviewDecision::Approved => ":green_circle: Approved",
        _ => ":yellow_circle: Open",
    }
}

/// Keep a pipe in a title from splitting the table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PipelineStatus;
    use crate::test_support::{closed_issue, merged_pr, open_issue, open_pr, program_from};

    #[test]
    fn sentinel_is_the_first_line() {
        let program = program_from(42, vec![open_issue(43)]);
        let out = render(
            &ProgramOutcome::Resolved(Box::new(program)),
            &LabelRules::default(),
        );
        assert_eq!(
            out.lines().next(),
            Some("<!-- overseer-program-status: 42 -->")
        );
        assert!(out.ends_with("*Updated: 2024-06-30T12:00:00.000Z by overseer*"));
    }

    #[test]
    fn table_rows_show_status_prs_and_deps() {
        let running = PipelineStatus {
            status: "running".to_string(),
            attempts: 1,
            last_error: None,
        };
        let program = program_from(
            1,
            vec![
                closed_issue(2).with_prs(vec![merged_pr(10, "agent/issue-2")]),
                open_issue(3)
                    .with_dependencies(&[2])
                    .with_status(running)
                    .with_prs(vec![
                        open_pr(11, "agent/issue-3")
                            .with_review(ReviewDecision::ChangesRequested),
                    ]),
            ],
        );
        let out = render(
            &ProgramOutcome::Resolved(Box::new(program)),
            &LabelRules::default(),
        );
        assert!(out.contains("| #2 | Issue 2 | :white_check_mark: Done | #10 (:purple_circle: Merged) | - |"));
        assert!(out.contains("| #3 | Issue 3 | :gear: Running | #11 (:red_circle: Rework) | after #2 |"));
        assert!(out.contains("- :warning: **rework_needed**: PR #11 needs rework"));
        assert!(out.contains("`██████████░░░░░░░░░░`"));
    }

    #[test]
    fn posted_table_does_not_list_outside_dependencies() {
        let program = program_from(1, vec![open_issue(3).with_dependencies(&[99])]);
        let out = render(
            &ProgramOutcome::Resolved(Box::new(program)),
            &LabelRules::default(),
        );
        let listed = crate::core::discovery::table_row_ids(&out);
        assert!(listed.contains(&3));
        assert!(!listed.contains(&99));
    }

    #[test]
    fn error_and_empty_states() {
        let error = ProgramOutcome::Unresolved {
            repo: "acme/widgets".to_string(),
            parent: 8,
        };
        let out = render(&error, &LabelRules::default());
        assert!(out.contains("**Error:** Could not fetch issue #8 from acme/widgets"));

        let empty = ProgramOutcome::Resolved(Box::new(program_from(8, Vec::new())));
        let out = render(&empty, &LabelRules::default());
        assert!(out.starts_with("<!-- overseer-program-status: 8 -->"));
        assert!(out.contains("No sub-issues found"));
    }
}
