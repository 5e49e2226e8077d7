//! Chat markup (mrkdwn-style) summary.

use crate::core::status::LabelRules;
use crate::core::types::{ProgramGraph, ProgramOutcome, SubIssue};

/// Only the most urgent next steps fit a chat message.
const CHAT_NEXT_STEPS: usize = 3;

pub fn render(outcome: &ProgramOutcome, labels: &LabelRules) -> String {
    match outcome {
        ProgramOutcome::Unresolved { .. } => {
            format!(":x: Error: {}", outcome.error_message().unwrap_or_default())
        }
        ProgramOutcome::Resolved(program) => render_program(program, labels),
    }
}

fn render_program(program: &ProgramGraph, labels: &LabelRules) -> String {
    let header = format!(
        ":clipboard: *Program Status: {} (#{})*",
        program.parent.title, program.parent.number
    );
    if program.sub_issues.is_empty() {
        return format!("{header}\n\nNo sub-issues found.");
    }

    let p = &program.progress;
    let mut lines = vec![
        header,
        format!(
            "*Phase:* {} | *Progress:* {}% ({}/{} issues, {}/{} PRs)",
            program.phase.as_str().to_uppercase(),
            p.percent,
            p.issues.done,
            p.issues.total,
            p.prs.merged,
            p.prs.total
        ),
        String::new(),
    ];

    for issue in &program.sub_issues {
        lines.push(format!(
            "{} #{}: {}",
            issue_emoji(issue, labels),
            issue.number,
            issue.title
        ));
    }

    if !program.blockers.is_empty() {
        lines.push(String::new());
        lines.push("*Blockers:*".to_string());
        for blocker in &program.blockers {
            lines.push(format!(":warning: {blocker}"));
        }
    }

    if !program.next_steps.is_empty() {
        lines.push(String::new());
        lines.push("*Next Steps:*".to_string());
        for step in program.next_steps.iter().take(CHAT_NEXT_STEPS) {
            lines.push(format!(":arrow_right: {step}"));
        }
    }

    lines.join("\n")
}

fn issue_emoji(issue: &SubIssue, labels: &LabelRules) -> &'static str {
    if issue.is_closed() {
        ":white_check_mark:"
    } else if issue.session.is_some() {
        ":arrows_counterclockwise:"
    } else if issue.has_label(&labels.human) {
        ":raising_hand:"
    } else {
        ":radio_button:"
    }
}
