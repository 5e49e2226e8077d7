//! Plain-text terminal report.

use std::collections::HashSet;

use crate::core::status::LabelRules;
use crate::core::types::{ProgramGraph, ProgramOutcome, ReviewDecision, join_refs};
use crate::format::progress_bar;

const BAR_WIDTH: usize = 30;

pub fn render(outcome: &ProgramOutcome, labels: &LabelRules) -> String {
    match outcome {
        ProgramOutcome::Unresolved { .. } => {
            format!("Error: {}", outcome.error_message().unwrap_or_default())
        }
        ProgramOutcome::Resolved(program) => render_program(program, labels),
    }
}

fn render_program(program: &ProgramGraph, labels: &LabelRules) -> String {
    let mut lines = vec![
        format!(
            "Program Status: {} (#{})",
            program.parent.title, program.parent.number
        ),
        "=".repeat(60),
    ];

    if program.sub_issues.is_empty() {
        lines.push(String::new());
        lines.push("No sub-issues found for this issue.".to_string());
        lines.push(
            "This issue may not be a program parent, or sub-issues haven't been created yet."
                .to_string(),
        );
        return lines.join("\n");
    }

    let p = &program.progress;
    lines.push(format!(
        "Phase: {} | Progress: {}/{} sub-issues done, {}/{} PRs merged ({}%)",
        program.phase.as_str().to_uppercase(),
        p.issues.done,
        p.issues.total,
        p.prs.merged,
        p.prs.total,
        p.percent
    ));
    lines.push(String::new());
    lines.push(format!(
        "  [{}] {}%",
        progress_bar(p.percent, BAR_WIDTH, '#', '-'),
        p.percent
    ));
    lines.push(String::new());

    lines.push("Sub-Issues:".to_string());
    for issue in &program.sub_issues {
        let check = if issue.is_closed() { 'x' } else { ' ' };
        let mut flags = Vec::new();
        if issue
            .pipeline_status
            .as_ref()
            .is_some_and(|status| status.is_running())
        {
            flags.push("running");
        }
        if issue.session.is_some() {
            flags.push("ACTIVE");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        lines.push(format!(
            "  [{check}] #{}: {} ({}){flags}",
            issue.number,
            issue.title,
            issue.state.as_str()
        ));

        if !issue.dependencies.is_empty() {
            lines.push(format!(
                "        Blocked by: {}",
                join_refs(&issue.dependencies, ", ")
            ));
        }
        for pr in &issue.linked_prs {
            let state = if pr.merged { "MERGED" } else { pr.state.as_str() };
            let extra = match pr.review_decision {
                ReviewDecision::ChangesRequested => " (rework needed)",
                ReviewDecision::Approved => " (approved)",
                _ => "",
            };
            lines.push(format!("        PR #{}: {state}{extra}", pr.number));
        }
        if issue.has_label(&labels.human) {
            lines.push(format!("        {}", labels.human));
        }
    }
    lines.push(String::new());

    if let Some(graph) = &program.graph
        && !graph.edges.is_empty()
    {
        lines.push("Dependency Chain:".to_string());
        for edge in &graph.edges {
            lines.push(format!("  #{} --> #{}", edge.from, edge.to));
        }
        let linked: HashSet<u64> = graph
            .edges
            .iter()
            .flat_map(|edge| [edge.from, edge.to])
            .collect();
        for node in graph.nodes.iter().filter(|node| !linked.contains(*node)) {
            lines.push(format!("  #{node} (independent)"));
        }
        if !graph.critical_path.is_empty() {
            lines.push(format!(
                "  Critical path: {}",
                join_refs(&graph.critical_path, " -> ")
            ));
        }
        for cycle in &graph.cycles {
            lines.push(format!("  Cycle: {}", join_refs(cycle, " -> ")));
        }
        lines.push(String::new());
    }

    if !program.blockers.is_empty() {
        lines.push("Blockers:".to_string());
        for blocker in &program.blockers {
            lines.push(format!("  [{}] {blocker}", blocker.kind()));
        }
        lines.push(String::new());
    }

    if !program.risks.is_empty() {
        lines.push("Risks:".to_string());
        for risk in &program.risks {
            lines.push(format!("  [{}] {risk}", risk.kind()));
        }
        lines.push(String::new());
    }

    if !program.active_work.is_empty() {
        lines.push("Active Work:".to_string());
        for work in &program.active_work {
            let session = work
                .session
                .as_deref()
                .map(|session| format!(" (tmux: {session})"))
                .unwrap_or_default();
            lines.push(format!("  #{}: {}{session}", work.issue, work.title));
        }
        lines.push(String::new());
    }

    if let Some(eta) = &program.eta {
        lines.push("ETAs:".to_string());
        let mut averages = Vec::new();
        if let Some(avg) = eta.avg_implementation_minutes {
            averages.push(format!("Avg implementation: {avg} min"));
        }
        if let Some(avg) = eta.avg_review_minutes {
            averages.push(format!("Avg review: {avg} min"));
        }
        if !averages.is_empty() {
            lines.push(format!("  {}", averages.join(" | ")));
        }
        lines.push(format!(
            "  Remaining: {} issues, {} open PRs",
            eta.remaining_issues, eta.open_prs
        ));
        if let Some(minutes) = eta.estimated_minutes {
            lines.push(format!(
                "  Estimated: ~{minutes} min remaining ({} confidence)",
                eta.confidence.as_str()
            ));
        }
        lines.push(String::new());
    }

    if !program.next_steps.is_empty() {
        lines.push("Next Steps:".to_string());
        for (i, step) in program.next_steps.iter().enumerate() {
            lines.push(format!("  {}. {step}", i + 1));
        }
    }

    lines.join("\n")
}
