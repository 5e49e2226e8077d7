//! Program status CLI.
//!
//! Reconstructs the sub-issue graph under a parent issue and prints a status
//! report. With `--post`, the markdown report is upserted as a comment on the
//! parent issue.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use overseer::core::types::ProgramOutcome;
use overseer::discover::{Collaborators, ProgramRequest, discover_program};
use overseer::exit_codes;
use overseer::format::{self, Format};
use overseer::io::config::load_config;
use overseer::io::github::GhCli;
use overseer::io::layout::OverseerPaths;
use overseer::io::post::{PostAction, upsert_status_comment};
use overseer::io::sessions::TmuxSessions;
use overseer::logging;

#[derive(Parser)]
#[command(
    name = "overseer",
    version,
    about = "Program graph discovery and status aggregation for agent-driven work"
)]
struct Cli {
    /// Automation root holding `overseer.toml`, `state/` and `data/`.
    #[arg(long, env = "OVERSEER_ROOT", default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report the status of the program rooted at a parent issue.
    Program {
        /// Parent issue number.
        issue: u64,
        /// Repository (`owner/repo`); defaults to the single configured repo.
        #[arg(long)]
        repo: Option<String>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Upsert the markdown report as a comment on the parent issue.
        #[arg(long)]
        post: bool,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Program {
            issue,
            repo,
            format: output,
            post,
        } => cmd_program(&cli.root, issue, repo.as_deref(), output, post),
    }
}

fn cmd_program(
    root: &Path,
    issue: u64,
    repo: Option<&str>,
    output: Format,
    post: bool,
) -> Result<i32> {
    let paths = OverseerPaths::new(root);
    let config = load_config(&paths.config_path)?;
    let repo = config.resolve_repo(repo)?;
    let limits = config.query_limits();

    let gh = GhCli::new(repo.clone(), limits);
    let sessions = TmuxSessions::new(config.session_name.clone(), limits);
    let collaborators = Collaborators {
        evidence: &gh,
        sessions: &sessions,
        paths: &paths,
    };
    let request = ProgramRequest {
        repo,
        parent: issue,
    };
    let outcome = discover_program(&collaborators, &config, &request, Utc::now());
    let labels = config.label_rules();

    let rendered = format::render(&outcome, output, &labels)?;
    println!("{rendered}");

    if matches!(outcome, ProgramOutcome::Unresolved { .. }) {
        return Ok(exit_codes::UNRESOLVED);
    }

    if post {
        let body = format::markdown::render(&outcome, &labels);
        let action = upsert_status_comment(&gh, issue, &body)
            .with_context(|| format!("post status to #{issue}"))?;
        match action {
            PostAction::Updated { comment_id } => {
                eprintln!("Updated status comment {comment_id} on #{issue}");
            }
            PostAction::Created => eprintln!("Posted status comment on #{issue}"),
        }
    }

    Ok(exit_codes::OK)
}
