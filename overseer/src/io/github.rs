//! Issue tracker evidence via the `gh` CLI.
//!
//! The [`EvidenceSource`] trait decouples discovery from the tracker backend.
//! Tests use scripted sources that return canned records without spawning
//! processes.

use std::ffi::OsString;
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::core::evidence::{IssueRecord, IssueSummary, PullRecord};
use crate::io::post::{Comment, CommentStore};
use crate::io::process::{QueryLimits, capture_stdout};

const ISSUE_FIELDS: &str = "number,title,state,labels,body";
const PR_FIELDS: &str = "number,title,state,headRefName,url,reviewDecision,mergeable,mergedAt";

/// Read-only issue tracker queries used by discovery.
///
/// Every method reports failure as `None`; callers treat that as absent
/// evidence rather than an error.
pub trait EvidenceSource {
    fn issue(&self, number: u64) -> Option<IssueRecord>;

    /// Comment bodies on `number`, oldest first.
    fn comments(&self, number: u64) -> Option<Vec<String>>;

    /// The most recent `limit` pull requests in any state.
    fn pull_requests(&self, limit: usize) -> Option<Vec<PullRecord>>;

    fn pull_request_body(&self, number: u64) -> Option<String>;

    /// The most recent `limit` issues in any state.
    fn recent_issues(&self, limit: usize) -> Option<Vec<IssueSummary>>;
}

/// [`EvidenceSource`] and [`CommentStore`] backed by `gh`.
#[derive(Debug, Clone)]
pub struct GhCli {
    repo: String,
    limits: QueryLimits,
    program: OsString,
    program_args: Vec<OsString>,
}

#[derive(Deserialize)]
struct CommentsPayload {
    #[serde(default)]
    comments: Vec<CommentBody>,
}

#[derive(Deserialize)]
struct CommentBody {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Deserialize)]
struct BodyPayload {
    #[serde(default)]
    body: Option<String>,
}

impl GhCli {
    pub fn new(repo: impl Into<String>, limits: QueryLimits) -> Self {
        Self {
            repo: repo.into(),
            limits,
            program: OsString::from("gh"),
            program_args: Vec::new(),
        }
    }

    /// Use a different executable instead of `gh` from `PATH`; `leading_args`
    /// go before the gh subcommand.
    pub fn with_program<I, A>(mut self, program: impl Into<OsString>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.program = program.into();
        self.program_args = leading_args.into_iter().map(Into::into).collect();
        self
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.program_args).args(args);
        cmd
    }

    fn run_json<T: DeserializeOwned>(&self, args: &[String]) -> Result<T> {
        let stdout = capture_stdout(self.command(args), None, self.limits)
            .with_context(|| format!("gh {}", args.join(" ")))?;
        serde_json::from_str(&stdout)
            .with_context(|| format!("parse output of gh {}", args.join(" ")))
    }

    fn query<T: DeserializeOwned>(&self, what: &str, args: Vec<String>) -> Option<T> {
        match self.run_json(&args) {
            Ok(value) => {
                debug!(repo = %self.repo, query = what, "external query ok");
                Some(value)
            }
            Err(err) => {
                warn!(repo = %self.repo, query = what, error = %format!("{err:#}"), "external query failed");
                None
            }
        }
    }

    fn repo_args(&self, args: &[&str]) -> Vec<String> {
        let mut out: Vec<String> = args.iter().map(|arg| (*arg).to_string()).collect();
        out.push("--repo".to_string());
        out.push(self.repo.clone());
        out
    }
}

impl EvidenceSource for GhCli {
    #[instrument(skip(self))]
    fn issue(&self, number: u64) -> Option<IssueRecord> {
        let n = number.to_string();
        self.query(
            "issue",
            self.repo_args(&["issue", "view", &n, "--json", ISSUE_FIELDS]),
        )
    }

    #[instrument(skip(self))]
    fn comments(&self, number: u64) -> Option<Vec<String>> {
        let n = number.to_string();
        let payload: CommentsPayload = self.query(
            "comments",
            self.repo_args(&["issue", "view", &n, "--json", "comments"]),
        )?;
        Some(
            payload
                .comments
                .into_iter()
                .filter_map(|comment| comment.body)
                .collect(),
        )
    }

    #[instrument(skip(self))]
    fn pull_requests(&self, limit: usize) -> Option<Vec<PullRecord>> {
        let limit = limit.to_string();
        self.query(
            "pr_list",
            self.repo_args(&[
                "pr", "list", "--state", "all", "--limit", &limit, "--json", PR_FIELDS,
            ]),
        )
    }

    #[instrument(skip(self))]
    fn pull_request_body(&self, number: u64) -> Option<String> {
        let n = number.to_string();
        let payload: BodyPayload = self.query(
            "pr_body",
            self.repo_args(&["pr", "view", &n, "--json", "body"]),
        )?;
        Some(payload.body.unwrap_or_default())
    }

    #[instrument(skip(self))]
    fn recent_issues(&self, limit: usize) -> Option<Vec<IssueSummary>> {
        let limit = limit.to_string();
        self.query(
            "issue_list",
            self.repo_args(&[
                "issue",
                "list",
                "--state",
                "all",
                "--limit",
                &limit,
                "--json",
                "number,body",
            ]),
        )
    }
}

impl CommentStore for GhCli {
    #[instrument(skip(self))]
    fn list_comments(&self, issue: u64) -> Result<Vec<Comment>> {
        let args = vec![
            "api".to_string(),
            format!("repos/{}/issues/{issue}/comments?per_page=100", self.repo),
        ];
        self.run_json(&args)
    }

    #[instrument(skip(self, body))]
    fn update_comment(&self, comment_id: u64, body: &str) -> Result<()> {
        let args = vec![
            "api".to_string(),
            format!("repos/{}/issues/comments/{comment_id}", self.repo),
            "-X".to_string(),
            "PATCH".to_string(),
            "-F".to_string(),
            "body=@-".to_string(),
        ];
        capture_stdout(self.command(&args), Some(body.as_bytes()), self.limits)
            .with_context(|| format!("update comment {comment_id} on {}", self.repo))?;
        Ok(())
    }

    #[instrument(skip(self, body))]
    fn create_comment(&self, issue: u64, body: &str) -> Result<()> {
        let n = issue.to_string();
        let args = self.repo_args(&["issue", "comment", &n, "--body-file", "-"]);
        capture_stdout(self.command(&args), Some(body.as_bytes()), self.limits)
            .with_context(|| format!("comment on issue #{issue} in {}", self.repo))?;
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::core::types::{IssueState, PrState};

    /// Write a shell stand-in for `gh` that prints `stdout` and exits `code`.
    fn fake_gh(dir: &Path, stdout: &str, code: i32) -> PathBuf {
        let path = dir.join("gh.sh");
        let script = format!("cat <<'JSON'\n{stdout}\nJSON\nexit {code}\n");
        fs::write(&path, script).expect("write fake gh");
        path
    }

    fn cli(script: &Path) -> GhCli {
        GhCli::new("acme/widgets", QueryLimits::default()).with_program("sh", [script])
    }

    #[test]
    fn parses_issue_view() {
        let temp = tempfile::tempdir().expect("tempdir");
        let gh = fake_gh(
            temp.path(),
            r#"{"number":7,"title":"Widget","state":"OPEN","labels":[{"name":"human-only"}],"body":"hi"}"#,
            0,
        );
        let issue = cli(&gh).issue(7).expect("issue");
        assert_eq!(issue.number, 7);
        assert_eq!(issue.state, IssueState::Open);
        assert_eq!(issue.label_names().collect::<Vec<_>>(), vec!["human-only"]);
    }

    #[test]
    fn parses_pr_list_with_nulls() {
        let temp = tempfile::tempdir().expect("tempdir");
        let gh = fake_gh(
            temp.path(),
            r#"[{"number":3,"title":"Fix","state":"MERGED","headRefName":"agent/issue-5","url":"u","reviewDecision":"","mergeable":"UNKNOWN","mergedAt":"2024-06-01T00:00:00Z"},
               {"number":4,"title":"WIP","state":"OPEN","headRefName":"x","url":"u","reviewDecision":null,"mergeable":"MERGEABLE","mergedAt":null}]"#,
            0,
        );
        let prs = cli(&gh).pull_requests(20).expect("prs");
        assert_eq!(prs.len(), 2);
        assert!(prs[0].to_pull_request().merged);
        assert_eq!(prs[1].state, PrState::Open);
        assert!(!prs[1].to_pull_request().merged);
    }

    #[test]
    fn comments_keep_order_and_skip_null_bodies() {
        let temp = tempfile::tempdir().expect("tempdir");
        let gh = fake_gh(
            temp.path(),
            r#"{"comments":[{"body":"first"},{"body":null},{"body":"second"}]}"#,
            0,
        );
        let comments = cli(&gh).comments(1).expect("comments");
        assert_eq!(comments, vec!["first", "second"]);
    }

    #[test]
    fn failures_read_as_absent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let failing = fake_gh(temp.path(), "not found", 1);
        assert_eq!(cli(&failing).issue(1), None);

        let garbage = tempfile::tempdir().expect("tempdir");
        let garbled = fake_gh(garbage.path(), "{not json", 0);
        assert_eq!(cli(&garbled).pull_request_body(1), None);
    }

    #[test]
    fn missing_program_reads_as_absent() {
        let gh = GhCli::new("acme/widgets", QueryLimits::default())
            .with_program("/nonexistent/overseer-gh", Vec::<String>::new());
        assert_eq!(gh.recent_issues(5), None);
    }
}
