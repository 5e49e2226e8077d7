//! Live agent sessions from the terminal multiplexer.

use std::process::Command;

use tracing::{instrument, warn};

use crate::io::process::{QueryLimits, capture_stdout};

/// Names of the currently live agent session windows.
pub trait SessionSource {
    /// `None` when the session list could not be read.
    fn window_names(&self) -> Option<Vec<String>>;
}

/// [`SessionSource`] backed by `tmux list-windows`.
#[derive(Debug, Clone)]
pub struct TmuxSessions {
    session: String,
    limits: QueryLimits,
}

impl TmuxSessions {
    pub fn new(session: impl Into<String>, limits: QueryLimits) -> Self {
        Self {
            session: session.into(),
            limits,
        }
    }
}

impl SessionSource for TmuxSessions {
    #[instrument(skip(self), fields(session = %self.session))]
    fn window_names(&self) -> Option<Vec<String>> {
        let mut cmd = Command::new("tmux");
        cmd.args(["list-windows", "-t", &self.session, "-F", "#{window_name}"]);
        match capture_stdout(cmd, None, self.limits) {
            Ok(stdout) => Some(parse_window_names(&stdout)),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "could not list session windows");
                None
            }
        }
    }
}

fn parse_window_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_window_per_line() {
        let names = parse_window_names("issue-12-work\n\n  review-40 \n");
        assert_eq!(names, vec!["issue-12-work", "review-40"]);
    }
}
