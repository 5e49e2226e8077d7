//! Overseer configuration stored at `<root>/overseer.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::core::eta::EtaSettings;
use crate::core::status::LabelRules;
use crate::io::process::QueryLimits;

/// Overseer configuration (TOML).
///
/// Edited by humans; missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OverseerConfig {
    /// Repositories (`owner/repo`) under automation.
    pub repos: Vec<String>,

    /// Agent work slots available at once; drives ETA parallelism and capacity risk.
    pub max_concurrent_work: usize,

    /// Wall-clock timeout for each external query.
    pub query_timeout_secs: u64,

    /// Discard external query output beyond this many bytes.
    pub query_output_limit_bytes: usize,

    /// Page size of the PR list scanned for linkage.
    pub pr_list_limit: usize,

    /// Number of recent issues scanned by the full-text fallback.
    pub fallback_issue_limit: usize,

    /// Rolling window of metrics used for ETAs.
    pub eta_window_days: u32,

    /// tmux session whose windows are live agent sessions.
    pub session_name: String,

    /// Label marking sub-issues still in research.
    pub research_label: String,

    /// Label marking sub-issues that wait on a human decision.
    pub human_label: String,
}

impl Default for OverseerConfig {
    fn default() -> Self {
        let labels = LabelRules::default();
        Self {
            repos: Vec::new(),
            max_concurrent_work: 10,
            query_timeout_secs: 15,
            query_output_limit_bytes: 4 * 1024 * 1024,
            pr_list_limit: 20,
            fallback_issue_limit: 50,
            eta_window_days: 30,
            session_name: "overseer".to_string(),
            research_label: labels.research,
            human_label: labels.human,
        }
    }
}

impl OverseerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_work == 0 {
            return Err(anyhow!("max_concurrent_work must be > 0"));
        }
        if self.query_timeout_secs == 0 {
            return Err(anyhow!("query_timeout_secs must be > 0"));
        }
        if self.query_output_limit_bytes == 0 {
            return Err(anyhow!("query_output_limit_bytes must be > 0"));
        }
        if self.pr_list_limit == 0 {
            return Err(anyhow!("pr_list_limit must be > 0"));
        }
        if self.eta_window_days == 0 {
            return Err(anyhow!("eta_window_days must be > 0"));
        }
        if self.session_name.trim().is_empty() {
            return Err(anyhow!("session_name must be non-empty"));
        }
        if self.research_label.trim().is_empty() || self.human_label.trim().is_empty() {
            return Err(anyhow!("research_label and human_label must be non-empty"));
        }
        if let Some(repo) = self.repos.iter().find(|repo| !is_repo_slug(repo)) {
            return Err(anyhow!("repos entry '{repo}' must look like owner/repo"));
        }
        Ok(())
    }

    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            timeout: Duration::from_secs(self.query_timeout_secs),
            output_limit_bytes: self.query_output_limit_bytes,
        }
    }

    pub fn label_rules(&self) -> LabelRules {
        LabelRules {
            research: self.research_label.clone(),
            human: self.human_label.clone(),
        }
    }

    pub fn eta_settings(&self) -> EtaSettings {
        EtaSettings {
            window_days: self.eta_window_days,
            max_concurrent: self.max_concurrent_work,
        }
    }

    /// Pick the repository to inspect: an explicit choice wins, otherwise the
    /// single configured repo.
    pub fn resolve_repo(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(repo) = explicit {
            if !is_repo_slug(repo) {
                bail!("--repo '{repo}' must look like owner/repo");
            }
            return Ok(repo.to_string());
        }
        match self.repos.as_slice() {
            [] => bail!("no repos configured; use --repo to specify one"),
            [only] => Ok(only.clone()),
            many => bail!(
                "multiple repos configured; specify one with --repo:\n  {}",
                many.join("\n  ")
            ),
        }
    }
}

fn is_repo_slug(repo: &str) -> bool {
    match repo.split_once('/') {
        Some((owner, name)) => {
            !owner.trim().is_empty() && !name.trim().is_empty() && !name.contains('/')
        }
        None => false,
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `OverseerConfig::default()`.
pub fn load_config(path: &Path) -> Result<OverseerConfig> {
    if !path.exists() {
        let cfg = OverseerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: OverseerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, OverseerConfig::default());
    }

    #[test]
    fn full_file_loads() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("overseer.toml");
        fs::write(
            &path,
            "repos = [\"acme/widgets\"]\nmax_concurrent_work = 4\nquery_timeout_secs = 30\n",
        )
        .expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(
            loaded,
            OverseerConfig {
                repos: vec!["acme/widgets".to_string()],
                max_concurrent_work: 4,
                query_timeout_secs: 30,
                ..OverseerConfig::default()
            }
        );
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("overseer.toml");
        fs::write(&path, "max_concurrent_work = 3\nhuman_label = \"needs-human\"\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_concurrent_work, 3);
        assert_eq!(cfg.human_label, "needs-human");
        assert_eq!(cfg.research_label, "agent-research");
        assert_eq!(cfg.pr_list_limit, 20);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("overseer.toml");
        fs::write(&path, "max_concurrent_work = 0\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("max_concurrent_work"));
    }

    #[test]
    fn resolve_repo_prefers_explicit_then_single() {
        let mut cfg = OverseerConfig::default();
        assert!(cfg.resolve_repo(None).is_err());
        assert_eq!(cfg.resolve_repo(Some("a/b")).expect("explicit"), "a/b");

        cfg.repos = vec!["acme/one".to_string()];
        assert_eq!(cfg.resolve_repo(None).expect("single"), "acme/one");

        cfg.repos.push("acme/two".to_string());
        let err = cfg.resolve_repo(None).expect_err("ambiguous");
        assert!(err.to_string().contains("acme/two"));
        assert!(cfg.resolve_repo(Some("not-a-slug")).is_err());
    }
}
