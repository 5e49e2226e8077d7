//! Canonical paths under the automation root.

use std::path::PathBuf;

/// Files overseer reads below the automation root.
#[derive(Debug, Clone)]
pub struct OverseerPaths {
    pub config_path: PathBuf,
    pub items_dir: PathBuf,
    pub slots_dir: PathBuf,
    pub metrics_path: PathBuf,
}

impl OverseerPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let state_dir = root.join("state");
        Self {
            config_path: root.join("overseer.toml"),
            items_dir: state_dir.join("items"),
            slots_dir: state_dir.join("agent-work-slots"),
            metrics_path: root.join("data").join("metrics.jsonl"),
        }
    }
}
