//! Local pipeline state: per-item JSON files and agent work slots.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::evidence::StateItem;

/// A parsed state file together with its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedItem {
    pub file_name: String,
    pub item: StateItem,
}

/// Load every `*.json` state file in `dir`, sorted by file name.
///
/// A missing directory yields no items. Unreadable or malformed files are
/// skipped with a warning.
pub fn load_state_items(dir: &Path) -> Result<Vec<LoadedItem>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "no state items directory");
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read state items {}", dir.display()));
        }
    };

    let mut items = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let parsed = fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))
            .and_then(|contents| {
                serde_json::from_str::<StateItem>(&contents)
                    .with_context(|| format!("parse {}", path.display()))
            });
        match parsed {
            Ok(item) => items.push(LoadedItem {
                file_name: file_name.to_string(),
                item,
            }),
            Err(err) => warn!(error = %format!("{err:#}"), "skipping state item"),
        }
    }
    items.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(items)
}

/// Pipeline state for `issue`: the first file (by name) ending in `_<issue>.json`.
pub fn find_item_for_issue(items: &[LoadedItem], issue: u64) -> Option<&StateItem> {
    let suffix = format!("_{issue}.json");
    items
        .iter()
        .find(|loaded| loaded.file_name.ends_with(&suffix))
        .map(|loaded| &loaded.item)
}

/// Number of occupied agent work slots (`*.pid` files in `dir`).
pub fn count_active_slots(dir: &Path) -> Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
        Err(err) => {
            return Err(err).with_context(|| format!("read slots {}", dir.display()));
        }
    };
    let mut count = 0;
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        if entry.path().extension().and_then(|ext| ext.to_str()) == Some("pid") {
            count += 1;
        }
    }
    Ok(count)
}
