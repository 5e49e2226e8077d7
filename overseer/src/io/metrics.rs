//! Historical execution metrics (`data/metrics.jsonl`).

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::evidence::MetricRecord;

/// Read every well-formed metric line. A missing file yields no records;
/// blank and malformed lines are skipped.
pub fn load_metrics(path: &Path) -> Result<Vec<MetricRecord>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<MetricRecord>(line) {
            Ok(record) => records.push(record),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(path = %path.display(), skipped, "skipped malformed metric lines");
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_has_no_records() {
        let temp = tempfile::tempdir().expect("tempdir");
        let records = load_metrics(&temp.path().join("metrics.jsonl")).expect("load");
        assert!(records.is_empty());
    }

    #[test]
    fn skips_malformed_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("metrics.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"job":"agent-work","status":"success","duration_s":600,"timestamp":"2024-06-01T00:00:00Z"}"#,
                "\n\nnot json\n",
                r#"{"job":"pr-review","status":"failure","duration_s":null,"timestamp":"2024-06-02T00:00:00Z"}"#,
                "\n"
            ),
        )
        .expect("write");
        let records = load_metrics(&path).expect("load");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].duration_s, 600.0);
        assert_eq!(records[1].duration_s, 0.0);
    }
}
