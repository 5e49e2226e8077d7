//! Presentation of a [`ProgramOutcome`].
//!
//! Every renderer handles the three outcome shapes: unresolved parent,
//! resolved with no sub-issues, and a populated program.

pub mod chat;
pub mod markdown;
pub mod text;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::core::status::LabelRules;
use crate::core::types::ProgramOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Terminal report.
    #[default]
    Text,
    /// Pretty-printed JSON of the whole outcome.
    Json,
    /// Chat markup with emoji status rows.
    Chat,
    /// Issue-comment markdown with a sentinel line for in-place updates.
    Markdown,
}

pub fn render(outcome: &ProgramOutcome, format: Format, labels: &LabelRules) -> Result<String> {
    Ok(match format {
        Format::Text => text::render(outcome, labels),
        Format::Json => render_json(outcome)?,
        Format::Chat => chat::render(outcome, labels),
        Format::Markdown => markdown::render(outcome, labels),
    })
}

pub fn render_json(outcome: &ProgramOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("serialize program outcome")
}

/// `width`-wide bar with `percent` of it filled.
pub(crate) fn progress_bar(percent: u8, width: usize, filled: char, empty: char) -> String {
    let done = ((width as f64) * f64::from(percent.min(100)) / 100.0).round() as usize;
    let mut bar = String::with_capacity(width * filled.len_utf8());
    bar.extend(std::iter::repeat_n(filled, done));
    bar.extend(std::iter::repeat_n(empty, width - done));
    bar
}
