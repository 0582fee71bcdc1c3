//! Human-editable `.title` side files.

use super::{TitleDecision, TitleSource};
use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// Section headers whose bodies never hold the effective title.
const IGNORED_SECTIONS: [&str; 2] = ["## Transcript Preview", "## Instructions"];

/// Render the side file for a decision.
pub fn render(decision: &TitleDecision, max_chars: usize) -> String {
    let instructions = match &decision.source {
        TitleSource::Human => "- This title was written by hand and is used as-is".to_string(),
        TitleSource::Generated { model } => {
            format!("- The title above was generated by {}", model)
        }
        TitleSource::Heuristic => {
            "- The title above was taken from the first sentence of the transcript".to_string()
        }
    };

    format!(
        "# Title for {filename}

## Current Title ({source}):
{title}

## Transcript Preview:
{excerpt}...

## Instructions:
{instructions}
- Edit it to make it more engaging or descriptive
- Keep it under {max_chars} characters
- To use the title below instead, delete the title above

## Your Title:
{title}
",
        filename = decision.filename,
        source = decision.source,
        title = decision.title,
        excerpt = decision.transcript_excerpt,
        instructions = instructions,
        max_chars = max_chars,
    )
}

/// Extract the effective title from side file content.
///
/// The first non-blank line outside the preview and instructions sections
/// that does not start with `#` or `[` wins.
pub fn parse(content: &str) -> Option<String> {
    let mut skipping = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('#') {
            skipping = IGNORED_SECTIONS.iter().any(|h| trimmed.starts_with(h));
            continue;
        }
        if skipping || trimmed.is_empty() || trimmed.starts_with('[') {
            continue;
        }
        return Some(trimmed.to_string());
    }

    None
}

/// Read the effective title from a side file, if it exists and has one.
pub fn read(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let title = parse(&content);
    debug!(path = %path.display(), found = title.is_some(), "Read title file");
    Ok(title)
}

/// Write the side file for a decision.
pub fn write(path: &Path, decision: &TitleDecision, max_chars: usize) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render(decision, max_chars))?;
    Ok(())
}
