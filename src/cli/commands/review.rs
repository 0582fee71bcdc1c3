//! Review command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::titles::title_file;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// List every `.title` file with its effective title.
pub fn run_review(settings: Settings) -> Result<()> {
    let output_dir = settings.output_dir();
    if !output_dir.exists() {
        Output::warning(&format!("{} does not exist yet", output_dir.display()));
        Output::info("Run 'clipscribe run' first.");
        return Ok(());
    }

    let files = title_files(&output_dir)?;
    if files.is_empty() {
        Output::info("No title files found.");
        return Ok(());
    }

    Output::header(&format!("Title files in {}", output_dir.display()));

    let entries = review_entries(&files);
    let mut needs_editing = 0;
    let mut unreadable = 0;
    for entry in &entries {
        match &entry.title {
            Ok(title) => {
                if title.is_none() {
                    needs_editing += 1;
                }
                Output::title_entry(&entry.name, title.as_deref());
            }
            Err(e) => {
                unreadable += 1;
                Output::warning(&format!("{} is unreadable: {}", entry.name, e));
            }
        }
    }

    println!();
    if unreadable > 0 {
        Output::warning(&format!("{} of {} file(s) could not be read", unreadable, files.len()));
    }
    if needs_editing > 0 {
        Output::warning(&format!("{} of {} file(s) need editing", needs_editing, files.len()));
    } else if unreadable == 0 {
        Output::success(&format!("All {} title files have a title", files.len()));
    }

    Ok(())
}

struct ReviewEntry {
    name: String,
    title: crate::Result<Option<String>>,
}

/// Effective title of each file; a read failure only affects its own entry.
fn review_entries(files: &[PathBuf]) -> Vec<ReviewEntry> {
    files
        .iter()
        .map(|path| ReviewEntry {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            title: title_file::read(path),
        })
        .collect()
}

fn title_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "title"))
        .collect();
    files.sort();
    Ok(files)
}
