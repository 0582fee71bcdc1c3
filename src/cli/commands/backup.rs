//! Backup command implementation.

use super::run::resolve_documents;
use crate::audio::format_size;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Download every referenced audio file into the backup directory.
pub async fn run_backup(documents: &[String], dir: Option<&str>, settings: Settings) -> Result<()> {
    preflight::check(Operation::Backup, &settings)?;

    let backup_dir = dir
        .map(Settings::expand_path)
        .unwrap_or_else(|| settings.backup_dir());
    let documents = resolve_documents(documents, &settings);
    for missing in preflight::missing_documents(&documents) {
        Output::warning(&format!("{} not found, skipping", missing.display()));
    }

    Output::header("Audio backup");
    let orchestrator = Orchestrator::new(settings)?.with_progress(true);
    let report = orchestrator.run_backup(&documents, &backup_dir).await?;
    let stats = &report.stats;

    Output::header("Download summary");
    Output::kv("Total files found", &stats.total_files.to_string());
    Output::kv("Downloaded", &stats.downloaded.to_string());
    Output::kv("Skipped (already exists)", &stats.skipped.to_string());
    Output::kv("Failed", &stats.failed.to_string());
    Output::kv("Total size", &format_size(stats.total_bytes));
    Output::kv("Backup location", &report.backup_dir.display().to_string());
    Output::kv("Manifest", &report.manifest_path.display().to_string());

    println!();
    if stats.failed > 0 {
        Output::warning(&format!(
            "{} file(s) failed to download. Re-run to retry them.",
            stats.failed
        ));
    } else {
        Output::success("Backup complete.");
    }

    Ok(())
}
