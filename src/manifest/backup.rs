//! Plain-text report written after a backup run.

use crate::audio::format_size;
use crate::error::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

pub const BACKUP_MANIFEST_FILE: &str = "backup_manifest.txt";

/// Counters for a backup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupStats {
    pub total_files: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Bytes on disk for downloaded and skipped files.
    pub total_bytes: u64,
}

/// Write `backup_manifest.txt` listing every stored file per category.
pub fn write_backup_manifest(
    backup_dir: &Path,
    categories: &[String],
    extension: &str,
    stats: &BackupStats,
) -> Result<PathBuf> {
    let content = render(backup_dir, categories, extension, stats, Local::now())?;
    std::fs::create_dir_all(backup_dir)?;
    let path = backup_dir.join(BACKUP_MANIFEST_FILE);
    std::fs::write(&path, content)?;
    info!("Backup manifest written to {}", path.display());
    Ok(path)
}

fn render(
    backup_dir: &Path,
    categories: &[String],
    extension: &str,
    stats: &BackupStats,
    created: DateTime<Local>,
) -> Result<String> {
    let mut out = String::new();
    out.push_str("Audio Backup Manifest\n");
    out.push_str(&format!("{}\n", "=".repeat(50)));
    out.push_str(&format!("Created: {}\n", created.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Total files: {}\n", stats.total_files));
    out.push_str(&format!("Total size: {}\n", format_size(stats.total_bytes)));
    out.push('\n');

    for category in categories {
        let files = list_files(&backup_dir.join(category), extension)?;
        if files.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{}:\n", category.to_uppercase()));
        out.push_str(&format!("{}\n", "-".repeat(30)));
        for (name, size) in files {
            out.push_str(&format!("{} ({})\n", name, format_size(size)));
        }
    }

    Ok(out)
}

/// Files with `extension` in `dir`, sorted by name.
fn list_files(dir: &Path, extension: &str) -> Result<Vec<(String, u64)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        files.push((name.to_string(), entry.metadata()?.len()));
    }
    files.sort();
    Ok(files)
}
