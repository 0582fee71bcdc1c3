//! In-place patching of page files.

use super::{document, PatchMapping};
use crate::error::{ClipscribeError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Result of patching one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Mapping URLs that matched at least one slot.
    pub applied: usize,
    /// Whether the file content changed.
    pub changed: bool,
    /// Whether this call created the backup.
    pub backup_created: bool,
}

/// Backup path for a page (`<document>.backup`).
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

/// Patch a page file in place.
///
/// The original content is copied to `<document>.backup` before the first
/// write; an existing backup is never overwritten. Unchanged files are not
/// touched.
#[instrument(skip(mapping), fields(path = %path.display(), mapped = mapping.len()))]
pub fn patch_document(path: &Path, mapping: &PatchMapping) -> Result<PatchOutcome> {
    let original = std::fs::read_to_string(path)
        .map_err(|e| ClipscribeError::Html(format!("Cannot read {}: {}", path.display(), e)))?;

    let (patched, applied) = document::patch(&original, mapping);

    if patched == original {
        debug!("No changes");
        return Ok(PatchOutcome {
            applied,
            ..Default::default()
        });
    }

    let backup = backup_path(path);
    let backup_created = !backup.exists();
    if backup_created {
        std::fs::write(&backup, &original)?;
        info!("Created backup {}", backup.display());
    }

    std::fs::write(path, patched)?;
    info!("Applied {} titles to {}", applied, path.display());

    Ok(PatchOutcome {
        applied,
        changed: true,
        backup_created,
    })
}
