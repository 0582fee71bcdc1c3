//! Run manifest persistence.
//!
//! The manifest maps each clip file name to its transcript and title. It is
//! rewritten atomically after every resolved file.

mod backup;

pub use backup::{write_backup_manifest, BackupStats, BACKUP_MANIFEST_FILE};

use crate::audio_source::filename_for_url;
use crate::cache::TranscriptRecord;
use crate::error::Result;
use crate::html::PatchMapping;
use crate::titles::{TitleDecision, TitleSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Everything recorded about one clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub transcript: String,
    pub audio_path: String,
    pub transcript_path: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_source: Option<TitleSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// File name to entry, ordered by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunManifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl RunManifest {
    /// Load a manifest; a missing file yields an empty one.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No manifest yet");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        debug!("Loaded {} entries", manifest.len());
        Ok(manifest)
    }

    /// Write the manifest through a temp file in the same directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Insert or refresh the transcript part of an entry, keeping its title.
    pub fn record_transcript(&mut self, record: &TranscriptRecord) {
        let entry = self
            .entries
            .entry(record.filename.clone())
            .or_insert_with(|| ManifestEntry {
                transcript: String::new(),
                audio_path: String::new(),
                transcript_path: String::new(),
                title: None,
                title_source: None,
                content_hash: None,
            });
        entry.transcript = record.transcript.clone();
        entry.audio_path = record.audio_path.clone();
        entry.transcript_path = record.transcript_path.clone();
        entry.content_hash = record.content_hash.clone();
    }

    /// Attach a title to an existing entry.
    pub fn record_title(&mut self, decision: &TitleDecision) -> bool {
        match self.entries.get_mut(&decision.filename) {
            Some(entry) => {
                entry.title = Some(decision.title.clone());
                entry.title_source = Some(decision.source.clone());
                true
            }
            None => {
                warn!("No manifest entry for {}", decision.filename);
                false
            }
        }
    }

    pub fn get(&self, filename: &str) -> Option<&ManifestEntry> {
        self.entries.get(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Transcript records for seeding the artifact cache.
    pub fn transcript_records(&self) -> Vec<TranscriptRecord> {
        self.entries
            .iter()
            .map(|(filename, entry)| TranscriptRecord {
                filename: filename.clone(),
                transcript: entry.transcript.clone(),
                audio_path: entry.audio_path.clone(),
                transcript_path: entry.transcript_path.clone(),
                content_hash: entry.content_hash.clone(),
            })
            .collect()
    }

    /// Map each URL to the recorded title of its file name.
    pub fn title_mapping<'a, I>(&self, urls: I) -> PatchMapping
    where
        I: IntoIterator<Item = &'a str>,
    {
        urls.into_iter()
            .filter_map(|url| {
                let filename = filename_for_url(url)?;
                let title = self.entries.get(&filename)?.title.clone()?;
                Some((url.to_string(), title))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str, transcript: &str) -> TranscriptRecord {
        TranscriptRecord {
            filename: filename.to_string(),
            transcript: transcript.to_string(),
            audio_path: format!("audio_files/{}", filename),
            transcript_path: format!("audio_files/{}.txt", filename),
            content_hash: None,
        }
    }

    fn decision(filename: &str, title: &str) -> TitleDecision {
        TitleDecision {
            filename: filename.to_string(),
            title: title.to_string(),
            source: TitleSource::Heuristic,
            transcript_excerpt: String::new(),
        }
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = RunManifest::load(&dir.path().join("transcriptions.json")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("transcriptions.json");

        let mut manifest = RunManifest::default();
        manifest.record_transcript(&record("01+a.mp3", "Alpha."));
        assert!(manifest.record_title(&decision("01+a.mp3", "Alpha")));
        manifest.save(&path).unwrap();

        let loaded = RunManifest::load(&path).unwrap();
        assert_eq!(loaded, manifest);
        let entry = loaded.get("01+a.mp3").unwrap();
        assert_eq!(entry.title.as_deref(), Some("Alpha"));
        assert_eq!(entry.title_source, Some(TitleSource::Heuristic));
    }

    #[test]
    fn test_json_shape() {
        let mut manifest = RunManifest::default();
        manifest.record_transcript(&record("01+a.mp3", "Alpha."));
        let json: serde_json::Value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(json["01+a.mp3"]["transcript"], "Alpha.");
        assert!(json["01+a.mp3"]["title"].is_null());
        assert!(json["01+a.mp3"].get("content_hash").is_none());
    }

    #[test]
    fn test_loads_entries_without_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcriptions.json");
        std::fs::write(
            &path,
            r#"{"01+a.mp3": {"transcript": "t", "audio_path": "a", "transcript_path": "b", "title": "T"}}"#,
        )
        .unwrap();

        let manifest = RunManifest::load(&path).unwrap();
        let entry = manifest.get("01+a.mp3").unwrap();
        assert_eq!(entry.title.as_deref(), Some("T"));
        assert_eq!(entry.title_source, None);
    }

    #[test]
    fn test_transcript_update_keeps_title() {
        let mut manifest = RunManifest::default();
        manifest.record_transcript(&record("01+a.mp3", "old"));
        manifest.record_title(&decision("01+a.mp3", "Kept"));
        manifest.record_transcript(&record("01+a.mp3", "new"));

        let entry = manifest.get("01+a.mp3").unwrap();
        assert_eq!(entry.transcript, "new");
        assert_eq!(entry.title.as_deref(), Some("Kept"));
    }

    #[test]
    fn test_title_without_entry_is_rejected() {
        let mut manifest = RunManifest::default();
        assert!(!manifest.record_title(&decision("ghost.mp3", "Boo")));
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_title_mapping() {
        let mut manifest = RunManifest::default();
        manifest.record_transcript(&record("01+a.mp3", "t"));
        manifest.record_title(&decision("01+a.mp3", "Alpha"));
        manifest.record_transcript(&record("02+b.mp3", "t"));

        let mapping = manifest.title_mapping([
            "https://h/randombmir/random/01+a.mp3",
            "https://h/randombmir/random/02+b.mp3",
            "https://h/randombmir/random/03+c.mp3",
        ]);

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["https://h/randombmir/random/01+a.mp3"], "Alpha");
    }
}
