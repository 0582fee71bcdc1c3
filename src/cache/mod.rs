//! Artifact cache for audio files and transcripts.
//!
//! Every artifact is keyed by the clip's file name. Audio is trusted by
//! presence; transcripts are reused by file name, or by the audio's SHA-256
//! when [`CacheKeyMode::ContentHash`] is selected.

use crate::audio::{download_to, Fetcher};
use crate::audio_source::AudioReference;
use crate::config::CacheKeyMode;
use crate::error::{ClipscribeError, Result};
use crate::transcription::Transcriber;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Extension of transcript files.
pub const TRANSCRIPT_EXTENSION: &str = "txt";

/// Suffix appended to a transcript path for its recorded audio hash.
const HASH_SUFFIX: &str = "sha256";

/// Where audio files are stored below the cache root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageLayout {
    /// `<root>/<filename>`
    #[default]
    Flat,
    /// `<root>/<category>/<filename>`
    ByCategory,
}

/// Whether `ensure_audio` touched the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Downloaded,
    Cached,
}

/// Result of `ensure_audio`.
#[derive(Debug, Clone)]
pub struct AudioFetch {
    pub path: PathBuf,
    pub bytes: u64,
    pub status: FetchStatus,
}

/// A transcript produced once per file name and reused afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub filename: String,
    pub transcript: String,
    pub audio_path: String,
    pub transcript_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Result of `ensure_transcript`.
#[derive(Debug, Clone)]
pub struct TranscriptOutcome {
    pub record: TranscriptRecord,
    /// True when the transcriber was invoked.
    pub fresh: bool,
}

/// Fetch-or-reuse cache over the output directory.
pub struct ArtifactCache {
    root: PathBuf,
    layout: StorageLayout,
    key_mode: CacheKeyMode,
    extension: String,
    fetcher: Arc<dyn Fetcher>,
    records: BTreeMap<String, TranscriptRecord>,
    show_progress: bool,
}

impl ArtifactCache {
    /// Create a flat, filename-keyed cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            root: root.into(),
            layout: StorageLayout::Flat,
            key_mode: CacheKeyMode::Filename,
            extension: "mp3".to_string(),
            fetcher,
            records: BTreeMap::new(),
            show_progress: false,
        }
    }

    pub fn with_layout(mut self, layout: StorageLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_key_mode(mut self, key_mode: CacheKeyMode) -> Self {
        self.key_mode = key_mode;
        self
    }

    /// Audio extension used when scanning for existing transcripts.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    /// Show a progress bar for large downloads.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Expected local path of a clip's audio.
    pub fn audio_path(&self, reference: &AudioReference) -> PathBuf {
        match self.layout {
            StorageLayout::Flat => self.root.join(&reference.filename),
            StorageLayout::ByCategory => self.root.join(&reference.category).join(&reference.filename),
        }
    }

    /// Transcript path next to an audio file (`<stem>.txt`).
    pub fn transcript_path_for(audio_path: &Path) -> PathBuf {
        audio_path.with_extension(TRANSCRIPT_EXTENSION)
    }

    /// Return the local audio file, downloading it only if absent.
    #[instrument(skip(self, reference), fields(filename = %reference.filename))]
    pub async fn ensure_audio(&self, reference: &AudioReference) -> Result<AudioFetch> {
        let path = self.audio_path(reference);

        if path.exists() {
            let bytes = tokio::fs::metadata(&path).await?.len();
            debug!("Using cached audio file");
            return Ok(AudioFetch {
                path,
                bytes,
                status: FetchStatus::Cached,
            });
        }

        let bytes = download_to(self.fetcher.as_ref(), &reference.url, &path, self.show_progress).await?;

        Ok(AudioFetch {
            path,
            bytes,
            status: FetchStatus::Downloaded,
        })
    }

    /// Return the transcript for an audio file, transcribing only on a cache miss.
    #[instrument(skip(self, transcriber), fields(audio_path = %audio_path.display()))]
    pub async fn ensure_transcript(
        &mut self,
        audio_path: &Path,
        transcriber: &dyn Transcriber,
    ) -> Result<TranscriptOutcome> {
        let filename = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ClipscribeError::InvalidInput(format!("Bad audio path: {}", audio_path.display()))
            })?
            .to_string();
        let transcript_path = Self::transcript_path_for(audio_path);

        let content_hash = match self.key_mode {
            CacheKeyMode::Filename => None,
            CacheKeyMode::ContentHash => Some(hash_file(audio_path).await?),
        };

        if let Some(record) = self.cached_record(&filename, &transcript_path, content_hash.as_deref()).await? {
            debug!("Using cached transcript");
            return Ok(TranscriptOutcome {
                record,
                fresh: false,
            });
        }

        info!("Transcribing {}", filename);
        let transcript = transcriber.transcribe(audio_path).await?;

        tokio::fs::write(&transcript_path, &transcript).await?;
        if let Some(hash) = &content_hash {
            tokio::fs::write(hash_path(&transcript_path), hash).await?;
        }

        let record = TranscriptRecord {
            filename: filename.clone(),
            transcript,
            audio_path: audio_path.display().to_string(),
            transcript_path: transcript_path.display().to_string(),
            content_hash,
        };
        self.records.insert(filename, record.clone());

        Ok(TranscriptOutcome {
            record,
            fresh: true,
        })
    }

    async fn cached_record(
        &mut self,
        filename: &str,
        transcript_path: &Path,
        content_hash: Option<&str>,
    ) -> Result<Option<TranscriptRecord>> {
        if let Some(record) = self.records.get(filename) {
            if content_hash.is_none() || record.content_hash.as_deref() == content_hash {
                return Ok(Some(record.clone()));
            }
        }

        if !transcript_path.exists() {
            return Ok(None);
        }

        if let Some(hash) = content_hash {
            let recorded = tokio::fs::read_to_string(hash_path(transcript_path))
                .await
                .unwrap_or_default();
            if recorded.trim() != hash {
                info!("Audio content changed for {}, re-transcribing", filename);
                return Ok(None);
            }
        }

        let transcript = tokio::fs::read_to_string(transcript_path).await?;
        let audio_path = transcript_path.with_file_name(filename);
        let record = TranscriptRecord {
            filename: filename.to_string(),
            transcript: transcript.trim().to_string(),
            audio_path: audio_path.display().to_string(),
            transcript_path: transcript_path.display().to_string(),
            content_hash: content_hash.map(|h| h.to_string()),
        };
        self.records.insert(filename.to_string(), record.clone());
        Ok(Some(record))
    }

    /// Register records from a previous run.
    ///
    /// Records whose transcript file no longer exists are ignored, so deleting a
    /// transcript still forces re-transcription.
    pub fn seed<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = TranscriptRecord>,
    {
        let mut seeded = 0;
        for record in records {
            if Path::new(&record.transcript_path).exists() {
                self.records.insert(record.filename.clone(), record);
                seeded += 1;
            } else {
                debug!("Ignoring stale record for {}", record.filename);
            }
        }
        seeded
    }

    /// Register every transcript in the root that has a sibling audio file.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn load_existing(&mut self) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }

        let mut loaded = 0;
        for entry in std::fs::read_dir(&self.root)?.flatten() {
            let transcript_path = entry.path();
            if transcript_path.extension().and_then(|e| e.to_str()) != Some(TRANSCRIPT_EXTENSION) {
                continue;
            }

            let audio_path = transcript_path.with_extension(&self.extension);
            if !audio_path.exists() {
                continue;
            }

            let Some(filename) = audio_path.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                continue;
            };

            let transcript = match std::fs::read_to_string(&transcript_path) {
                Ok(t) => t.trim().to_string(),
                Err(e) => {
                    warn!("Failed to read {}: {}", transcript_path.display(), e);
                    continue;
                }
            };
            let content_hash = std::fs::read_to_string(hash_path(&transcript_path))
                .ok()
                .map(|h| h.trim().to_string());

            self.records.insert(
                filename.clone(),
                TranscriptRecord {
                    filename,
                    transcript,
                    audio_path: audio_path.display().to_string(),
                    transcript_path: transcript_path.display().to_string(),
                    content_hash,
                },
            );
            loaded += 1;
        }

        info!("Loaded {} existing transcripts", loaded);
        Ok(loaded)
    }

    /// Look up a known transcript.
    pub fn record(&self, filename: &str) -> Option<&TranscriptRecord> {
        self.records.get(filename)
    }
}

fn hash_path(transcript_path: &Path) -> PathBuf {
    let mut name = transcript_path.as_os_str().to_owned();
    name.push(".");
    name.push(HASH_SUFFIX);
    PathBuf::from(name)
}

/// SHA-256 of a file as lowercase hex.
pub async fn hash_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
