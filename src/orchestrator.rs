//! Pipeline orchestrator for clipscribe.
//!
//! Runs pages through download, transcription, titling and patching, one
//! file at a time.

use crate::audio::{Fetcher, HttpFetcher};
use crate::audio_source::{AudioLocator, AudioReference};
use crate::cache::{ArtifactCache, FetchStatus, StorageLayout};
use crate::config::Settings;
use crate::error::{ClipscribeError, Result};
use crate::html::{patch_document, PatchMapping, PatchOutcome};
use crate::manifest::{write_backup_manifest, BackupStats, RunManifest};
use crate::titles::{TitleDecision, TitleResolver, TitleSource};
use crate::transcription::{Transcriber, WhisperTranscriber};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Counters for a transcription run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub downloaded: usize,
    pub cached: usize,
    pub failed: usize,
    pub total_bytes: u64,
    pub transcribed: usize,
    pub transcripts_cached: usize,
    pub transcribe_failed: usize,
    /// Files skipped in titles-only mode for lack of a transcript.
    pub untranscribed: usize,
    pub human: usize,
    pub generated: usize,
    pub heuristic: usize,
    pub title_failed: usize,
    pub documents_missing: usize,
    pub documents_patched: usize,
    pub titles_applied: usize,
}

impl RunReport {
    fn count_title(&mut self, decision: &TitleDecision) {
        match decision.source {
            TitleSource::Human => self.human += 1,
            TitleSource::Generated { .. } => self.generated += 1,
            TitleSource::Heuristic => self.heuristic += 1,
        }
    }

    fn count_patch(&mut self, outcome: &PatchOutcome) {
        if outcome.changed {
            self.documents_patched += 1;
        }
        self.titles_applied += outcome.applied;
    }
}

/// Result of a backup run.
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub stats: BackupStats,
    pub backup_dir: PathBuf,
    pub manifest_path: PathBuf,
}

/// Per-run state shared by every document of one run.
struct RunState {
    cache: ArtifactCache,
    manifest: RunManifest,
    manifest_path: PathBuf,
    /// Title per file name, resolved at most once per run.
    titles: HashMap<String, Option<String>>,
    report: RunReport,
}

impl RunState {
    fn flush_manifest(&self) {
        if let Err(e) = self.manifest.save(&self.manifest_path) {
            warn!("Failed to save manifest {}: {}", self.manifest_path.display(), e);
        }
    }
}

/// The main orchestrator for the clipscribe pipeline.
pub struct Orchestrator {
    settings: Settings,
    locator: AudioLocator,
    fetcher: Arc<dyn Fetcher>,
    transcriber: Arc<dyn Transcriber>,
    resolver: TitleResolver,
    show_progress: bool,
}

impl Orchestrator {
    /// Create an orchestrator with the configured network components.
    pub fn new(settings: Settings) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::from_settings(&settings.download)?);
        let transcriber: Arc<dyn Transcriber> =
            Arc::new(WhisperTranscriber::from_settings(&settings.transcription)?);
        let resolver = TitleResolver::from_settings(&settings)?;

        info!(
            "Using {} for transcription and {} title provider(s)",
            settings.transcription.model,
            settings.titles.providers.len()
        );

        Self::with_components(settings, fetcher, transcriber, resolver)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        fetcher: Arc<dyn Fetcher>,
        transcriber: Arc<dyn Transcriber>,
        resolver: TitleResolver,
    ) -> Result<Self> {
        let locator = AudioLocator::from_settings(&settings.source)?;
        Ok(Self {
            settings,
            locator,
            fetcher,
            transcriber,
            resolver,
            show_progress: false,
        })
    }

    /// Print per-file progress and download bars.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn open_state(&self) -> Result<RunState> {
        let output_dir = self.settings.output_dir();
        std::fs::create_dir_all(&output_dir)?;

        let manifest_path = self.settings.manifest_path();
        let manifest = RunManifest::load(&manifest_path)?;

        let cache = ArtifactCache::new(output_dir, self.fetcher.clone())
            .with_key_mode(self.settings.transcription.cache_key)
            .with_extension(&self.settings.source.extension)
            .with_progress(self.show_progress);

        Ok(RunState {
            cache,
            manifest,
            manifest_path,
            titles: HashMap::new(),
            report: RunReport::default(),
        })
    }

    fn read_document(&self, path: &Path, report: &mut RunReport) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(html) => Some(html),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                report.documents_missing += 1;
                None
            }
        }
    }

    /// Full pipeline over `documents`, in order.
    ///
    /// Per-file failures are counted and skipped; only authentication
    /// failures abort the run.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn run_full(&self, documents: &[PathBuf]) -> Result<RunReport> {
        let mut state = self.open_state()?;
        let seeded = state.cache.seed(state.manifest.transcript_records());
        debug!("Seeded {} transcripts from manifest", seeded);

        for document in documents {
            let Some(html) = self.read_document(document, &mut state.report) else {
                continue;
            };

            let references = self.locator.references(&html);
            info!("Found {} audio URLs in {}", references.len(), document.display());
            if self.show_progress {
                eprintln!("\n  {} ({} audio files)", document.display(), references.len());
            }

            let mut mapping = PatchMapping::new();
            for (i, reference) in references.iter().enumerate() {
                if self.show_progress {
                    eprintln!("  [{}/{}] {}", i + 1, references.len(), reference.filename);
                }
                if let Some(title) = self.process_reference(reference, &mut state).await? {
                    mapping.insert(reference.url.clone(), title);
                }
            }

            self.patch(document, &mapping, &mut state.report);
        }

        Ok(state.report)
    }

    async fn process_reference(
        &self,
        reference: &AudioReference,
        state: &mut RunState,
    ) -> Result<Option<String>> {
        if let Some(title) = state.titles.get(&reference.filename) {
            debug!("Already handled {} in this run", reference.filename);
            return Ok(title.clone());
        }

        let title = self.resolve_reference(reference, state).await?;
        state.titles.insert(reference.filename.clone(), title.clone());
        Ok(title)
    }

    async fn resolve_reference(
        &self,
        reference: &AudioReference,
        state: &mut RunState,
    ) -> Result<Option<String>> {
        let filename = &reference.filename;

        let fetch = match state.cache.ensure_audio(reference).await {
            Ok(fetch) => fetch,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Download failed for {}: {}", filename, e);
                state.report.failed += 1;
                return Ok(None);
            }
        };
        match fetch.status {
            FetchStatus::Downloaded => state.report.downloaded += 1,
            FetchStatus::Cached => state.report.cached += 1,
        }
        state.report.total_bytes += fetch.bytes;

        let outcome = match state
            .cache
            .ensure_transcript(&fetch.path, self.transcriber.as_ref())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Transcription failed for {}: {}", filename, e);
                state.report.transcribe_failed += 1;
                return Ok(None);
            }
        };

        if outcome.fresh {
            state.report.transcribed += 1;
            let pause = self.settings.transcription.rate_limit_ms;
            if pause > 0 {
                tokio::time::sleep(Duration::from_millis(pause)).await;
            }
        } else {
            state.report.transcripts_cached += 1;
        }

        state.manifest.record_transcript(&outcome.record);
        let title = self
            .resolve_title(filename, &outcome.record.transcript, state)
            .await;
        state.flush_manifest();

        Ok(title)
    }

    async fn resolve_title(
        &self,
        filename: &str,
        transcript: &str,
        state: &mut RunState,
    ) -> Option<String> {
        match self.resolver.resolve(filename, transcript).await {
            Ok(decision) => {
                state.report.count_title(&decision);
                state.manifest.record_title(&decision);
                Some(decision.title)
            }
            Err(e) => {
                warn!("No title for {}: {}", filename, e);
                state.report.title_failed += 1;
                None
            }
        }
    }

    fn patch(&self, document: &Path, mapping: &PatchMapping, report: &mut RunReport) {
        match patch_document(document, mapping) {
            Ok(outcome) => report.count_patch(&outcome),
            Err(e) => warn!("Failed to patch {}: {}", document.display(), e),
        }
    }

    /// Re-title one page from existing transcripts; nothing is downloaded or transcribed.
    #[instrument(skip(self), fields(document = %document.display()))]
    pub async fn run_titles_only(&self, document: &Path) -> Result<RunReport> {
        let mut state = self.open_state()?;
        state.cache.load_existing()?;

        let Some(html) = self.read_document(document, &mut state.report) else {
            return Ok(state.report);
        };

        let mut mapping = PatchMapping::new();
        for reference in self.locator.references(&html) {
            if state.titles.contains_key(&reference.filename) {
                continue;
            }

            let Some(record) = state.cache.record(&reference.filename).cloned() else {
                warn!("No transcript for {}", reference.filename);
                state.report.untranscribed += 1;
                state.titles.insert(reference.filename.clone(), None);
                continue;
            };

            state.report.transcripts_cached += 1;
            state.manifest.record_transcript(&record);
            let title = self
                .resolve_title(&reference.filename, &record.transcript, &mut state)
                .await;
            state.flush_manifest();

            if let Some(title) = &title {
                mapping.insert(reference.url.clone(), title.clone());
            }
            state.titles.insert(reference.filename.clone(), title);
        }

        self.patch(document, &mapping, &mut state.report);
        Ok(state.report)
    }

    /// Download every audio file referenced by `documents` into per-category folders.
    #[instrument(skip(self, documents), fields(backup_dir = %backup_dir.display()))]
    pub async fn run_backup(&self, documents: &[PathBuf], backup_dir: &Path) -> Result<BackupReport> {
        let mut urls = BTreeSet::new();
        for document in documents {
            match std::fs::read_to_string(document) {
                Ok(html) => {
                    let found = self.locator.extract(&html);
                    info!("Found {} audio URLs in {}", found.len(), document.display());
                    urls.extend(found);
                }
                Err(e) => warn!("Skipping {}: {}", document.display(), e),
            }
        }

        let cache = ArtifactCache::new(backup_dir, self.fetcher.clone())
            .with_layout(StorageLayout::ByCategory)
            .with_progress(self.show_progress);
        let delay = Duration::from_millis(self.settings.download.backup_delay_ms);

        let mut stats = BackupStats {
            total_files: urls.len(),
            ..Default::default()
        };

        for (i, url) in urls.iter().enumerate() {
            let reference = match AudioReference::from_url(url) {
                Ok(reference) => reference,
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    stats.failed += 1;
                    continue;
                }
            };
            if self.show_progress {
                eprintln!("  [{}/{}] {}", i + 1, urls.len(), reference.filename);
            }

            match cache.ensure_audio(&reference).await {
                Ok(fetch) => {
                    stats.total_bytes += fetch.bytes;
                    match fetch.status {
                        FetchStatus::Downloaded => {
                            stats.downloaded += 1;
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                        }
                        FetchStatus::Cached => stats.skipped += 1,
                    }
                }
                Err(e) => {
                    warn!("Download failed for {}: {}", reference.filename, e);
                    stats.failed += 1;
                }
            }
        }

        let manifest_path = write_backup_manifest(
            backup_dir,
            &self.settings.download.categories,
            &self.settings.source.extension,
            &stats,
        )?;

        Ok(BackupReport {
            stats,
            backup_dir: backup_dir.to_path_buf(),
            manifest_path,
        })
    }

    /// Apply titles already recorded in the manifest to a page.
    #[instrument(skip(self), fields(document = %document.display()))]
    pub fn apply_from_manifest(&self, document: &Path) -> Result<PatchOutcome> {
        let manifest = RunManifest::load(&self.settings.manifest_path())?;
        if manifest.is_empty() {
            return Err(ClipscribeError::InvalidInput(format!(
                "No titles recorded in {}",
                self.settings.manifest_path().display()
            )));
        }

        let html = std::fs::read_to_string(document)
            .map_err(|e| ClipscribeError::Html(format!("Cannot read {}: {}", document.display(), e)))?;
        let urls = self.locator.extract(&html);
        let mapping = manifest.title_mapping(urls.iter().map(String::as_str));
        info!("Matched {} of {} URLs to recorded titles", mapping.len(), urls.len());

        patch_document(document, &mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::StaticFetcher;
    use crate::config::Prompts;
    use crate::titles::testing::ScriptedProvider;
    use crate::titles::TitleProvider;
    use crate::transcription::testing::ScriptedTranscriber;

    const PREFIX: &str = "https://s3-us-west-1.amazonaws.com/randombmir/";

    fn url(path: &str) -> String {
        format!("{}{}", PREFIX, path)
    }

    fn settings(root: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.output_dir = root.join("audio_files").display().to_string();
        settings.general.manifest_path = root.join("transcriptions.json").display().to_string();
        settings.transcription.rate_limit_ms = 0;
        settings.download.backup_delay_ms = 0;
        settings.titles.providers.clear();
        settings
    }

    fn page(root: &Path, name: &str, body: &str) -> PathBuf {
        let path = root.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn secret_page() -> String {
        format!(
            r#"<ul><li data-audio="{}">old</li></ul>
<span style="white-space: nowrap;">02<audio controls preload="none"><source src="{}" type="audio/mpeg"></audio></span>"#,
            url("random/01+secret.mp3"),
            url("long+talks/02+talk.mp3")
        )
    }

    fn fetcher() -> Arc<StaticFetcher> {
        Arc::new(
            StaticFetcher::new()
                .with(&url("random/01+secret.mp3"), b"secret-audio")
                .with(&url("long+talks/02+talk.mp3"), b"talk-audio"),
        )
    }

    fn transcriber() -> Arc<ScriptedTranscriber> {
        Arc::new(
            ScriptedTranscriber::new()
                .with("01+secret.mp3", "Nobody knows this. Really.")
                .with("02+talk.mp3", "Welcome to the talk. Sit down."),
        )
    }

    fn orchestrator(
        settings: &Settings,
        fetcher: Arc<StaticFetcher>,
        transcriber: Arc<ScriptedTranscriber>,
        providers: Vec<Arc<dyn TitleProvider>>,
    ) -> Orchestrator {
        let resolver = TitleResolver::new(
            settings.output_dir(),
            providers,
            Prompts::default(),
            &settings.titles,
        );
        Orchestrator::with_components(settings.clone(), fetcher, transcriber, resolver).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let index = page(dir.path(), "index.html", &secret_page());
        let fetcher = fetcher();
        let transcriber = transcriber();
        let provider: Arc<dyn TitleProvider> =
            Arc::new(ScriptedProvider::replying("gpt-4o-mini", "A Secret Confession"));

        let first = orchestrator(&settings, fetcher.clone(), transcriber.clone(), vec![provider.clone()])
            .run_full(&[index.clone()])
            .await
            .unwrap();

        assert_eq!(first.downloaded, 2);
        assert_eq!(first.transcribed, 2);
        assert_eq!(first.generated, 2);
        assert_eq!(first.documents_patched, 1);
        assert_eq!(first.titles_applied, 2);
        assert_eq!(first.total_bytes, 22);

        let patched = std::fs::read_to_string(&index).unwrap();
        assert!(patched.contains(r#"01+secret.mp3">A Secret Confession</li>"#));
        assert!(patched.contains(">02. A Secret Confession<audio"));
        assert!(dir.path().join("index.html.backup").exists());

        let manifest = RunManifest::load(&settings.manifest_path()).unwrap();
        assert_eq!(manifest.len(), 2);

        let audio = settings.output_dir().join("01+secret.mp3");
        let transcript = settings.output_dir().join("01+secret.txt");
        let audio_before = std::fs::read(&audio).unwrap();
        let transcript_before = std::fs::read(&transcript).unwrap();

        let second = orchestrator(&settings, fetcher.clone(), transcriber.clone(), vec![provider])
            .run_full(&[index.clone()])
            .await
            .unwrap();

        assert_eq!(fetcher.call_count(), 2);
        assert_eq!(transcriber.call_count(), 2);
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.cached, 2);
        assert_eq!(second.transcripts_cached, 2);
        assert_eq!(second.human, 2);
        assert_eq!(second.documents_patched, 0);
        assert_eq!(std::fs::read_to_string(&index).unwrap(), patched);
        assert_eq!(std::fs::read(&audio).unwrap(), audio_before);
        assert_eq!(std::fs::read(&transcript).unwrap(), transcript_before);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let body = format!(
            r#"<li data-audio="{}">a</li><li data-audio="{}">b</li><li data-audio="{}">c</li>"#,
            url("random/01+secret.mp3"),
            url("random/03+gone.mp3"),
            url("random/04+mute.mp3"),
        );
        let index = page(dir.path(), "index.html", &body);
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with(&url("random/01+secret.mp3"), b"secret-audio")
                .with(&url("random/04+mute.mp3"), b"mute-audio"),
        );

        let report = orchestrator(&settings, fetcher, transcriber(), Vec::new())
            .run_full(&[index.clone()])
            .await
            .unwrap();

        assert_eq!(report.downloaded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.transcribed, 1);
        assert_eq!(report.transcribe_failed, 1);
        assert_eq!(report.heuristic, 1);
        assert_eq!(report.titles_applied, 1);
        assert!(!settings.output_dir().join("03+gone.mp3").exists());

        let patched = std::fs::read_to_string(&index).unwrap();
        assert!(patched.contains(">Nobody knows this</li>"));
        assert!(patched.contains(">b</li>"));
        assert!(patched.contains(">c</li>"));
    }

    #[tokio::test]
    async fn test_titles_resolved_once_across_documents() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let index = page(dir.path(), "index.html", &secret_page());
        let inc = page(dir.path(), "inc.html", &secret_page());
        let missing = dir.path().join("inx3.html");
        let provider = Arc::new(ScriptedProvider::replying("m", "Shared"));
        let transcriber = transcriber();

        let report = orchestrator(&settings, fetcher(), transcriber.clone(), vec![provider.clone()])
            .run_full(&[index.clone(), missing, inc.clone()])
            .await
            .unwrap();

        assert_eq!(transcriber.call_count(), 2);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(report.documents_missing, 1);
        assert_eq!(report.documents_patched, 2);
        assert_eq!(report.titles_applied, 4);
        assert!(std::fs::read_to_string(&inc).unwrap().contains(">Shared</li>"));
    }

    #[tokio::test]
    async fn test_titles_only_uses_existing_transcripts() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let index = page(dir.path(), "index.html", &secret_page());
        let out = settings.output_dir();
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("01+secret.mp3"), b"a").unwrap();
        std::fs::write(out.join("01+secret.txt"), "Only this one. Yes.").unwrap();

        let fetcher = fetcher();
        let transcriber = transcriber();
        let report = orchestrator(&settings, fetcher.clone(), transcriber.clone(), Vec::new())
            .run_titles_only(&index)
            .await
            .unwrap();

        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(transcriber.call_count(), 0);
        assert_eq!(report.heuristic, 1);
        assert_eq!(report.untranscribed, 1);
        assert_eq!(report.titles_applied, 1);
        assert!(std::fs::read_to_string(&index).unwrap().contains(">Only this one</li>"));
        assert!(out.join("01+secret.title").exists());
    }

    #[tokio::test]
    async fn test_backup_run() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let index = page(dir.path(), "index.html", &secret_page());
        let inc = page(dir.path(), "inc.html", &secret_page());
        let backup_dir = dir.path().join("audio_backup");
        std::fs::create_dir_all(backup_dir.join("long+talks")).unwrap();
        std::fs::write(backup_dir.join("long+talks").join("02+talk.mp3"), b"old").unwrap();
        let fetcher = fetcher();

        let report = orchestrator(&settings, fetcher.clone(), transcriber(), Vec::new())
            .run_backup(&[index, inc], &backup_dir)
            .await
            .unwrap();

        assert_eq!(report.stats.total_files, 2);
        assert_eq!(report.stats.downloaded, 1);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.failed, 0);
        assert_eq!(report.stats.total_bytes, 15);
        assert_eq!(fetcher.call_count(), 1);
        assert!(backup_dir.join("random").join("01+secret.mp3").exists());

        let listing = std::fs::read_to_string(&report.manifest_path).unwrap();
        assert!(listing.contains("RANDOM:"));
        assert!(listing.contains("02+talk.mp3 (3.0B)"));
    }

    #[tokio::test]
    async fn test_apply_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let index = page(dir.path(), "index.html", &secret_page());
        let provider: Arc<dyn TitleProvider> = Arc::new(ScriptedProvider::replying("m", "Recorded"));

        let orch = orchestrator(&settings, fetcher(), transcriber(), vec![provider]);
        orch.run_full(&[index.clone()]).await.unwrap();

        let fresh = page(dir.path(), "inc2.html", &secret_page());
        let outcome = orch.apply_from_manifest(&fresh).unwrap();

        assert_eq!(outcome.applied, 2);
        assert!(outcome.changed);
        assert!(std::fs::read_to_string(&fresh).unwrap().contains(">Recorded</li>"));
    }

    #[tokio::test]
    async fn test_apply_without_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let index = page(dir.path(), "index.html", &secret_page());

        let result = orchestrator(&settings, fetcher(), transcriber(), Vec::new())
            .apply_from_manifest(&index);
        assert!(matches!(result, Err(ClipscribeError::InvalidInput(_))));
    }
}
