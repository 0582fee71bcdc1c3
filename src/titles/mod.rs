//! Title resolution.
//!
//! A title comes from the first source that succeeds:
//!
//! 1. a human-edited `.title` side file,
//! 2. the configured [`TitleProvider`]s in priority order,
//! 3. the first sentence of the transcript.
//!
//! Every resolution rewrites the side file so it can be edited for the next run.

mod ollama;
mod openai;
mod provider;
pub mod text;
pub mod title_file;

pub use ollama::OllamaTitleProvider;
pub use openai::OpenAITitleProvider;
pub use provider::TitleProvider;

#[cfg(test)]
pub(crate) use provider::testing;

use crate::audio_source::file_stem;
use crate::config::{Prompts, Settings, TitleBackend, TitleSettings};
use crate::error::{ClipscribeError, Result};
use crate::openai::create_client_with_timeout;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Characters of transcript kept in the side file preview.
pub const EXCERPT_CHARS: usize = 300;

/// Where a title came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TitleSource {
    Human,
    Generated { model: String },
    Heuristic,
}

impl std::fmt::Display for TitleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TitleSource::Human => write!(f, "edited by hand"),
            TitleSource::Generated { model } => write!(f, "generated by {}", model),
            TitleSource::Heuristic => write!(f, "from first sentence"),
        }
    }
}

/// The title chosen for one file in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleDecision {
    pub filename: String,
    pub title: String,
    pub source: TitleSource,
    pub transcript_excerpt: String,
}

/// Resolves titles through the override, provider, heuristic chain.
pub struct TitleResolver {
    providers: Vec<Arc<dyn TitleProvider>>,
    prompts: Prompts,
    title_dir: PathBuf,
    timeout: Duration,
    max_chars: usize,
    preview_chars: usize,
    refusal_phrases: Vec<String>,
}

impl TitleResolver {
    /// Create a resolver with explicit providers.
    pub fn new(
        title_dir: impl Into<PathBuf>,
        providers: Vec<Arc<dyn TitleProvider>>,
        prompts: Prompts,
        settings: &TitleSettings,
    ) -> Self {
        Self {
            providers,
            prompts,
            title_dir: title_dir.into(),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_chars: settings.max_chars,
            preview_chars: settings.preview_chars,
            refusal_phrases: settings.refusal_phrases.clone(),
        }
    }

    /// Build the configured providers and prompts.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let providers = build_providers(&settings.titles)?;
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        Ok(Self::new(settings.output_dir(), providers, prompts, &settings.titles))
    }

    /// Override the per-provider timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Side file path for a clip.
    pub fn title_path(&self, filename: &str) -> PathBuf {
        self.title_dir.join(format!("{}.title", file_stem(filename)))
    }

    /// Resolve the title for one file and rewrite its side file.
    #[instrument(skip(self, transcript))]
    pub async fn resolve(&self, filename: &str, transcript: &str) -> Result<TitleDecision> {
        let path = self.title_path(filename);
        let transcript_excerpt = text::excerpt(transcript, EXCERPT_CHARS);

        let (title, source) = if let Some(title) = self.read_override(&path) {
            info!("Using human title for {}", filename);
            (title, TitleSource::Human)
        } else if let Some((title, model)) = self.generate(filename, transcript).await {
            (title, TitleSource::Generated { model })
        } else {
            let sentence = text::first_sentence(transcript);
            if sentence.is_empty() {
                return Err(ClipscribeError::TitleGeneration(format!(
                    "No usable title for {}",
                    filename
                )));
            }
            info!("Using first sentence as title for {}", filename);
            (text::truncate(&sentence, self.max_chars), TitleSource::Heuristic)
        };

        let decision = TitleDecision {
            filename: filename.to_string(),
            title,
            source,
            transcript_excerpt,
        };

        if let Err(e) = title_file::write(&path, &decision, self.max_chars) {
            warn!("Failed to write {}: {}", path.display(), e);
        }

        Ok(decision)
    }

    fn read_override(&self, path: &Path) -> Option<String> {
        match title_file::read(path) {
            Ok(title) => title,
            Err(e) => {
                warn!("Ignoring unreadable title file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Try each provider in order; returns the accepted title and its model.
    async fn generate(&self, filename: &str, transcript: &str) -> Option<(String, String)> {
        if self.providers.is_empty() {
            return None;
        }

        let mut vars = HashMap::new();
        vars.insert(
            "transcript".to_string(),
            text::excerpt(transcript, self.preview_chars),
        );
        vars.insert("filename".to_string(), filename.to_string());
        vars.insert("max_chars".to_string(), self.max_chars.to_string());

        let prompt = self.prompts.render_with_custom(&self.prompts.titles.user, &vars);
        let system = self
            .prompts
            .render_with_custom(&self.prompts.titles.system, &vars);

        for provider in &self.providers {
            let model = provider.model();
            debug!("Requesting title from {}", model);

            let raw = match tokio::time::timeout(self.timeout, provider.generate(&system, &prompt)).await {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    warn!("{} failed for {}: {}", model, filename, e);
                    continue;
                }
                Err(_) => {
                    warn!("{} timed out after {:?} for {}", model, self.timeout, filename);
                    continue;
                }
            };

            if text::is_refusal(&raw, &self.refusal_phrases) {
                warn!("{} refused to title {}", model, filename);
                continue;
            }

            let cleaned = text::clean_response(&raw);
            if cleaned.is_empty() {
                warn!("{} returned an empty title for {}", model, filename);
                continue;
            }

            info!("Generated title for {} with {}", filename, model);
            return Some((text::truncate(&cleaned, self.max_chars), model.to_string()));
        }

        None
    }
}

fn build_providers(settings: &TitleSettings) -> Result<Vec<Arc<dyn TitleProvider>>> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    let openai_client = if settings.uses_openai() {
        Some(create_client_with_timeout(timeout)?)
    } else {
        None
    };

    let mut providers: Vec<Arc<dyn TitleProvider>> = Vec::with_capacity(settings.providers.len());
    for entry in &settings.providers {
        match entry.backend {
            TitleBackend::OpenAI => {
                if let Some(client) = &openai_client {
                    providers.push(Arc::new(OpenAITitleProvider::with_client(
                        client.clone(),
                        &entry.model,
                    )));
                }
            }
            TitleBackend::Ollama => {
                providers.push(Arc::new(OllamaTitleProvider::new(
                    &settings.ollama_url,
                    &entry.model,
                    timeout,
                )?));
            }
        }
    }

    Ok(providers)
}
