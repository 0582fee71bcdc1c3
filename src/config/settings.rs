//! Configuration settings for clipscribe.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory before the global config.
pub const LOCAL_CONFIG_FILE: &str = "clipscribe.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub documents: DocumentSettings,
    pub source: SourceSettings,
    pub download: DownloadSettings,
    pub transcription: TranscriptionSettings,
    pub titles: TitleSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory holding audio, transcript and title files.
    pub output_dir: String,
    /// Aggregate JSON manifest.
    pub manifest_path: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "audio_files".to_string(),
            manifest_path: "transcriptions.json".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// HTML documents to scan and patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// Document paths; the first one is the primary document.
    pub paths: Vec<String>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            paths: ["index.html", "inc.html", "inc2.html", "inx3.html"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Where audio references point to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// URL prefix every audio reference must start with.
    pub audio_prefix: String,
    /// Audio file extension (without the dot).
    pub extension: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            audio_prefix: "https://s3-us-west-1.amazonaws.com/randombmir/".to_string(),
            extension: "mp3".to_string(),
        }
    }
}

/// Download and backup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Root directory for download-only backups.
    pub backup_dir: String,
    /// Categories listed in the backup report, in order.
    pub categories: Vec<String>,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Pause after each successful backup download, in milliseconds.
    pub backup_delay_ms: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            backup_dir: "audio_backup".to_string(),
            categories: ["long+talks", "random", "camps+and+arts", "warnings"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            connect_timeout_secs: 30,
            request_timeout_secs: 600,
            backup_delay_ms: 100,
        }
    }
}

/// How transcripts are keyed in the cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKeyMode {
    /// Trust stable filenames: an existing transcript is always reused.
    #[default]
    Filename,
    /// Re-transcribe when the audio's SHA-256 differs from the recorded one.
    #[serde(alias = "hash")]
    ContentHash,
}

impl std::fmt::Display for CacheKeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKeyMode::Filename => write!(f, "filename"),
            CacheKeyMode::ContentHash => write!(f, "content-hash"),
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Optional language hint.
    pub language: Option<String>,
    /// Pause after each fresh transcription, in milliseconds.
    pub rate_limit_ms: u64,
    /// Transcript cache key.
    pub cache_key: CacheKeyMode,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
            rate_limit_ms: 1000,
            cache_key: CacheKeyMode::Filename,
        }
    }
}

/// Text generation backend for a title provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TitleBackend {
    OpenAI,
    Ollama,
}

impl std::fmt::Display for TitleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TitleBackend::OpenAI => write!(f, "openai"),
            TitleBackend::Ollama => write!(f, "ollama"),
        }
    }
}

/// One entry of the ordered provider list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSettings {
    pub backend: TitleBackend,
    pub model: String,
}

/// Title resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleSettings {
    /// Providers tried in order; the first accepted response wins.
    pub providers: Vec<ProviderSettings>,
    /// Base URL of the Ollama server.
    pub ollama_url: String,
    /// Per-provider timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum title length in characters.
    pub max_chars: usize,
    /// Characters of transcript included in the prompt.
    pub preview_chars: usize,
    /// Case-insensitive phrases that mark a response as a refusal.
    pub refusal_phrases: Vec<String>,
}

impl Default for TitleSettings {
    fn default() -> Self {
        Self {
            providers: vec![
                ProviderSettings {
                    backend: TitleBackend::OpenAI,
                    model: "gpt-4o-mini".to_string(),
                },
                ProviderSettings {
                    backend: TitleBackend::OpenAI,
                    model: "gpt-3.5-turbo".to_string(),
                },
            ],
            ollama_url: "http://localhost:11434".to_string(),
            timeout_secs: 30,
            max_chars: 50,
            preview_chars: 500,
            refusal_phrases: [
                "i can not",
                "i cannot",
                "i'm unable",
                "i am unable",
                "i'm sorry",
                "i am sorry",
                "i cannot create",
                "i can not create",
                "i'm not able",
                "i am not able",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl TitleSettings {
    /// Whether any provider talks to OpenAI.
    pub fn uses_openai(&self) -> bool {
        self.providers.iter().any(|p| p.backend == TitleBackend::OpenAI)
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default locations.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or the default lookup order if None.
    ///
    /// Lookup order: explicit path, `./clipscribe.toml`, the global config file.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = Self::resolve_config_path(path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else if path.is_some() {
            Err(crate::error::ClipscribeError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )))
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ClipscribeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The config file a load with `path` reads from.
    pub fn resolve_config_path(path: Option<&PathBuf>) -> PathBuf {
        match path {
            Some(p) => p.clone(),
            None => {
                let local = PathBuf::from(LOCAL_CONFIG_FILE);
                if local.exists() {
                    local
                } else {
                    Self::default_config_path()
                }
            }
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clipscribe")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Get the expanded manifest path.
    pub fn manifest_path(&self) -> PathBuf {
        Self::expand_path(&self.general.manifest_path)
    }

    /// Get the expanded backup directory path.
    pub fn backup_dir(&self) -> PathBuf {
        Self::expand_path(&self.download.backup_dir)
    }

    /// Document paths, expanded.
    pub fn document_paths(&self) -> Vec<PathBuf> {
        self.documents.paths.iter().map(|p| Self::expand_path(p)).collect()
    }

    /// The primary document (first configured path).
    pub fn primary_document(&self) -> Option<PathBuf> {
        self.documents.paths.first().map(|p| Self::expand_path(p))
    }

    /// Whether a run in the given mode needs the OpenAI credential.
    ///
    /// Transcription always goes through Whisper; titles-only runs only need it
    /// when a title provider is an OpenAI model.
    pub fn requires_openai(&self, titles_only: bool) -> bool {
        !titles_only || self.titles.uses_openai()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.titles.max_chars, 50);
        assert_eq!(settings.titles.preview_chars, 500);
        assert_eq!(settings.titles.timeout_secs, 30);
        assert_eq!(settings.transcription.rate_limit_ms, 1000);
        assert_eq!(settings.transcription.cache_key, CacheKeyMode::Filename);
        assert_eq!(settings.documents.paths[0], "index.html");
        assert_eq!(settings.download.categories.len(), 4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [transcription]
            cache_key = "content-hash"

            [[titles.providers]]
            backend = "ollama"
            model = "llama3.2:3b"
            "#,
        )
        .unwrap();

        assert_eq!(settings.transcription.cache_key, CacheKeyMode::ContentHash);
        assert_eq!(settings.transcription.model, "whisper-1");
        assert_eq!(settings.titles.providers.len(), 1);
        assert_eq!(settings.titles.providers[0].backend, TitleBackend::Ollama);
        assert!(!settings.titles.uses_openai());
        assert!(!settings.requires_openai(true));
        assert!(settings.requires_openai(false));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.general.output_dir = "clips".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.general.output_dir, "clips");
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let missing = PathBuf::from("/nonexistent/clipscribe.toml");
        assert!(Settings::load_from(Some(&missing)).is_err());
    }

    #[test]
    fn test_cache_key_parse() {
        let parse = |value: &str| {
            toml::from_str::<Settings>(&format!("[transcription]\ncache_key = \"{}\"\n", value))
                .map(|s| s.transcription.cache_key)
        };
        assert_eq!(parse("filename").unwrap(), CacheKeyMode::Filename);
        assert_eq!(parse("content-hash").unwrap(), CacheKeyMode::ContentHash);
        assert_eq!(parse("hash").unwrap(), CacheKeyMode::ContentHash);
        assert!(parse("sha").is_err());
    }
}
