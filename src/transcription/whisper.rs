//! OpenAI Whisper transcription implementation.

use super::Transcriber;
use crate::config::TranscriptionSettings;
use crate::error::{ClipscribeError, Result};
use crate::openai::{create_client, map_error};
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config("whisper-1", None)
    }

    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(model: &str, language: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            language: language.map(|s| s.to_string()),
        })
    }

    /// Create a transcriber from transcription settings.
    pub fn from_settings(settings: &TranscriptionSettings) -> Result<Self> {
        Self::with_config(&settings.model, settings.language.as_deref())
    }

    /// The Whisper model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        debug!("Transcribing audio with {}", self.model);

        let file_bytes = tokio::fs::read(audio_path).await?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| ClipscribeError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| map_error("Whisper API error", e))?;

        Ok(response.text.trim().to_string())
    }
}
