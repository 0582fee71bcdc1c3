//! Error types for clipscribe.

use thiserror::Error;

/// Library-level error type for clipscribe operations.
#[derive(Error, Debug)]
pub enum ClipscribeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Size mismatch for {filename}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        filename: String,
        expected: u64,
        actual: u64,
    },

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Title generation failed: {0}")]
    TitleGeneration(String),

    #[error("HTML error: {0}")]
    Html(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ClipscribeError {
    /// Whether this error must abort a whole run instead of a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClipscribeError::Authentication(_))
    }
}

/// Result type alias for clipscribe operations.
pub type Result<T> = std::result::Result<T, ClipscribeError>;
