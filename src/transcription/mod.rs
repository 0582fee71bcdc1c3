//! Transcription module for clipscribe.
//!
//! Speech-to-text is a capability behind the [`Transcriber`] trait; the
//! shipped implementation calls OpenAI Whisper.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file to plain text.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transcriber used by tests across the crate.

    use super::*;
    use crate::error::ClipscribeError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed transcript per file name; unknown files fail.
    #[derive(Default)]
    pub struct ScriptedTranscriber {
        transcripts: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl ScriptedTranscriber {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, filename: &str, transcript: &str) -> Self {
            self.transcripts
                .insert(filename.to_string(), transcript.to_string());
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transcriber for ScriptedTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = audio_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            self.transcripts
                .get(name)
                .cloned()
                .ok_or_else(|| ClipscribeError::Transcription(format!("no script for {}", name)))
        }
    }
}
