//! clipscribe - titles for audio pages
//!
//! A CLI tool that finds the audio clips linked from static HTML pages,
//! transcribes them, chooses a short title for each and writes the titles
//! back into the pages.
//!
//! # Overview
//!
//! clipscribe allows you to:
//! - Download every referenced clip once and keep it on disk
//! - Transcribe clips with OpenAI Whisper, reusing transcripts across runs
//! - Title clips with hand-edited side files, LLM providers, or the first sentence
//! - Patch list items and numbered captions in place, keeping a one-time backup
//! - Mirror all clips into a per-category backup directory
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `audio_source` - Audio URL discovery and reference parsing
//! - `audio` - Streaming downloads
//! - `cache` - Audio and transcript reuse
//! - `transcription` - Speech-to-text transcription
//! - `titles` - Title resolution and side files
//! - `html` - Page patching
//! - `manifest` - Run manifest and backup report
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use clipscribe::config::Settings;
//! use clipscribe::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let documents = settings.document_paths();
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator.run_full(&documents).await?;
//!     println!("Applied {} titles", report.titles_applied);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod audio_source;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod html;
pub mod manifest;
pub mod openai;
pub mod orchestrator;
pub mod titles;
pub mod transcription;

pub use error::{ClipscribeError, Result};
